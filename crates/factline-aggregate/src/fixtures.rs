//! Minimal tally domain shared by this crate's unit tests.

use factline_common::AggregateId;
use factline_store::{DomainEvent, EventMeta};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::Command;
use crate::fsm::{Decision, FsmState};
use crate::projection::AggregateProjection;

#[derive(Debug, Clone)]
pub(crate) enum TallyCommand {
    Start { aggregate_id: AggregateId },
    /// Initializer that decides nothing; exercises the empty-creation guard.
    StartIdle { aggregate_id: AggregateId },
    Add { aggregate_id: AggregateId, amount: u32 },
    Stop { aggregate_id: AggregateId },
}

impl TallyCommand {
    pub(crate) fn start(aggregate_id: AggregateId) -> Self {
        Self::Start { aggregate_id }
    }

    pub(crate) fn start_idle(aggregate_id: AggregateId) -> Self {
        Self::StartIdle { aggregate_id }
    }

    pub(crate) fn add(aggregate_id: AggregateId, amount: u32) -> Self {
        Self::Add {
            aggregate_id,
            amount,
        }
    }

    pub(crate) fn stop(aggregate_id: AggregateId) -> Self {
        Self::Stop { aggregate_id }
    }
}

impl Command for TallyCommand {
    fn aggregate_id(&self) -> AggregateId {
        match self {
            TallyCommand::Start { aggregate_id }
            | TallyCommand::StartIdle { aggregate_id }
            | TallyCommand::Add { aggregate_id, .. }
            | TallyCommand::Stop { aggregate_id } => *aggregate_id,
        }
    }

    fn is_initializer(&self) -> bool {
        matches!(
            self,
            TallyCommand::Start { .. } | TallyCommand::StartIdle { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum TallyEvent {
    Started { meta: EventMeta },
    Added { meta: EventMeta, amount: u32 },
    Stopped { meta: EventMeta },
}

impl DomainEvent for TallyEvent {
    fn meta(&self) -> &EventMeta {
        match self {
            TallyEvent::Started { meta }
            | TallyEvent::Added { meta, .. }
            | TallyEvent::Stopped { meta } => meta,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TallyEvent::Started { .. } => "TallyStarted",
            TallyEvent::Added { .. } => "TallyAdded",
            TallyEvent::Stopped { .. } => "TallyStopped",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum TallyRejection {
    #[error("tally has not been started")]
    NotStarted,
    #[error("tally is already started")]
    AlreadyStarted,
    #[error("tally is stopped")]
    AlreadyStopped,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TallyView {
    pub aggregate_id: AggregateId,
    pub total: u64,
    pub stopped: bool,
}

impl AggregateProjection for TallyView {
    fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) enum TallyState {
    #[default]
    Missing,
    Counting {
        aggregate_id: AggregateId,
        total: u64,
    },
    Stopped {
        aggregate_id: AggregateId,
        total: u64,
    },
}

impl FsmState for TallyState {
    type Command = TallyCommand;
    type Event = TallyEvent;
    type Projection = TallyView;
    type Rejection = TallyRejection;

    fn decide(&self, command: &TallyCommand) -> Result<Decision<TallyEvent>, TallyRejection> {
        match (self, command) {
            (TallyState::Missing, TallyCommand::Start { .. }) => Ok(Decision::record(
                TallyEvent::Started {
                    meta: command.event_meta(),
                },
            )),
            (TallyState::Missing, TallyCommand::StartIdle { .. }) => Ok(Decision::noop()),
            (TallyState::Missing, _) => Err(TallyRejection::NotStarted),

            (TallyState::Counting { .. }, TallyCommand::Start { .. })
            | (TallyState::Counting { .. }, TallyCommand::StartIdle { .. }) => {
                Err(TallyRejection::AlreadyStarted)
            }
            (TallyState::Counting { .. }, TallyCommand::Add { amount: 0, .. }) => {
                Ok(Decision::noop())
            }
            (TallyState::Counting { .. }, TallyCommand::Add { amount, .. }) => {
                Ok(Decision::record(TallyEvent::Added {
                    meta: command.event_meta(),
                    amount: *amount,
                }))
            }
            (TallyState::Counting { .. }, TallyCommand::Stop { .. }) => Ok(Decision::record(
                TallyEvent::Stopped {
                    meta: command.event_meta(),
                },
            )),

            (TallyState::Stopped { .. }, TallyCommand::Start { .. })
            | (TallyState::Stopped { .. }, TallyCommand::StartIdle { .. }) => {
                Err(TallyRejection::AlreadyStarted)
            }
            (TallyState::Stopped { .. }, TallyCommand::Add { .. }) => {
                Err(TallyRejection::AlreadyStopped)
            }
            (TallyState::Stopped { .. }, TallyCommand::Stop { .. }) => Ok(Decision::noop()),
        }
    }

    fn evolve(self, event: &TallyEvent) -> Self {
        match (self, event) {
            (TallyState::Missing, TallyEvent::Started { meta }) => TallyState::Counting {
                aggregate_id: meta.aggregate_id,
                total: 0,
            },
            (TallyState::Counting { aggregate_id, total }, TallyEvent::Added { amount, .. }) => {
                TallyState::Counting {
                    aggregate_id,
                    total: total + u64::from(*amount),
                }
            }
            (TallyState::Counting { aggregate_id, total }, TallyEvent::Stopped { .. }) => {
                TallyState::Stopped {
                    aggregate_id,
                    total,
                }
            }
            // Histories a decision could not have produced fold to self.
            (state, _) => state,
        }
    }

    fn project(&self) -> TallyView {
        match self {
            TallyState::Missing => TallyView {
                aggregate_id: AggregateId::from_uuid(uuid::Uuid::nil()),
                total: 0,
                stopped: false,
            },
            TallyState::Counting { aggregate_id, total } => TallyView {
                aggregate_id: *aggregate_id,
                total: *total,
                stopped: false,
            },
            TallyState::Stopped { aggregate_id, total } => TallyView {
                aggregate_id: *aggregate_id,
                total: *total,
                stopped: true,
            },
        }
    }
}

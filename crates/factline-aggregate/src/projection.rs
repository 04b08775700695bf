use factline_common::AggregateId;
use factline_store::Version;

/// Public read-model snapshot of one aggregate.
pub trait AggregateProjection: Clone + Send + Sync {
    /// The aggregate this projection describes.
    fn aggregate_id(&self) -> AggregateId;
}

/// A projection paired with the version of the last event folded into it.
///
/// This pair is the unit of "current known state": the projection is only
/// meaningful together with the version it was derived at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedProjection<P> {
    /// The derived read model.
    pub projection: P,

    /// Version of the last event folded into the projection.
    pub version: Version,
}

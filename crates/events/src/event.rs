use chrono::{DateTime, Utc};

/// A notification published by the engine.
///
/// Notifications describe something that already happened to a submission
/// (committed, rejected, document hand-off failed). They are never replayed
/// to rebuild state; movement records are the durable facts.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name listeners route on, e.g. `allocation.submission.committed`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version; bump when a field changes meaning.
    fn version(&self) -> u32;

    /// Wall-clock time of the underlying change.
    fn occurred_at(&self) -> DateTime<Utc>;
}

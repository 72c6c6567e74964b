//! Cross-component notifications
//!
//! Producers outside the event pipeline (the submissions service, for
//! example) report their own notifications. Adapters here translate them into
//! the notifications the rest of the platform listens to.

pub mod grades;

pub use grades::{ScoreChanged, ScoreReset, ScoreSet, ScoreSignalAdapter};

/// Maps anonymous user ids to numeric user ids
pub trait AnonymousUserResolver: Send + Sync {
    fn resolve(&self, anonymous_user_id: &str) -> Option<i64>;
}

impl<F> AnonymousUserResolver for F
where
    F: Fn(&str) -> Option<i64> + Send + Sync,
{
    fn resolve(&self, anonymous_user_id: &str) -> Option<i64> {
        self(anonymous_user_id)
    }
}

/// Consumer of unified score notifications
pub trait ScoreChangedReceiver: Send + Sync {
    fn score_changed(&self, notification: &ScoreChanged);
}

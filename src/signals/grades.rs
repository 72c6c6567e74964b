//! Score notifications
//!
//! The submissions service reports `score_set` and `score_reset`
//! notifications keyed by anonymous user id and item id. Grading listens for
//! a single [`ScoreChanged`] notification keyed by numeric user id and usage
//! id; [`ScoreSignalAdapter`] converts one into the other.

use serde::{Deserialize, Serialize};

use super::{AnonymousUserResolver, ScoreChangedReceiver};
use crate::models::{ValidationError, ValidationErrorKind, ValidationErrors};

/// A learner's score for an item was set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub points_possible: Option<f64>,
    pub points_earned: Option<f64>,
    pub anonymous_user_id: Option<String>,
    pub course_id: Option<String>,
    pub item_id: Option<String>,
}

/// A learner's score for an item was cleared
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReset {
    pub anonymous_user_id: Option<String>,
    pub course_id: Option<String>,
    pub item_id: Option<String>,
}

/// A learner's score for a problem was updated.
///
/// Sent whenever scoring happens, even if the new score equals the previous
/// one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChanged {
    pub points_possible: f64,
    pub points_earned: f64,
    pub user_id: i64,
    pub course_id: String,
    pub usage_id: String,
}

/// Translates submission score notifications into [`ScoreChanged`]
#[derive(Debug, Clone)]
pub struct ScoreSignalAdapter<R, C> {
    resolver: R,
    receiver: C,
}

impl<R: AnonymousUserResolver, C: ScoreChangedReceiver> ScoreSignalAdapter<R, C> {
    pub fn new(resolver: R, receiver: C) -> Self {
        Self { resolver, receiver }
    }

    pub fn receiver(&self) -> &C {
        &self.receiver
    }

    /// Forward a `score_set` notification.
    ///
    /// Incomplete notifications are logged and dropped. Returns what was
    /// forwarded, if anything.
    pub fn on_score_set(&self, signal: &ScoreSet) -> Option<ScoreChanged> {
        let mut errors = ValidationErrors::new();
        let points_possible = required(&mut errors, signal.points_possible, "points_possible");
        let points_earned = required(&mut errors, signal.points_earned, "points_earned");
        let user_id = self.resolve_user(&mut errors, signal.anonymous_user_id.as_deref());
        let course_id = required(&mut errors, signal.course_id.clone(), "course_id");
        let usage_id = required(&mut errors, signal.item_id.clone(), "item_id");

        match (points_possible, points_earned, user_id, course_id, usage_id) {
            (Some(points_possible), Some(points_earned), Some(user_id), Some(course_id), Some(usage_id)) => {
                Some(self.forward(ScoreChanged {
                    points_possible,
                    points_earned,
                    user_id,
                    course_id,
                    usage_id,
                }))
            },
            _ => {
                tracing::error!(
                    signal = "score_set",
                    missing = ?errors.fields(),
                    errors = %errors,
                    points_possible = ?signal.points_possible,
                    points_earned = ?signal.points_earned,
                    course_id = ?signal.course_id,
                    usage_id = ?signal.item_id,
                    "Failed to process score_set notification"
                );
                None
            },
        }
    }

    /// Forward a `score_reset` notification as a 0/0 score
    pub fn on_score_reset(&self, signal: &ScoreReset) -> Option<ScoreChanged> {
        let mut errors = ValidationErrors::new();
        let user_id = self.resolve_user(&mut errors, signal.anonymous_user_id.as_deref());
        let course_id = required(&mut errors, signal.course_id.clone(), "course_id");
        let usage_id = required(&mut errors, signal.item_id.clone(), "item_id");

        match (user_id, course_id, usage_id) {
            (Some(user_id), Some(course_id), Some(usage_id)) => Some(self.forward(ScoreChanged {
                points_possible: 0.0,
                points_earned: 0.0,
                user_id,
                course_id,
                usage_id,
            })),
            _ => {
                tracing::error!(
                    signal = "score_reset",
                    missing = ?errors.fields(),
                    errors = %errors,
                    course_id = ?signal.course_id,
                    usage_id = ?signal.item_id,
                    "Failed to process score_reset notification"
                );
                None
            },
        }
    }

    fn resolve_user(&self, errors: &mut ValidationErrors, anonymous_user_id: Option<&str>) -> Option<i64> {
        let Some(anonymous_user_id) = anonymous_user_id else {
            errors.add(ValidationError::missing("anonymous_user_id"));
            return None;
        };

        let user_id = self.resolver.resolve(anonymous_user_id);
        if user_id.is_none() {
            errors.add(ValidationError::with_context(
                ValidationErrorKind::UnknownUser,
                "anonymous_user_id",
                anonymous_user_id,
            ));
        }
        user_id
    }

    fn forward(&self, notification: ScoreChanged) -> ScoreChanged {
        tracing::debug!(
            user_id = notification.user_id,
            course_id = %notification.course_id,
            usage_id = %notification.usage_id,
            "Score changed"
        );
        self.receiver.score_changed(&notification);
        notification
    }
}

fn required<T>(errors: &mut ValidationErrors, value: Option<T>, field: &str) -> Option<T> {
    if value.is_none() {
        errors.add(ValidationError::missing(field));
    }
    value
}

//! Pipeline stage for mobile video events

use super::{ProcessOutcome, Processor};
use crate::error::Result;
use crate::models::Event;
use crate::shim::video::{legacy_video_event_type, rewrite_video_event};
use crate::shim::EVENT_TYPE;

/// Converts new-format video events into the legacy player format.
///
/// Runs the same rewrite as [`crate::shim::VideoEventShim`], but only for
/// video events that have a legacy counterpart, and tags them with their
/// legacy `event_type`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VideoEventProcessor;

impl Processor for VideoEventProcessor {
    fn name(&self) -> &'static str {
        "video_event"
    }

    fn process(&self, event: &mut Event) -> Result<ProcessOutcome> {
        let Some(legacy_type) = event.name().and_then(legacy_video_event_type) else {
            return Ok(ProcessOutcome::Skipped);
        };

        event.insert(EVENT_TYPE, legacy_type);
        rewrite_video_event(event);
        Ok(ProcessOutcome::Modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::{EventShim, VideoEventShim};
    use serde_json::{json, Value};

    fn video_event() -> Event {
        Event::try_from(json!({
            "name": "edx.video.seeked",
            "context": {
                "application": {"version": "1.0.02", "name": "edx.mobileapp.iOS"},
                "open_in_browser_url": "https://courses.example.com/courses/c/jump_to/v1"
            },
            "event": {
                "module_id": "i4x://foo/bar/video/intro",
                "current_time": 20,
                "seek_type": "skip",
                "requested_skip_interval": 30
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_skips_events_without_legacy_counterpart() {
        let mut event = Event::try_from(json!({
            "name": "edx.video.closed_captions.shown",
            "event": {"current_time": 1}
        }))
        .unwrap();
        let before = event.clone();

        let outcome = VideoEventProcessor.process(&mut event).unwrap();
        assert_eq!(outcome, ProcessOutcome::Skipped);
        assert_eq!(event, before);
    }

    #[test]
    fn test_rewrites_legacy_video_events() {
        let mut event = video_event();
        let outcome = VideoEventProcessor.process(&mut event).unwrap();

        assert_eq!(outcome, ProcessOutcome::Modified);
        assert_eq!(event.name(), Some("edx.video.position.changed"));
        assert_eq!(event.get(EVENT_TYPE), Some(&json!("seek_video")));
        assert_eq!(event.get("page"), Some(&json!("https://courses.example.com/courses/c/jump_to")));

        let raw = event.payload().and_then(Value::as_str).unwrap();
        let payload: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(
            payload,
            json!({
                "id": "i4x-foo-bar-video-intro",
                "currentTime": 20,
                "type": "onSkipSeek",
                "requested_skip_interval": -30
            })
        );
    }

    #[test]
    fn test_matches_dispatched_shim() {
        let mut processed = video_event();
        VideoEventProcessor.process(&mut processed).unwrap();

        let mut shimmed = video_event();
        VideoEventShim.shim(&mut shimmed).unwrap();

        assert_eq!(processed, shimmed);
    }
}

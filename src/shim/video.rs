//! Video event rewriting
//!
//! Mobile clients cannot emit events that exactly match the ones produced
//! by the LMS video player, so their `edx.video.*` events are converted to
//! the legacy player format here. The same transform backs both the
//! `edx.video.` prefix shim and the video pipeline stage.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{EventShim, RegisteredShim, ShimError};
use crate::models::event::PAYLOAD;
use crate::models::validation::number_field;
use crate::models::{Event, UsageKey};

const SEEKED: &str = "edx.video.seeked";
const POSITION_CHANGED: &str = "edx.video.position.changed";

const IOS_APP_NAME: &str = "edx.mobileapp.iOS";
/// iOS build that reports a +30 second skip when the user skipped back
const IOS_SKIP_BUG_VERSION: &str = "1.0.02";
const SKIP_INTERVAL: f64 = 30.0;

const SLIDE_SEEK: &str = "onSlideSeek";
const SKIP_SEEK: &str = "onSkipSeek";

/// Video event names with a legacy counterpart
const LEGACY_VIDEO_EVENT_TYPES: [(&str, &str); 8] = [
    ("edx.video.played", "play_video"),
    ("edx.video.paused", "pause_video"),
    ("edx.video.stopped", "stop_video"),
    ("edx.video.loaded", "load_video"),
    (POSITION_CHANGED, "seek_video"),
    (SEEKED, "seek_video"),
    ("edx.video.transcript.shown", "show_transcript"),
    ("edx.video.transcript.hidden", "hide_transcript"),
];

/// Legacy `event_type` for a video event name
pub fn legacy_video_event_type(name: &str) -> Option<&'static str> {
    LEGACY_VIDEO_EVENT_TYPES
        .iter()
        .find(|(video_name, _)| *video_name == name)
        .map(|(_, legacy)| *legacy)
}

/// Convert a new-format video event into the legacy player format.
///
/// The payload ends up serialized as a JSON string under `event`. Events
/// without a usable payload only get their name normalized.
pub fn rewrite_video_event(event: &mut Event) {
    // edx.video.seeked was never meant to be emitted
    if event.name() == Some(SEEKED) {
        event.set_name(POSITION_CHANGED);
    }

    let mut payload = match event.decode_payload() {
        Ok(Some(payload)) => payload,
        Ok(None) => return,
        Err(err) => {
            debug!(name = ?event.name(), error = %err, "Video event payload is not an object");
            return;
        },
    };

    if let Some(module_id) = payload.shift_remove("module_id") {
        match module_id.as_str().map(str::parse::<UsageKey>) {
            Some(Ok(usage_key)) => {
                payload.insert("id".to_string(), Value::String(usage_key.html_id()));
            },
            Some(Err(err)) => {
                warn!(module_id = %module_id, error = %err, "Unable to parse module_id");
            },
            None => {
                warn!(module_id = %module_id, "Unable to parse module_id: not a string");
            },
        }
    }

    if let Some(current_time) = payload.shift_remove("current_time") {
        payload.insert("currentTime".to_string(), current_time);
    }

    if event.context().is_some() {
        normalize_seek_type(&mut payload);

        if is_ios_skip_bug_build(event) && requested_plus_30_skip(&payload) {
            payload.insert("requested_skip_interval".to_string(), Value::from(-30));
        }

        // Builds that do not tell skips from slides: anything but a 30s jump is a slide
        if let Some(interval) = number_field(&payload, "requested_skip_interval") {
            if interval.abs() != SKIP_INTERVAL && payload.contains_key("type") {
                payload.insert("type".to_string(), Value::from(SLIDE_SEEK));
            }
        }

        if let Some(url) = event.take_from_context("open_in_browser_url") {
            if let Some(url) = url.as_str() {
                let page = url.rsplit_once('/').map(|(page, _)| page).unwrap_or_default();
                event.insert("page", page);
            }
        }
    }

    event.insert(PAYLOAD, Value::String(Value::Object(payload).to_string()));
}

fn normalize_seek_type(payload: &mut Map<String, Value>) {
    if let Some(seek_type) = payload.shift_remove("seek_type") {
        match seek_type.as_str() {
            Some("slide") => {
                payload.insert("type".to_string(), Value::from(SLIDE_SEEK));
            },
            Some("skip") => {
                payload.insert("type".to_string(), Value::from(SKIP_SEEK));
            },
            _ => {},
        }
    }
}

fn is_ios_skip_bug_build(event: &Event) -> bool {
    let application = event
        .context()
        .and_then(|context| context.get("application"))
        .and_then(Value::as_object);

    match application {
        Some(app) => {
            app.get("version").and_then(Value::as_str) == Some(IOS_SKIP_BUG_VERSION)
                && app.get("name").and_then(Value::as_str) == Some(IOS_APP_NAME)
        },
        None => false,
    }
}

fn requested_plus_30_skip(payload: &Map<String, Value>) -> bool {
    number_field(payload, "requested_skip_interval") == Some(SKIP_INTERVAL)
        && payload.get("type").and_then(Value::as_str) == Some(SKIP_SEEK)
}

/// Prefix shim for every `edx.video.` event
#[derive(Debug, Default, Clone, Copy)]
pub struct VideoEventShim;

impl EventShim for VideoEventShim {
    fn label(&self) -> &'static str {
        "VideoEventShim"
    }

    fn is_legacy_event(&self, event: &Event) -> Result<bool, ShimError> {
        Ok(event.name().and_then(legacy_video_event_type).is_some())
    }

    fn legacy_event_type(&self, event: &Event) -> Result<&'static str, ShimError> {
        event
            .name()
            .and_then(legacy_video_event_type)
            .ok_or(ShimError::NotImplemented {
                shim: self.label(),
                member: "legacy_event_type",
            })
    }

    fn process_event(&self, event: &mut Event) -> Result<(), ShimError> {
        rewrite_video_event(event);
        Ok(())
    }
}

impl RegisteredShim for VideoEventShim {
    const SHIM_NAME: &'static str = "edx.video.";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::EVENT_TYPE;
    use serde_json::json;

    fn event(value: Value) -> Event {
        Event::try_from(value).unwrap()
    }

    fn payload_of(event: &Event) -> Value {
        let raw = event.payload().and_then(Value::as_str).expect("payload is serialized");
        serde_json::from_str(raw).unwrap()
    }

    fn ios_context() -> Value {
        json!({"application": {"version": "1.0.02", "name": "edx.mobileapp.iOS"}})
    }

    #[test]
    fn test_legacy_type_table() {
        assert_eq!(legacy_video_event_type("edx.video.played"), Some("play_video"));
        assert_eq!(legacy_video_event_type("edx.video.seeked"), Some("seek_video"));
        assert_eq!(legacy_video_event_type("edx.video.transcript.hidden"), Some("hide_transcript"));
        assert_eq!(legacy_video_event_type("edx.video.closed_captions.shown"), None);
    }

    #[test]
    fn test_seeked_is_renamed_without_payload() {
        let mut event = Event::new("edx.video.seeked");
        VideoEventShim.shim(&mut event).unwrap();

        assert_eq!(event.name(), Some("edx.video.position.changed"));
        assert_eq!(event.get(EVENT_TYPE), Some(&json!("seek_video")));
        assert!(event.payload().is_none());
    }

    #[test]
    fn test_seeked_is_renamed_with_payload() {
        let mut event = event(json!({"name": "edx.video.seeked", "event": {"old_time": 1}}));
        VideoEventShim.shim(&mut event).unwrap();
        assert_eq!(event.name(), Some("edx.video.position.changed"));
        assert_eq!(payload_of(&event), json!({"old_time": 1}));
    }

    #[test]
    fn test_unknown_video_event_is_not_legacy() {
        let mut event = event(json!({"name": "edx.video.closed_captions.shown", "event": {"current_time": 3}}));
        assert_eq!(VideoEventShim.is_legacy_event(&event), Ok(false));

        VideoEventShim.shim(&mut event).unwrap();
        assert!(!event.contains_key(EVENT_TYPE));
        assert_eq!(payload_of(&event), json!({"currentTime": 3}));
    }

    #[test]
    fn test_module_id_becomes_html_id() {
        let mut event = event(json!({
            "name": "edx.video.played",
            "event": {
                "module_id": "i4x://foo/bar/baz/some_module",
                "current_time": 132.134
            }
        }));
        rewrite_video_event(&mut event);

        assert_eq!(
            payload_of(&event),
            json!({"id": "i4x-foo-bar-baz-some_module", "currentTime": 132.134})
        );
    }

    #[test]
    fn test_invalid_module_id_is_dropped() {
        let mut event = event(json!({
            "name": "edx.video.played",
            "event": {"module_id": "not a usage key", "current_time": 1}
        }));
        rewrite_video_event(&mut event);

        let payload = payload_of(&event);
        assert!(payload.get("module_id").is_none());
        assert!(payload.get("id").is_none());
        assert_eq!(payload["currentTime"], 1);
    }

    #[test]
    fn test_seek_type_mapping() {
        for (seek_type, expected) in [("slide", "onSlideSeek"), ("skip", "onSkipSeek")] {
            let mut event = event(json!({
                "name": "edx.video.position.changed",
                "context": {},
                "event": {"seek_type": seek_type, "requested_skip_interval": 30}
            }));
            rewrite_video_event(&mut event);

            let payload = payload_of(&event);
            assert_eq!(payload["type"], expected);
            assert!(payload.get("seek_type").is_none());
        }
    }

    #[test]
    fn test_seek_type_needs_context() {
        let mut event = event(json!({
            "name": "edx.video.position.changed",
            "event": {"seek_type": "skip"}
        }));
        rewrite_video_event(&mut event);
        assert_eq!(payload_of(&event), json!({"seek_type": "skip"}));
    }

    #[test]
    fn test_ios_skip_bug_is_compensated() {
        let mut event = event(json!({
            "name": "edx.video.position.changed",
            "context": ios_context(),
            "event": {"requested_skip_interval": 30, "type": "onSkipSeek"}
        }));
        rewrite_video_event(&mut event);

        let payload = payload_of(&event);
        assert_eq!(payload["requested_skip_interval"], -30);
        assert_eq!(payload["type"], "onSkipSeek");
    }

    #[test]
    fn test_ios_skip_bug_via_seek_type() {
        let mut event = event(json!({
            "name": "edx.video.seeked",
            "context": ios_context(),
            "event": {"requested_skip_interval": 30, "seek_type": "skip"}
        }));
        rewrite_video_event(&mut event);
        assert_eq!(payload_of(&event)["requested_skip_interval"], -30);
    }

    #[test]
    fn test_other_builds_keep_forward_skip() {
        let mut event = event(json!({
            "name": "edx.video.position.changed",
            "context": {"application": {"version": "1.0.03", "name": "edx.mobileapp.iOS"}},
            "event": {"requested_skip_interval": 30, "type": "onSkipSeek"}
        }));
        rewrite_video_event(&mut event);
        assert_eq!(payload_of(&event)["requested_skip_interval"], 30);
    }

    #[test]
    fn test_non_skip_interval_is_a_slide() {
        let mut event = event(json!({
            "name": "edx.video.position.changed",
            "context": {"application": {"version": "1.0.1", "name": "edx.mobileapp.android"}},
            "event": {"requested_skip_interval": -2.5, "type": "onSkipSeek"}
        }));
        rewrite_video_event(&mut event);
        assert_eq!(payload_of(&event)["type"], "onSlideSeek");
    }

    #[test]
    fn test_open_in_browser_url_becomes_page() {
        let mut event = event(json!({
            "name": "edx.video.paused",
            "context": {
                "open_in_browser_url": "https://courses.example.com/courses/course-v1:edX+DemoX+Demo/jump_to/block-v1:edX+DemoX+Demo+type@video+block@v1"
            },
            "event": {}
        }));
        rewrite_video_event(&mut event);

        assert_eq!(
            event.get("page"),
            Some(&json!("https://courses.example.com/courses/course-v1:edX+DemoX+Demo/jump_to"))
        );
        assert!(event.context().unwrap().get("open_in_browser_url").is_none());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let mut event = event(json!({
            "name": "edx.video.seeked",
            "context": ios_context(),
            "event": {
                "module_id": "block-v1:edX+DemoX+Demo+type@video+block@v1",
                "current_time": 12,
                "requested_skip_interval": 30,
                "seek_type": "skip"
            }
        }));
        rewrite_video_event(&mut event);
        let once = event.clone();
        rewrite_video_event(&mut event);
        assert_eq!(event, once);
    }
}

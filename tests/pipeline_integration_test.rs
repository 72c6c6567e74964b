//! End-to-end tests of the canonical pipeline
//!
//! Events go through field mapping, the video rewrite and shim dispatch, and
//! come out in the legacy schema.

use serde_json::{json, Map, Value};
use trackforge::{
    processors::GoogleAnalyticsProcessor,
    test_utils::{
        browser_event, mobile_video_event, next_selected_event, previous_selected_event,
        tab_selected_event, test_config,
    },
    Emitter, Event, MemorySink, Pipeline,
};

fn process(event: Event) -> Event {
    Pipeline::canonical().process(event).unwrap()
}

/// Decoded `event` field of a processed event
fn payload(event: &Event) -> Map<String, Value> {
    match event.get("event") {
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap(),
        Some(Value::Object(map)) => map.clone(),
        other => panic!("unexpected payload {:?}", other),
    }
}

fn assert_legacy_shape(event: &Event) {
    assert!(!event.contains_key("data"), "data left in {:?}", event);
    assert!(!event.contains_key("timestamp"), "timestamp left in {:?}", event);
    match event.get("event") {
        Some(Value::String(raw)) => {
            serde_json::from_str::<Value>(raw).unwrap();
        },
        Some(Value::Object(_)) => {},
        other => panic!("event field should be a JSON string or object, got {:?}", other),
    }
    for field in ["username", "session", "ip", "agent", "host", "referer", "accept_language"] {
        assert!(event.contains_key(field), "{field} missing from {:?}", event);
    }
    for field in ["event_type", "event_source", "page"] {
        assert!(event.contains_key(field), "{field} missing from {:?}", event);
    }
}

#[test]
fn test_tab_selected_becomes_seq_goto() {
    let event = process(tab_selected_event(2, 5));

    assert_eq!(event.name(), Some("edx.ui.lms.sequence.tab_selected"));
    assert_eq!(event.get("event_type"), Some(&json!("seq_goto")));
    assert_eq!(event.get("event_source"), Some(&json!("browser")));
    assert_eq!(event.get("username"), Some(&json!("learner")));

    // browser payloads stay serialized
    assert!(event.get("event").unwrap().is_string());
    let payload = payload(&event);
    assert_eq!(payload["old"], 2);
    assert_eq!(payload["new"], 5);
    assert_eq!(payload["current_tab"], 2);

    assert_legacy_shape(&event);
}

#[test]
fn test_sequence_navigation() {
    let next = process(next_selected_event(2, 4));
    assert_eq!(next.get("event_type"), Some(&json!("seq_next")));
    assert_eq!(payload(&next)["old"], 2);
    assert_eq!(payload(&next)["new"], 3);

    let previous = process(previous_selected_event(3, 4));
    assert_eq!(previous.get("event_type"), Some(&json!("seq_prev")));
    assert_eq!(payload(&previous)["new"], 2);

    // leaving the sequence has no legacy counterpart
    let last = process(next_selected_event(4, 4));
    assert_eq!(last.get("event_type"), Some(&json!("edx.ui.lms.sequence.next_selected")));
    assert!(!payload(&last).contains_key("old"));

    let first = process(previous_selected_event(1, 4));
    assert_eq!(first.get("event_type"), Some(&json!("edx.ui.lms.sequence.previous_selected")));
    assert!(!payload(&first).contains_key("new"));
}

#[test]
fn test_seeked_is_renamed() {
    let event = process(mobile_video_event(
        "edx.video.seeked",
        "edx.mobileapp.android",
        "2.0.0",
        json!({
            "module_id": "block-v1:edX+DemoX+Demo+type@video+block@intro",
            "current_time": 12.5,
            "seek_type": "slide",
            "requested_skip_interval": 4
        }),
    ));

    assert_eq!(event.name(), Some("edx.video.position.changed"));
    assert_eq!(event.get("event_type"), Some(&json!("seek_video")));
    assert_eq!(
        event.get("page"),
        Some(&json!("https://courses.example.com/courses/course-v1:edX+DemoX+Demo/jump_to"))
    );
    assert!(!event.context().unwrap().contains_key("open_in_browser_url"));

    let payload = payload(&event);
    assert_eq!(payload["id"], "intro");
    assert_eq!(payload["currentTime"], 12.5);
    assert_eq!(payload["type"], "onSlideSeek");
    assert!(!payload.contains_key("module_id"));
    assert!(!payload.contains_key("seek_type"));

    assert_legacy_shape(&event);
}

#[test]
fn test_ios_skip_direction_is_corrected() {
    let skip = json!({"current_time": 40, "seek_type": "skip", "requested_skip_interval": 30});

    let buggy = process(mobile_video_event("edx.video.seeked", "edx.mobileapp.iOS", "1.0.02", skip.clone()));
    assert_eq!(payload(&buggy)["requested_skip_interval"], -30);
    assert_eq!(payload(&buggy)["type"], "onSkipSeek");

    let fixed = process(mobile_video_event("edx.video.seeked", "edx.mobileapp.iOS", "1.0.03", skip.clone()));
    assert_eq!(payload(&fixed)["requested_skip_interval"], 30);

    let android = process(mobile_video_event("edx.video.seeked", "edx.mobileapp.android", "1.0.02", skip));
    assert_eq!(payload(&android)["requested_skip_interval"], 30);
}

#[test]
fn test_video_events_without_legacy_type_are_still_rewritten() {
    let event = process(mobile_video_event(
        "edx.video.closed_captions.shown",
        "edx.mobileapp.android",
        "2.0.0",
        json!({"module_id": "i4x://edX/DemoX/video/intro", "current_time": 3}),
    ));

    // the prefix shim rewrites the payload but has no legacy type to set
    assert_eq!(event.get("event_type"), Some(&json!("edx.video.closed_captions.shown")));
    let payload = payload(&event);
    assert_eq!(payload["id"], "i4x-edX-DemoX-video-intro");
    assert_eq!(payload["currentTime"], 3);
}

#[test]
fn test_round_trip_shapes() {
    let events = vec![
        tab_selected_event(1, 2),
        next_selected_event(1, 2),
        previous_selected_event(2, 2),
        browser_event("problem_check", json!({"answers": {"p1": "42"}})),
        browser_event("page_close", json!("{}")),
        mobile_video_event("edx.video.played", "edx.mobileapp.iOS", "1.0.02", json!({"current_time": 0})),
        Event::try_from(json!({"name": "edx.course.enrollment.activated", "timestamp": "2016-05-01T00:00:00Z"})).unwrap(),
        Event::try_from(json!({"name": "server_event", "event": {"user_id": 7}})).unwrap(),
    ];

    for result in Pipeline::canonical().process_batch(events) {
        assert_legacy_shape(&result.unwrap());
    }
}

#[test]
fn test_unshimmed_event_only_gets_legacy_fields() {
    let event = process(Event::try_from(json!({
        "name": "edx.course.enrollment.activated",
        "context": {"username": "learner", "course_id": "course-v1:edX+DemoX+Demo"},
        "data": {"mode": "verified"},
        "timestamp": "2016-05-01T00:00:00Z"
    }))
    .unwrap());

    assert_eq!(event.get("event"), Some(&json!({"mode": "verified"})));
    assert_eq!(event.get("event_type"), Some(&json!("edx.course.enrollment.activated")));
    assert_eq!(event.get("event_source"), Some(&json!("server")));
    assert_eq!(event.get("time"), Some(&json!("2016-05-01T00:00:00Z")));
    assert_eq!(event.get("page"), Some(&Value::Null));
    assert_eq!(event.get("session"), Some(&json!("")));
}

#[test]
fn test_disabled_stages_from_config() {
    let mut config = test_config();
    config.processing.enable_event_shims = false;

    let event = Pipeline::from_config(&config.processing)
        .process(tab_selected_event(2, 5))
        .unwrap();
    assert_eq!(event.get("event_type"), Some(&json!("edx.ui.lms.sequence.tab_selected")));
    assert!(!payload(&event).contains_key("old"));
}

#[test]
fn test_emitter_delivers_canonical_and_analytics_copies() {
    let tracking = MemorySink::new();
    let analytics = MemorySink::new();
    let emitter = Emitter::new(Pipeline::canonical())
        .unwrap()
        .with_canonical_sink(tracking.clone())
        .with_analytics_sink(analytics.clone());

    let emitted = emitter.emit(tab_selected_event(3, 1)).unwrap();

    assert_eq!(tracking.events(), vec![emitted.clone()]);
    assert_eq!(analytics.events(), vec![GoogleAnalyticsProcessor.annotate(&emitted)]);
    assert_eq!(analytics.events()[0].get("label"), Some(&json!("course-v1:edX+DemoX+Demo")));
}

#[test]
fn test_out_of_range_tabs_are_rejected() {
    let pipeline = Pipeline::canonical();

    let overflow = Event::try_from(json!({
        "name": "edx.ui.lms.sequence.next_selected",
        "event": {"current_tab": i64::MAX, "tab_count": 3}
    }))
    .unwrap();
    let err = pipeline.process(overflow).unwrap_err();
    assert!(err.is_event_error(), "{err}");

    let huge = Event::try_from(json!({
        "name": "edx.ui.lms.sequence.previous_selected",
        "event": {"current_tab": -1e300}
    }))
    .unwrap();
    let err = pipeline.process(huge).unwrap_err();
    assert!(err.is_event_error(), "{err}");
}

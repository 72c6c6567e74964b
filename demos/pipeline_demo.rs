//! Demonstration of the trackforge event pipeline
//!
//! Run with: cargo run --example pipeline_demo

use chrono::Utc;
use serde_json::json;
use trackforge::{
    signals::{ScoreChanged, ScoreChangedReceiver, ScoreSet, ScoreSignalAdapter},
    Emitter, Event, JsonLinesSink, Pipeline, UsageKey,
};

fn main() {
    println!("=== trackforge Pipeline Demo ===\n");

    demo_sequence_navigation();
    println!();

    demo_mobile_video();
    println!();

    demo_usage_keys();
    println!();

    demo_score_signals();
}

fn show(label: &str, event: &Event) {
    println!("{}:", label);
    println!("{}", serde_json::to_string_pretty(event).unwrap());
}

fn demo_sequence_navigation() {
    println!("Demo 1: Sequence navigation");
    println!("---------------------------");

    let event = Event::try_from(json!({
        "name": "edx.ui.lms.sequence.tab_selected",
        "context": {
            "username": "learner",
            "event_source": "browser",
            "course_id": "course-v1:edX+DemoX+Demo",
            "timestamp": Utc::now().to_rfc3339(),
        },
        "data": {"current_tab": 2, "target_tab": 5, "tab_count": 8}
    }))
    .unwrap();
    show("Input", &event);

    let emitter = Emitter::new(Pipeline::canonical())
        .unwrap()
        .with_canonical_sink(JsonLinesSink::new("stdout", std::io::stdout()));
    println!("\nTracking log line:");
    emitter.emit(event).unwrap();
}

fn demo_mobile_video() {
    println!("Demo 2: Mobile video event");
    println!("--------------------------");

    let event = Event::try_from(json!({
        "name": "edx.video.seeked",
        "context": {
            "application": {"name": "edx.mobileapp.iOS", "version": "1.0.02"},
            "open_in_browser_url": "https://courses.example.com/courses/course-v1:edX+DemoX+Demo/jump_to/intro",
        },
        "data": {
            "module_id": "i4x://edX/DemoX/video/intro",
            "current_time": 95,
            "seek_type": "skip",
            "requested_skip_interval": 30
        }
    }))
    .unwrap();
    show("Input", &event);

    let processed = Pipeline::canonical().process(event).unwrap();
    show("\nLegacy event", &processed);
}

fn demo_usage_keys() {
    println!("Demo 3: Usage keys");
    println!("------------------");

    for raw in [
        "block-v1:edX+DemoX+Demo+type@video+block@intro",
        "i4x://edX/DemoX/video/intro.mp4",
        "not-a-key",
    ] {
        match raw.parse::<UsageKey>() {
            Ok(key) => println!("  {} -> html id {}", raw, key.html_id()),
            Err(err) => println!("  {} -> {}", raw, err),
        }
    }
}

struct PrintingReceiver;

impl ScoreChangedReceiver for PrintingReceiver {
    fn score_changed(&self, notification: &ScoreChanged) {
        println!("  SCORE_CHANGED {}", serde_json::to_string(notification).unwrap());
    }
}

fn demo_score_signals() {
    println!("Demo 4: Score notifications");
    println!("---------------------------");

    let adapter = ScoreSignalAdapter::new(
        |anonymous_user_id: &str| -> Option<i64> { (anonymous_user_id == "anon-42").then_some(42) },
        PrintingReceiver,
    );

    let signal = ScoreSet {
        points_possible: Some(3.0),
        points_earned: Some(2.0),
        anonymous_user_id: Some("anon-42".to_string()),
        course_id: Some("course-v1:edX+DemoX+Demo".to_string()),
        item_id: Some("block-v1:edX+DemoX+Demo+type@problem+block@p1".to_string()),
    };
    adapter.on_score_set(&signal);

    let incomplete = ScoreSet {
        item_id: None,
        ..signal
    };
    if adapter.on_score_set(&incomplete).is_none() {
        println!("  incomplete score_set dropped");
    }
}

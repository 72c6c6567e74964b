//! Test utilities for trackforge
//!
//! This module provides mock implementations and event builders for testing.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::{Config, FeatureFlags, ProcessingConfig, ServerConfig, SinkConfig};
use crate::error::{Error, Result};
use crate::models::Event;
use crate::signals::{AnonymousUserResolver, ScoreChanged, ScoreChangedReceiver};
use crate::sink::EventSink;

/// Resolver backed by a fixed table
#[derive(Debug, Clone, Default)]
pub struct MockUserResolver {
    users: HashMap<String, i64>,
}

impl MockUserResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, anonymous_user_id: &str, user_id: i64) -> Self {
        self.users.insert(anonymous_user_id.to_string(), user_id);
        self
    }
}

impl AnonymousUserResolver for MockUserResolver {
    fn resolve(&self, anonymous_user_id: &str) -> Option<i64> {
        self.users.get(anonymous_user_id).copied()
    }
}

/// Receiver that keeps every notification
#[derive(Debug, Clone, Default)]
pub struct RecordingReceiver {
    received: Arc<Mutex<Vec<ScoreChanged>>>,
}

impl RecordingReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<ScoreChanged> {
        self.received.lock().unwrap().clone()
    }
}

impl ScoreChangedReceiver for RecordingReceiver {
    fn score_changed(&self, notification: &ScoreChanged) {
        self.received.lock().unwrap().push(notification.clone());
    }
}

/// Sink that can be told to fail its next delivery
#[derive(Debug, Clone, Default)]
pub struct FlakySink {
    delivered: Arc<Mutex<Vec<Event>>>,
    fail_next: Arc<Mutex<Option<String>>>,
}

impl FlakySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the sink to fail on the next delivery
    pub fn fail_next_delivery(&self, error_message: &str) {
        *self.fail_next.lock().unwrap() = Some(error_message.to_string());
    }

    pub fn delivered(&self) -> Vec<Event> {
        self.delivered.lock().unwrap().clone()
    }
}

impl EventSink for FlakySink {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn send(&self, event: &Event) -> Result<()> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(Error::sink("flaky", message));
        }
        self.delivered.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Configuration suitable for tests: no files, metrics on
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "debug".to_string(),
            environment: "test".to_string(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
        },
        processing: ProcessingConfig::default(),
        sinks: SinkConfig::default(),
        features: FeatureFlags { metrics: true },
    }
}

/// Context of an event sent from the LMS in a browser
pub fn browser_context() -> Value {
    json!({
        "username": "learner",
        "session": "0e1ba5c2d1f64cc0b0ec2a1bfe9d3c31",
        "ip": "127.0.0.1",
        "agent": "Mozilla/5.0",
        "host": "courses.example.com",
        "referer": "https://courses.example.com/courses/course-v1:edX+DemoX+Demo/courseware",
        "accept_language": "en-US,en;q=0.8",
        "client_id": "GA1.2.1234567890.1234567890",
        "course_id": "course-v1:edX+DemoX+Demo",
        "event_source": "browser",
        "page": "https://courses.example.com/courses/course-v1:edX+DemoX+Demo/courseware",
        "timestamp": Utc::now().to_rfc3339(),
    })
}

/// Build an event with the given name, browser context and `data`
pub fn browser_event(name: &str, data: Value) -> Event {
    Event::try_from(json!({
        "name": name,
        "context": browser_context(),
        "data": data,
    }))
    .unwrap()
}

pub fn tab_selected_event(current_tab: i64, target_tab: i64) -> Event {
    browser_event(
        "edx.ui.lms.sequence.tab_selected",
        json!({"current_tab": current_tab, "target_tab": target_tab, "tab_count": 10}),
    )
}

pub fn next_selected_event(current_tab: i64, tab_count: i64) -> Event {
    browser_event(
        "edx.ui.lms.sequence.next_selected",
        json!({"current_tab": current_tab, "tab_count": tab_count}),
    )
}

pub fn previous_selected_event(current_tab: i64, tab_count: i64) -> Event {
    browser_event(
        "edx.ui.lms.sequence.previous_selected",
        json!({"current_tab": current_tab, "tab_count": tab_count}),
    )
}

/// A video event sent by the mobile app
pub fn mobile_video_event(name: &str, app_name: &str, app_version: &str, payload: Value) -> Event {
    Event::try_from(json!({
        "name": name,
        "context": {
            "username": "learner",
            "course_id": "course-v1:edX+DemoX+Demo",
            "application": {"name": app_name, "version": app_version},
            "open_in_browser_url": "https://courses.example.com/courses/course-v1:edX+DemoX+Demo/jump_to/block-v1:edX+DemoX+Demo+type@video+block@intro",
            "timestamp": Utc::now().to_rfc3339(),
        },
        "data": payload,
    }))
    .unwrap()
}

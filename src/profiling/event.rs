//! Event types for profiling.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A profiling event with timestamp and optional duration.
#[derive(Serialize)]
pub struct ProfileEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Duration in microseconds (for timed events)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ProfileEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            duration_us: None,
            metadata: None,
        }
    }

    pub fn with_duration(event_type: EventType, duration: std::time::Duration) -> Self {
        Self {
            duration_us: Some(duration.as_micros() as u64),
            ..Self::new(event_type)
        }
    }

    pub fn with_metadata(event_type: EventType, metadata: serde_json::Value) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::new(event_type)
        }
    }
}

/// Types of events that can be logged.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    // === Profiler lifecycle ===
    SessionStart {
        session_id: String,
    },
    SessionEnd {
        total_events: u64,
    },

    // === Scheduling ===
    /// One rating run through an engine
    SrsCalculation {
        /// sm2, fsrs or fsrs6
        algorithm: String,
        item_id: String,
        rating: u8,
    },
    /// A study queue was built
    QueueBuild {
        scheduler: String,
        intraday_learning: usize,
        interday_learning: usize,
        review: usize,
        new: usize,
        /// Size of the buried set passed in
        buried: usize,
    },
    SiblingsBuried {
        item_id: String,
        note_id: String,
        count: usize,
    },
    LeechDetected {
        item_id: String,
        lapses: u32,
        /// tag or suspend
        action: String,
    },

    // === Settings ===
    /// A deck override supplied the settings for a deck
    SettingsResolved {
        deck_id: String,
        /// Deck whose settings were used
        source: String,
    },

    // === Timed scope ===
    /// A timed code block completed; the duration is on the event
    TimedScope {
        name: String,
    },

    // === Custom events ===
    Custom {
        name: String,
        data: serde_json::Value,
    },
}

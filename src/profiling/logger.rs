//! JSONL file logger for profiling events.

#![allow(dead_code)]

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use super::event::{EventType, ProfileEvent};

/// Directory profile files go to unless `init_in` names another
pub const DEFAULT_PROFILE_DIR: &str = "data";

/// Global logger instance - must be initialized via init().
static LOGGER: Mutex<Option<ProfileLogger>> = Mutex::new(None);

/// Event counter for session statistics.
static EVENT_COUNT: AtomicU64 = AtomicU64::new(0);

/// Writes events to a JSONL file.
pub struct ProfileLogger {
    writer: BufWriter<File>,
    session_id: String,
    path: PathBuf,
}

impl ProfileLogger {
    /// Create a new logger with a timestamped filename in `dir`.
    fn new(dir: &Path) -> std::io::Result<Self> {
        let session_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        create_dir_all(dir)?;
        let path = dir.join(format!("profile_{}.jsonl", session_id));

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!("Profiling enabled: writing to {}", path.display());

        Ok(Self {
            writer: BufWriter::new(file),
            session_id,
            path,
        })
    }

    fn log(&mut self, event: ProfileEvent) {
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = writeln!(self.writer, "{}", json);
            // Flush every 100 events
            if EVENT_COUNT.load(Ordering::Relaxed) % 100 == 0 {
                let _ = self.writer.flush();
            }
            tracing::trace!("[PROFILE] {}", json);
        }
        EVENT_COUNT.fetch_add(1, Ordering::Relaxed);
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Initialize the profiler writing to `data/`.
pub fn init() {
    init_in(Path::new(DEFAULT_PROFILE_DIR));
}

/// Initialize the profiler writing to `dir`. Returns the log file path.
pub fn init_in(dir: &Path) -> Option<PathBuf> {
    let Ok(mut guard) = LOGGER.lock() else {
        return None;
    };
    if guard.is_some() {
        tracing::warn!("Profiler already initialized");
        return None;
    }

    match ProfileLogger::new(dir) {
        Ok(logger) => {
            let session_id = logger.session_id.clone();
            let path = logger.path.clone();
            *guard = Some(logger);

            drop(guard); // Release lock before logging
            log_event(EventType::SessionStart { session_id });
            Some(path)
        }
        Err(e) => {
            tracing::error!("Failed to initialize profiler: {}", e);
            None
        }
    }
}

/// Shutdown the profiler and flush remaining events.
pub fn shutdown() {
    let total_events = EVENT_COUNT.load(Ordering::Relaxed);
    log_event(EventType::SessionEnd { total_events });

    let Ok(mut guard) = LOGGER.lock() else {
        return;
    };
    if let Some(ref mut logger) = *guard {
        logger.flush();
        tracing::info!("Profiling session ended: {} events logged", total_events);
    }
    *guard = None;
}

fn write(event: ProfileEvent) {
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.log(event);
        }
    }
}

pub fn log_event(event_type: EventType) {
    write(ProfileEvent::new(event_type));
}

pub fn log_event_with_meta(event_type: EventType, metadata: serde_json::Value) {
    write(ProfileEvent::with_metadata(event_type, metadata));
}

/// Log a timed scope completion.
pub fn log_timed(name: &str, duration: Duration) {
    write(ProfileEvent::with_duration(
        EventType::TimedScope {
            name: name.to_string(),
        },
        duration,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ProfileEvent::new(EventType::QueueBuild {
            scheduler: "fsrs6".into(),
            intraday_learning: 1,
            interday_learning: 0,
            review: 12,
            new: 5,
            buried: 2,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"queue_build\""));
        assert!(json.contains("\"review\":12"));
        assert!(!json.contains("duration_us"));
    }

    #[test]
    fn test_timed_scope_carries_duration() {
        let event = ProfileEvent::with_duration(
            EventType::TimedScope {
                name: "build_queue".into(),
            },
            Duration::from_micros(1500),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"duration_us\":1500"));
        assert!(json.contains("timed_scope"));
    }

    #[test]
    fn test_logger_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_in(dir.path()).unwrap();
        log_event(EventType::LeechDetected {
            item_id: "a".into(),
            lapses: 8,
            action: "tag".into(),
        });
        crate::profile_log!(
            EventType::SettingsResolved {
                deck_id: "anatomy".into(),
                source: "sciences".into(),
            },
            depth = 2,
            cached = false,
        );
        shutdown();

        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.lines().count() >= 3);
        assert!(contents.contains("session_start"));
        assert!(contents.contains("leech_detected"));
        assert!(contents.contains(r#""metadata":{"cached":false,"depth":2}"#));
        assert!(contents.contains("session_end"));
    }
}

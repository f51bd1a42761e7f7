//! Spaced-repetition scheduling core for flashcards and multiple-choice questions.
//!
//! Everything here is synchronous and free of I/O apart from settings loading
//! in [`config`]. Callers hand in items and settings, and get back updated
//! items, review logs and ordered study queues to persist or render.

pub mod config;
pub mod domain;
pub mod error;
pub mod profiling;
pub mod session;
pub mod settings;
pub mod srs;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use domain::{ItemState, Rating, ReviewLog, Scheduler, StudyItem};
pub use error::{Result, SchedulerError};
pub use session::SessionState;
pub use settings::EffectiveSettings;

//! Scheduling engines and the session pipeline built on them.
//!
//! - `sm2` / `fsrs_scheduler`: per-algorithm state machines
//! - `processor`: applies one rating to an item
//! - `leech` / `bury`: follow-up effects of a rating
//! - `queue`: builds the daily study queue

pub mod bury;
pub mod fsrs_scheduler;
pub mod leech;
pub mod processor;
pub mod queue;
pub mod sm2;

pub use bury::{should_bury, siblings_to_bury};
pub use fsrs_scheduler::{calculate_fsrs, FsrsEngine};
pub use leech::apply_leech_policy;
pub use processor::{process, ProcessResult, RatingOutcome};
pub use queue::{build_queue, QueueBuilder, QueueCounts, QueueKind, StudyQueue};
pub use sm2::{calculate_sm2, Sm2Engine};

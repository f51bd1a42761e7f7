//! Error type for the scheduling engine.
//!
//! Only contract violations and genuine failures surface here. Malformed
//! configuration is absorbed with safe defaults and never reaches callers
//! as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
  /// Rating value outside the user-facing 1..=4 range
  #[error("Invalid rating: {0}")]
  InvalidRating(u8),

  /// Step token rejected by the strict step parser
  #[error("Invalid learning step: {0}")]
  InvalidStep(String),

  /// The FSRS memory model rejected its input
  #[error("FSRS model error: {0}")]
  Fsrs(String),

  /// Settings file could not be read
  #[error("Failed to read settings: {0}")]
  Io(#[from] std::io::Error),

  /// Settings file could not be parsed
  #[error("Failed to parse settings: {0}")]
  Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

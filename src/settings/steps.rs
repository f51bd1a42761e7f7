//! Learning step strings.
//!
//! A step string is a whitespace-separated list of delays: a bare integer or
//! `<n>m` means minutes, `<n>h` hours and `<n>d` days. "1m 10m 1d" becomes
//! `[1, 10, 1440]`.

use crate::config::{DEFAULT_STEP_MINUTES, MAX_STEP_MINUTES, MINUTES_PER_DAY};
use crate::error::{Result, SchedulerError};

/// Parse a step string, replacing every unparsable token with a 1 minute step.
pub fn parse_steps(input: &str) -> Vec<i64> {
  input
    .split_whitespace()
    .map(|token| {
      parse_step(token).unwrap_or_else(|| {
        tracing::warn!(
          "unparsable learning step {:?}, using {} minute",
          token,
          DEFAULT_STEP_MINUTES
        );
        DEFAULT_STEP_MINUTES
      })
    })
    .collect()
}

/// Parse a step string, rejecting the first unparsable token.
pub fn parse_steps_strict(input: &str) -> Result<Vec<i64>> {
  input
    .split_whitespace()
    .map(|token| parse_step(token).ok_or_else(|| SchedulerError::InvalidStep(token.to_string())))
    .collect()
}

/// Delay of the step at `index`, or the default step if the list is shorter.
pub fn step_minutes(steps: &[i64], index: usize) -> i64 {
  steps.get(index).copied().unwrap_or(DEFAULT_STEP_MINUTES)
}

fn parse_step(token: &str) -> Option<i64> {
  let token = token.trim().to_ascii_lowercase();
  let (digits, unit) = match token.char_indices().last()? {
    (i, 'm') => (&token[..i], 1),
    (i, 'h') => (&token[..i], 60),
    (i, 'd') => (&token[..i], MINUTES_PER_DAY),
    _ => (token.as_str(), 1),
  };

  let value: i64 = digits.parse().ok()?;
  if value <= 0 {
    return None;
  }
  let minutes = value.saturating_mul(unit);
  if minutes > MAX_STEP_MINUTES {
    tracing::warn!("learning step {:?} too long, using {} minutes", token, MAX_STEP_MINUTES);
    return Some(MAX_STEP_MINUTES);
  }
  Some(minutes)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::srs_state::ItemState;
use super::ItemId;
use crate::error::SchedulerError;

/// User rating of a review. The numeric values double as keyboard shortcuts 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
  /// SM-2 quality 0. Never offered to users and rejected by the rating processor.
  Manual = 0,
  Again = 1,
  Hard = 2,
  Good = 3,
  Easy = 4,
}

impl Rating {
  pub fn as_u8(&self) -> u8 {
    *self as u8
  }

  /// Keyboard shortcut mapping used by the study UI
  pub fn from_key(key: char) -> Option<Self> {
    match key {
      '1' => Some(Self::Again),
      '2' => Some(Self::Hard),
      '3' => Some(Self::Good),
      '4' => Some(Self::Easy),
      _ => None,
    }
  }

  /// Recalled, however hard it was. Again and Manual count as failures.
  pub fn is_correct(&self) -> bool {
    matches!(self, Self::Hard | Self::Good | Self::Easy)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Manual => "manual",
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }
}

impl TryFrom<u8> for Rating {
  type Error = SchedulerError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(Self::Again),
      2 => Ok(Self::Hard),
      3 => Ok(Self::Good),
      4 => Ok(Self::Easy),
      other => Err(SchedulerError::InvalidRating(other)),
    }
  }
}

impl From<Rating> for u8 {
  fn from(rating: Rating) -> Self {
    rating.as_u8()
  }
}

/// One rating event. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
  pub item_id: ItemId,
  pub rating: Rating,
  pub review_timestamp: DateTime<Utc>,
  pub duration_ms: u64,
  pub resulting_state: ItemState,
}

impl ReviewLog {
  pub fn new(
    item_id: impl Into<ItemId>,
    rating: Rating,
    review_timestamp: DateTime<Utc>,
    duration_ms: u64,
    resulting_state: ItemState,
  ) -> Self {
    Self {
      item_id: item_id.into(),
      rating,
      review_timestamp,
      duration_ms,
      resulting_state,
    }
  }
}

/// Items whose most recent rating at or after `since` was a failure.
/// Backs the "recently failed" study filter.
pub fn failed_since(logs: &[ReviewLog], since: DateTime<Utc>) -> HashSet<ItemId> {
  let mut latest: HashMap<&str, &ReviewLog> = HashMap::new();
  for log in logs.iter().filter(|l| l.review_timestamp >= since) {
    latest
      .entry(log.item_id.as_str())
      .and_modify(|current| {
        if log.review_timestamp >= current.review_timestamp {
          *current = log;
        }
      })
      .or_insert(log);
  }

  latest
    .into_iter()
    .filter(|(_, log)| !log.rating.is_correct())
    .map(|(id, _)| id.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
  }

  fn log(id: &str, rating: Rating, minutes: i64) -> ReviewLog {
    ReviewLog::new(id, rating, at(minutes), 1200, ItemState::Review)
  }

  #[test]
  fn test_rating_values() {
    assert_eq!(Rating::Manual as u8, 0);
    assert_eq!(Rating::Again as u8, 1);
    assert_eq!(Rating::Hard as u8, 2);
    assert_eq!(Rating::Good as u8, 3);
    assert_eq!(Rating::Easy as u8, 4);
  }

  #[test]
  fn test_rating_try_from() {
    assert_eq!(Rating::try_from(1u8).unwrap(), Rating::Again);
    assert_eq!(Rating::try_from(4u8).unwrap(), Rating::Easy);
    assert!(matches!(
      Rating::try_from(0u8),
      Err(SchedulerError::InvalidRating(0))
    ));
    assert!(matches!(
      Rating::try_from(5u8),
      Err(SchedulerError::InvalidRating(5))
    ));
  }

  #[test]
  fn test_rating_from_key() {
    assert_eq!(Rating::from_key('1'), Some(Rating::Again));
    assert_eq!(Rating::from_key('3'), Some(Rating::Good));
    assert_eq!(Rating::from_key('0'), None);
    assert_eq!(Rating::from_key('x'), None);
  }

  #[test]
  fn test_rating_serializes_as_number() {
    assert_eq!(serde_json::to_string(&Rating::Good).unwrap(), "3");
    let parsed: Rating = serde_json::from_str("2").unwrap();
    assert_eq!(parsed, Rating::Hard);
    assert!(serde_json::from_str::<Rating>("0").is_err());
  }

  #[test]
  fn test_rating_is_correct() {
    assert!(!Rating::Again.is_correct());
    assert!(Rating::Hard.is_correct());
    assert!(Rating::Easy.is_correct());
  }

  #[test]
  fn test_review_log_roundtrip() {
    let entry = log("card-1", Rating::Easy, 5);
    let json = serde_json::to_string(&entry).unwrap();
    let parsed: ReviewLog = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, entry);
  }

  #[test]
  fn test_failed_since_uses_latest_rating() {
    let logs = vec![
      log("a", Rating::Again, 0),
      log("a", Rating::Good, 10),
      log("b", Rating::Good, 0),
      log("b", Rating::Again, 10),
      log("c", Rating::Again, 20),
    ];
    let failed = failed_since(&logs, at(0));
    assert!(!failed.contains("a"));
    assert!(failed.contains("b"));
    assert!(failed.contains("c"));
  }

  #[test]
  fn test_failed_since_ignores_old_logs() {
    let logs = vec![log("a", Rating::Again, -120), log("b", Rating::Again, 5)];
    let failed = failed_since(&logs, at(0));
    assert_eq!(failed.len(), 1);
    assert!(failed.contains("b"));
  }

  #[test]
  fn test_failed_since_counts_only_failures() {
    let logs = vec![log("a", Rating::Hard, 0), log("b", Rating::Again, 0)];
    let failed = failed_since(&logs, at(0));
    assert_eq!(failed, HashSet::from(["b".to_string()]));
  }
}

//! In-memory state of one study session.
//!
//! The queue is built once when the session starts. Rating an item may bury
//! its siblings, which only makes them skipped: the queue itself never shrinks.
//! Burial lasts until the session is dropped and a new one is built.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::domain::{ItemId, Rating, StudyItem};
use crate::error::Result;
use crate::settings::EffectiveSettings;
use crate::srs::{
  process, should_bury, siblings_to_bury, ProcessResult, QueueBuilder, QueueCounts, RatingOutcome,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
  pub queue: Vec<ItemId>,
  pub cursor: usize,
  pub buried: HashSet<ItemId>,
}

impl SessionState {
  pub fn new(queue: Vec<ItemId>) -> Self {
    Self {
      queue,
      cursor: 0,
      buried: HashSet::new(),
    }
  }

  /// Build the day's queue and start a session on it
  pub fn start(
    items: &[StudyItem],
    settings: &EffectiveSettings,
    now: DateTime<Utc>,
  ) -> (Self, QueueCounts) {
    let queue = QueueBuilder::new(settings, now).build(items, &HashSet::new());
    (Self::new(queue.ids()), queue.counts)
  }

  fn current_index(&self) -> Option<usize> {
    (self.cursor..self.queue.len()).find(|&i| !self.buried.contains(&self.queue[i]))
  }

  /// First unburied item at or after the cursor
  pub fn current(&self) -> Option<&ItemId> {
    self.current_index().map(|i| &self.queue[i])
  }

  /// Move past the current item
  pub fn advance(&mut self) {
    self.cursor = match self.current_index() {
      Some(i) => i + 1,
      None => self.queue.len(),
    };
  }

  pub fn is_buried(&self, id: &str) -> bool {
    self.buried.contains(id)
  }

  /// Unburied items left, counting the current one
  pub fn remaining(&self) -> usize {
    self.queue[self.cursor.min(self.queue.len())..]
      .iter()
      .filter(|id| !self.buried.contains(*id))
      .count()
  }

  pub fn is_finished(&self) -> bool {
    self.current_index().is_none()
  }

  /// Account for a rating of `rated` (the item as it was before rating).
  ///
  /// Buries its siblings from `items` if the settings ask for it, moves past it
  /// if it is the current item, and queues it again at the end if it is still
  /// in a sub-day learning step. Returns the newly buried ids.
  pub fn record(
    &mut self,
    rated: &StudyItem,
    outcome: &RatingOutcome,
    settings: &EffectiveSettings,
    items: &[StudyItem],
  ) -> Vec<ItemId> {
    let mut newly_buried = Vec::new();
    if should_bury(rated, outcome, settings) {
      for id in siblings_to_bury(rated, items) {
        if self.buried.insert(id.clone()) {
          newly_buried.push(id);
        }
      }
    }

    if !newly_buried.is_empty() {
      tracing::debug!("Buried {} siblings of {}", newly_buried.len(), rated.id);
      #[cfg(feature = "profiling")]
      crate::profile_log!(crate::profiling::EventType::SiblingsBuried {
        item_id: rated.id.clone(),
        note_id: rated.note_id.clone().unwrap_or_default(),
        count: newly_buried.len(),
      });
    }

    if self.current() == Some(&rated.id) {
      self.advance();
    }

    if outcome.is_intraday_learning() {
      let pending = self.queue[self.cursor.min(self.queue.len())..].contains(&rated.id);
      if !pending {
        self.queue.push(rated.id.clone());
      }
    }

    newly_buried
  }

  /// Rate `item` and record the result in this session.
  ///
  /// `items` is the collection the session was built from; it is only read to
  /// find siblings.
  pub fn rate(
    &mut self,
    item: &StudyItem,
    rating: Rating,
    settings: &EffectiveSettings,
    now: DateTime<Utc>,
    duration_ms: u64,
    items: &[StudyItem],
  ) -> Result<ProcessResult> {
    let result = process(item, rating, settings, now, duration_ms)?;
    self.record(item, &result.outcome, settings, items);
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ItemState, Scheduler};
  use crate::testing::new_item;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
  }

  fn session(ids: &[&str]) -> SessionState {
    SessionState::new(ids.iter().map(|id| id.to_string()).collect())
  }

  fn outcome(prior_state: ItemState, resulting_state: ItemState, delay: i64) -> RatingOutcome {
    RatingOutcome {
      prior_state,
      resulting_state,
      lapsed: false,
      leech_action: None,
      next_delay_minutes: delay,
    }
  }

  #[test]
  fn test_current_skips_buried() {
    let mut state = session(&["a", "b", "c"]);
    state.buried.insert("a".to_string());
    state.buried.insert("b".to_string());
    assert_eq!(state.current().map(String::as_str), Some("c"));
    assert_eq!(state.remaining(), 1);
  }

  #[test]
  fn test_advance_to_end() {
    let mut state = session(&["a", "b"]);
    state.advance();
    assert_eq!(state.current().map(String::as_str), Some("b"));
    state.advance();
    assert!(state.current().is_none());
    assert!(state.is_finished());
    state.advance();
    assert_eq!(state.cursor, 2);
    assert_eq!(state.remaining(), 0);
  }

  #[test]
  fn test_record_buries_siblings_and_advances() {
    let items = vec![
      new_item("a", Some("n1"), 0),
      new_item("b", Some("n1"), 1),
      new_item("c", Some("n2"), 2),
    ];
    let settings = EffectiveSettings {
      bury_new_siblings: true,
      ..Default::default()
    };
    let mut state = session(&["a", "b", "c"]);

    let buried = state.record(
      &items[0],
      &outcome(ItemState::New, ItemState::Review, 1440),
      &settings,
      &items,
    );

    assert_eq!(buried, vec!["b"]);
    assert!(state.is_buried("b"));
    assert_eq!(state.current().map(String::as_str), Some("c"));
  }

  #[test]
  fn test_burial_is_monotonic() {
    let items = vec![new_item("a", Some("n1"), 0), new_item("b", Some("n1"), 1)];
    let mut state = session(&["a", "b"]);
    state.buried.insert("b".to_string());

    // A later rating with burying off never un-buries
    state.record(
      &items[0],
      &outcome(ItemState::New, ItemState::Learning, 1),
      &EffectiveSettings::default(),
      &items,
    );
    assert!(state.is_buried("b"));
  }

  #[test]
  fn test_intraday_learning_is_requeued() {
    let items = vec![new_item("a", None, 0), new_item("b", None, 1)];
    let mut state = session(&["a", "b"]);

    state.record(
      &items[0],
      &outcome(ItemState::New, ItemState::Learning, 1),
      &EffectiveSettings::default(),
      &items,
    );
    assert_eq!(state.queue, vec!["a", "b", "a"]);
    assert_eq!(state.current().map(String::as_str), Some("b"));

    // Graduating does not requeue
    state.record(
      &items[1],
      &outcome(ItemState::New, ItemState::Review, 1440),
      &EffectiveSettings::default(),
      &items,
    );
    assert_eq!(state.queue, vec!["a", "b", "a"]);
    assert_eq!(state.current().map(String::as_str), Some("a"));
  }

  #[test]
  fn test_rate_runs_processor() {
    let items = vec![new_item("a", Some("n1"), 0), new_item("b", Some("n1"), 1)];
    let settings = EffectiveSettings {
      scheduler: Scheduler::Sm2,
      bury_new_siblings: true,
      ..Default::default()
    };

    let (mut state, counts) = SessionState::start(&items, &settings, now());
    assert_eq!(counts.new, 2);

    let result = state.rate(&items[0], Rating::Easy, &settings, now(), 900, &items).unwrap();
    assert_eq!(result.outcome.resulting_state, ItemState::Review);
    assert!(state.is_buried("b"));
    assert!(state.is_finished());
  }
}

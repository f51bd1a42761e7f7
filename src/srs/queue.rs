//! Daily study queue.
//!
//! Items are sorted into four buckets by their state under the active
//! scheduler, each bucket is ordered and capped according to the settings,
//! and the buckets are stitched together:
//!
//! ```text
//! intraday learning | (interday learning + reviews) mixed with new cards
//! ```
//!
//! Intraday learning always comes first since its steps are shorter than a day.
//! Random orderings draw from the thread RNG unless a caller supplies one.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use super::sm2::add_minutes;
use crate::config::MINUTES_PER_DAY;
use crate::domain::{ItemId, ItemState, StudyItem};
use crate::settings::{
  step_minutes, EffectiveSettings, InterleaveOrder, NewCardGatherOrder, NewCardSortOrder,
  ReviewSortOrder,
};

/// Bucket an item falls into when a queue is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
  /// Learning or relearning with a step shorter than a day
  IntradayLearning,
  /// Learning or relearning with a step of a day or more
  InterdayLearning,
  Review,
  New,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
  pub intraday_learning: usize,
  pub interday_learning: usize,
  pub review: usize,
  pub new: usize,
}

impl QueueCounts {
  pub fn total(&self) -> usize {
    self.intraday_learning + self.interday_learning + self.review + self.new
  }
}

/// Ordered items for one session
#[derive(Debug, Clone, Default)]
pub struct StudyQueue {
  pub items: Vec<StudyItem>,
  pub counts: QueueCounts,
}

impl StudyQueue {
  pub fn ids(&self) -> Vec<ItemId> {
    self.items.iter().map(|item| item.id.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// Nothing due: the "all caught up" state
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

pub struct QueueBuilder<'a> {
  settings: &'a EffectiveSettings,
  now: DateTime<Utc>,
  learning_steps: Vec<i64>,
  relearning_steps: Vec<i64>,
}

impl<'a> QueueBuilder<'a> {
  pub fn new(settings: &'a EffectiveSettings, now: DateTime<Utc>) -> Self {
    Self {
      settings,
      now,
      learning_steps: settings.learning_steps_minutes(),
      relearning_steps: settings.relearning_steps_minutes(),
    }
  }

  /// Bucket for `item`, or None if it is not due in this session.
  /// Suspension and burial are not considered here.
  pub fn categorize(&self, item: &StudyItem) -> Option<QueueKind> {
    let scheduler = self.settings.scheduler;
    let state = item.srs.active_state(scheduler);
    if state == ItemState::New {
      return Some(QueueKind::New);
    }

    let due = item.srs.active_due(scheduler)?;
    match state {
      ItemState::Review => (due <= self.now).then_some(QueueKind::Review),
      ItemState::Learning | ItemState::Relearning => {
        if self.step_delay_minutes(item) < MINUTES_PER_DAY {
          let horizon = add_minutes(self.now, self.settings.learn_ahead_minutes.max(0));
          (due <= horizon).then_some(QueueKind::IntradayLearning)
        } else {
          (due <= self.now).then_some(QueueKind::InterdayLearning)
        }
      }
      ItemState::New => Some(QueueKind::New),
    }
  }

  /// Length of the step the item is currently waiting out
  fn step_delay_minutes(&self, item: &StudyItem) -> i64 {
    let scheduler = self.settings.scheduler;
    match scheduler.fsrs_version() {
      None => item.srs.sm2().map_or(0, |sub| {
        let steps = match sub.state {
          ItemState::Relearning => &self.relearning_steps,
          _ => &self.learning_steps,
        };
        step_minutes(steps, sub.learning_step.unwrap_or(0) as usize)
      }),
      Some(version) => item
        .srs
        .fsrs(version)
        .map_or(0, |sub| (sub.scheduled_days * MINUTES_PER_DAY as f64).round() as i64),
    }
  }

  /// Build a queue with the thread RNG for random orderings.
  pub fn build(&self, items: &[StudyItem], buried: &HashSet<ItemId>) -> StudyQueue {
    crate::profile_scope!("build_queue", self.build_with_rng(items, buried, &mut rand::rng()))
  }

  pub fn build_with_rng<R: Rng + ?Sized>(
    &self,
    items: &[StudyItem],
    buried: &HashSet<ItemId>,
    rng: &mut R,
  ) -> StudyQueue {
    let mut intraday = Vec::new();
    let mut interday = Vec::new();
    let mut review = Vec::new();
    let mut new = Vec::new();

    for item in items {
      if item.srs.is_suspended || buried.contains(&item.id) {
        continue;
      }
      match self.categorize(item) {
        Some(QueueKind::IntradayLearning) => intraday.push(item),
        Some(QueueKind::InterdayLearning) => interday.push(item),
        Some(QueueKind::Review) => review.push(item),
        Some(QueueKind::New) => new.push(item),
        None => {}
      }
    }

    // New cards: gather, cap, then sort for presentation
    match self.settings.new_card_gather_order {
      NewCardGatherOrder::SequentialAscending => new.sort_by_key(|item| item.srs.new_card_order),
      NewCardGatherOrder::SequentialDescending => {
        new.sort_by_key(|item| std::cmp::Reverse(item.srs.new_card_order))
      }
      NewCardGatherOrder::Random => new.shuffle(rng),
    }
    new.truncate(self.settings.new_cards_per_day);
    if self.settings.new_card_sort_order == NewCardSortOrder::Random {
      new.shuffle(rng);
    }

    self.sort_reviews(&mut review, rng);
    review.truncate(self.settings.max_reviews_per_day);

    interday.sort_by_key(|item| self.due(item));
    intraday.sort_by_key(|item| self.due(item));

    let counts = QueueCounts {
      intraday_learning: intraday.len(),
      interday_learning: interday.len(),
      review: review.len(),
      new: new.len(),
    };

    let reviews = interleave(interday, review, self.settings.interday_learning_review_order, rng);
    let rest = interleave(new, reviews, self.settings.new_review_order, rng);

    let mut ordered = intraday;
    ordered.extend(rest);

    tracing::debug!(
      "Built queue of {} from {} items ({} intraday, {} interday, {} review, {} new)",
      ordered.len(),
      items.len(),
      counts.intraday_learning,
      counts.interday_learning,
      counts.review,
      counts.new
    );

    #[cfg(feature = "profiling")]
    crate::profile_log!(crate::profiling::EventType::QueueBuild {
      scheduler: self.settings.scheduler.as_str().to_string(),
      intraday_learning: counts.intraday_learning,
      interday_learning: counts.interday_learning,
      review: counts.review,
      new: counts.new,
      buried: buried.len(),
    });

    StudyQueue {
      items: ordered.into_iter().cloned().collect(),
      counts,
    }
  }

  fn sort_reviews<R: Rng + ?Sized>(&self, review: &mut [&StudyItem], rng: &mut R) {
    match self.settings.review_sort_order {
      ReviewSortOrder::DueDate => review.sort_by_key(|item| self.due(item)),
      ReviewSortOrder::DueDateRandom => {
        // Shuffle first; the stable sort keeps the shuffled order within a day
        review.shuffle(rng);
        review.sort_by_key(|item| self.due(item).map(|due| due.date_naive()));
      }
      ReviewSortOrder::Random => review.shuffle(rng),
      ReviewSortOrder::IntervalAscending => {
        review.sort_by(|a, b| self.interval_days(a).total_cmp(&self.interval_days(b)))
      }
      ReviewSortOrder::IntervalDescending => {
        review.sort_by(|a, b| self.interval_days(b).total_cmp(&self.interval_days(a)))
      }
    }
  }

  fn due(&self, item: &StudyItem) -> Option<DateTime<Utc>> {
    item.srs.active_due(self.settings.scheduler)
  }

  fn interval_days(&self, item: &StudyItem) -> f64 {
    match self.settings.scheduler.fsrs_version() {
      None => item.srs.sm2().map_or(0.0, |sub| sub.interval),
      Some(version) => item.srs.fsrs(version).map_or(0.0, |sub| sub.scheduled_days),
    }
  }
}

/// Place `group` relative to `others`
fn interleave<'i, R: Rng + ?Sized>(
  group: Vec<&'i StudyItem>,
  others: Vec<&'i StudyItem>,
  order: InterleaveOrder,
  rng: &mut R,
) -> Vec<&'i StudyItem> {
  match order {
    InterleaveOrder::Before => group.into_iter().chain(others).collect(),
    InterleaveOrder::After => others.into_iter().chain(group).collect(),
    InterleaveOrder::Mix => {
      let mut mixed: Vec<_> = group.into_iter().chain(others).collect();
      mixed.shuffle(rng);
      mixed
    }
  }
}

/// Build a session queue for `items`.
pub fn build_queue(
  items: &[StudyItem],
  settings: &EffectiveSettings,
  now: DateTime<Utc>,
  buried: &HashSet<ItemId>,
) -> StudyQueue {
  QueueBuilder::new(settings, now).build(items, buried)
}

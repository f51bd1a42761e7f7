//! Resolved scheduling configuration.
//!
//! `EffectiveSettings` is the single value every engine call receives. It is
//! deserializable from partial documents: any missing field takes the default
//! from [`crate::config`].

pub mod resolver;
pub mod steps;

pub use resolver::{resolve, resolve_for_item, DeckNode, DeckTree};
pub use steps::{parse_steps, parse_steps_strict, step_minutes};

use serde::{Deserialize, Serialize};

use crate::config;
pub use crate::domain::Scheduler;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectiveSettings {
  pub scheduler: Scheduler,
  pub fsrs: FsrsParameters,
  pub sm2: Sm2Parameters,

  pub new_cards_per_day: usize,
  pub max_reviews_per_day: usize,

  pub new_card_gather_order: NewCardGatherOrder,
  pub new_card_sort_order: NewCardSortOrder,
  pub review_sort_order: ReviewSortOrder,
  pub interday_learning_review_order: InterleaveOrder,
  pub new_review_order: InterleaveOrder,
  /// Intraday learning cards due within this many minutes join the session early
  pub learn_ahead_minutes: i64,

  pub bury_new_siblings: bool,
  pub bury_review_siblings: bool,
  pub bury_interday_learning_siblings: bool,

  pub leech: LeechPolicy,

  /// Step string, e.g. "1m 10m"
  pub learning_steps: String,
  pub relearning_steps: String,
}

impl Default for EffectiveSettings {
  fn default() -> Self {
    Self {
      scheduler: Scheduler::default(),
      fsrs: FsrsParameters::default(),
      sm2: Sm2Parameters::default(),
      new_cards_per_day: config::DEFAULT_NEW_CARDS_PER_DAY,
      max_reviews_per_day: config::DEFAULT_MAX_REVIEWS_PER_DAY,
      new_card_gather_order: NewCardGatherOrder::default(),
      new_card_sort_order: NewCardSortOrder::default(),
      review_sort_order: ReviewSortOrder::default(),
      interday_learning_review_order: InterleaveOrder::Before,
      new_review_order: InterleaveOrder::After,
      learn_ahead_minutes: config::DEFAULT_LEARN_AHEAD_MINUTES,
      bury_new_siblings: false,
      bury_review_siblings: false,
      bury_interday_learning_siblings: false,
      leech: LeechPolicy::default(),
      learning_steps: config::DEFAULT_LEARNING_STEPS.to_string(),
      relearning_steps: config::DEFAULT_RELEARNING_STEPS.to_string(),
    }
  }
}

impl EffectiveSettings {
  pub fn learning_steps_minutes(&self) -> Vec<i64> {
    parse_steps(&self.learning_steps)
  }

  pub fn relearning_steps_minutes(&self) -> Vec<i64> {
    parse_steps(&self.relearning_steps)
  }

  /// Replace out-of-range numeric parameters with their defaults.
  pub fn sanitized(mut self) -> Self {
    let (lo, hi) = config::RETENTION_RANGE;
    if !(lo..=hi).contains(&self.fsrs.requested_retention) {
      tracing::warn!(
        "requested retention {} outside {}..={}, using {}",
        self.fsrs.requested_retention,
        lo,
        hi,
        config::DEFAULT_REQUESTED_RETENTION
      );
      self.fsrs.requested_retention = config::DEFAULT_REQUESTED_RETENTION;
    }
    if self.fsrs.maximum_interval == 0 {
      self.fsrs.maximum_interval = config::DEFAULT_MAXIMUM_INTERVAL;
    } else if self.fsrs.maximum_interval > config::DEFAULT_MAXIMUM_INTERVAL {
      tracing::warn!(
        "fsrs maximum interval {} too long, using {}",
        self.fsrs.maximum_interval,
        config::DEFAULT_MAXIMUM_INTERVAL
      );
      self.fsrs.maximum_interval = config::DEFAULT_MAXIMUM_INTERVAL;
    }

    let sm2 = &mut self.sm2;
    if !sm2.minimum_ease.is_finite() || sm2.minimum_ease <= 0.0 {
      sm2.minimum_ease = config::MIN_EASINESS_FACTOR;
    }
    if !sm2.starting_ease.is_finite() || sm2.starting_ease < sm2.minimum_ease {
      tracing::warn!(
        "starting ease {} below minimum, using {}",
        sm2.starting_ease,
        config::DEFAULT_STARTING_EASE
      );
      sm2.starting_ease = config::DEFAULT_STARTING_EASE.max(sm2.minimum_ease);
    }
    sanitize_positive(&mut sm2.easy_bonus, config::DEFAULT_EASY_BONUS);
    sanitize_positive(
      &mut sm2.hard_interval_multiplier,
      config::DEFAULT_HARD_INTERVAL_MULTIPLIER,
    );
    sanitize_positive(&mut sm2.interval_modifier, config::DEFAULT_INTERVAL_MODIFIER);
    sanitize_positive(&mut sm2.graduating_interval, config::DEFAULT_GRADUATING_INTERVAL);
    sanitize_positive(&mut sm2.easy_interval, config::DEFAULT_EASY_INTERVAL);
    sanitize_positive(&mut sm2.minimum_interval, config::DEFAULT_MINIMUM_INTERVAL);
    if !sm2.lapse_interval_multiplier.is_finite() || sm2.lapse_interval_multiplier < 0.0 {
      sm2.lapse_interval_multiplier = config::DEFAULT_LAPSE_INTERVAL_MULTIPLIER;
    }
    if !sm2.lapse_ease_penalty.is_finite() || sm2.lapse_ease_penalty < 0.0 {
      sm2.lapse_ease_penalty = config::DEFAULT_LAPSE_EASE_PENALTY;
    }
    let ceiling = f64::from(config::DEFAULT_MAXIMUM_INTERVAL);
    if sm2.minimum_interval > ceiling {
      tracing::warn!("sm2 minimum interval {} too long, using {}", sm2.minimum_interval, ceiling);
      sm2.minimum_interval = config::DEFAULT_MINIMUM_INTERVAL;
    }
    if !sm2.maximum_interval.is_finite() || sm2.maximum_interval < sm2.minimum_interval {
      sm2.maximum_interval = ceiling;
    } else if sm2.maximum_interval > ceiling {
      tracing::warn!("sm2 maximum interval {} too long, using {}", sm2.maximum_interval, ceiling);
      sm2.maximum_interval = ceiling;
    }
    sm2.graduating_interval = sm2.graduating_interval.min(sm2.maximum_interval);
    sm2.easy_interval = sm2.easy_interval.min(sm2.maximum_interval);
    self
  }
}

fn sanitize_positive(value: &mut f64, default: f64) {
  if !value.is_finite() || *value <= 0.0 {
    tracing::warn!("invalid scheduling parameter {}, using {}", value, default);
    *value = default;
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsrsParameters {
  /// Model weights. Empty means the defaults of the configured FSRS version.
  pub weights: Vec<f32>,
  pub requested_retention: f64,
  /// Days
  pub maximum_interval: u32,
  /// Estimate an initial memory state from SM-2 history instead of starting fresh
  pub seed_from_sm2: bool,
}

impl Default for FsrsParameters {
  fn default() -> Self {
    Self {
      weights: Vec::new(),
      requested_retention: config::DEFAULT_REQUESTED_RETENTION,
      maximum_interval: config::DEFAULT_MAXIMUM_INTERVAL,
      seed_from_sm2: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sm2Parameters {
  pub starting_ease: f64,
  pub minimum_ease: f64,
  pub easy_bonus: f64,
  pub hard_interval_multiplier: f64,
  pub interval_modifier: f64,
  pub lapse_interval_multiplier: f64,
  pub lapse_ease_penalty: f64,
  /// Days
  pub graduating_interval: f64,
  /// Days
  pub easy_interval: f64,
  pub minimum_interval: f64,
  pub maximum_interval: f64,
}

impl Default for Sm2Parameters {
  fn default() -> Self {
    Self {
      starting_ease: config::DEFAULT_STARTING_EASE,
      minimum_ease: config::MIN_EASINESS_FACTOR,
      easy_bonus: config::DEFAULT_EASY_BONUS,
      hard_interval_multiplier: config::DEFAULT_HARD_INTERVAL_MULTIPLIER,
      interval_modifier: config::DEFAULT_INTERVAL_MODIFIER,
      lapse_interval_multiplier: config::DEFAULT_LAPSE_INTERVAL_MULTIPLIER,
      lapse_ease_penalty: config::DEFAULT_LAPSE_EASE_PENALTY,
      graduating_interval: config::DEFAULT_GRADUATING_INTERVAL,
      easy_interval: config::DEFAULT_EASY_INTERVAL,
      minimum_interval: config::DEFAULT_MINIMUM_INTERVAL,
      maximum_interval: f64::from(config::DEFAULT_MAXIMUM_INTERVAL),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeechAction {
  #[default]
  Tag,
  Suspend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeechPolicy {
  /// Lapses at which an item becomes a leech. 0 disables detection.
  pub threshold: u32,
  pub action: LeechAction,
}

impl Default for LeechPolicy {
  fn default() -> Self {
    Self {
      threshold: config::DEFAULT_LEECH_THRESHOLD,
      action: LeechAction::Tag,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NewCardGatherOrder {
  /// Oldest first, by insertion order
  #[default]
  SequentialAscending,
  /// Newest first
  SequentialDescending,
  Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NewCardSortOrder {
  /// Keep the gather order
  #[default]
  Gathered,
  Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewSortOrder {
  DueDate,
  /// Due day, then random within the day
  #[default]
  DueDateRandom,
  Random,
  IntervalAscending,
  IntervalDescending,
}

/// Placement of one group of cards relative to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterleaveOrder {
  Mix,
  Before,
  After,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let settings = EffectiveSettings::default();
    assert_eq!(settings.scheduler, Scheduler::Fsrs6);
    assert_eq!(settings.learning_steps_minutes(), vec![1, 10]);
    assert_eq!(settings.relearning_steps_minutes(), vec![10]);
    assert_eq!(settings.leech.action, LeechAction::Tag);
    assert_eq!(settings.new_review_order, InterleaveOrder::After);
  }

  #[test]
  fn test_enum_serde_names() {
    assert_eq!(
      serde_json::to_string(&NewCardGatherOrder::SequentialDescending).unwrap(),
      "\"sequential-descending\""
    );
    assert_eq!(
      serde_json::to_string(&ReviewSortOrder::DueDateRandom).unwrap(),
      "\"due-date-random\""
    );
    assert_eq!(serde_json::to_string(&InterleaveOrder::Mix).unwrap(), "\"mix\"");
    assert_eq!(serde_json::to_string(&LeechAction::Suspend).unwrap(), "\"suspend\"");
  }

  #[test]
  fn test_partial_json_uses_defaults() {
    let settings: EffectiveSettings =
      serde_json::from_str(r#"{"scheduler": "sm2", "sm2": {"easy_bonus": 1.5}}"#).unwrap();
    assert_eq!(settings.scheduler, Scheduler::Sm2);
    assert!((settings.sm2.easy_bonus - 1.5).abs() < f64::EPSILON);
    assert!((settings.sm2.starting_ease - config::DEFAULT_STARTING_EASE).abs() < f64::EPSILON);
    assert_eq!(settings.new_cards_per_day, config::DEFAULT_NEW_CARDS_PER_DAY);
  }

  #[test]
  fn test_sanitized_replaces_bad_values() {
    let mut settings = EffectiveSettings::default();
    settings.fsrs.requested_retention = 0.2;
    settings.fsrs.maximum_interval = 0;
    settings.sm2.easy_bonus = -1.0;
    settings.sm2.interval_modifier = f64::NAN;
    settings.sm2.lapse_ease_penalty = -0.5;

    let clean = settings.sanitized();
    assert!((clean.fsrs.requested_retention - config::DEFAULT_REQUESTED_RETENTION).abs() < 1e-9);
    assert_eq!(clean.fsrs.maximum_interval, config::DEFAULT_MAXIMUM_INTERVAL);
    assert!((clean.sm2.easy_bonus - config::DEFAULT_EASY_BONUS).abs() < 1e-9);
    assert!((clean.sm2.interval_modifier - config::DEFAULT_INTERVAL_MODIFIER).abs() < 1e-9);
    assert!((clean.sm2.lapse_ease_penalty - config::DEFAULT_LAPSE_EASE_PENALTY).abs() < 1e-9);
  }

  #[test]
  fn test_sanitized_caps_huge_intervals() {
    let mut settings = EffectiveSettings::default();
    settings.fsrs.maximum_interval = u32::MAX;
    settings.sm2.maximum_interval = 1e9;
    settings.sm2.easy_interval = 1e8;

    let clean = settings.sanitized();
    let ceiling = f64::from(config::DEFAULT_MAXIMUM_INTERVAL);
    assert_eq!(clean.fsrs.maximum_interval, config::DEFAULT_MAXIMUM_INTERVAL);
    assert!((clean.sm2.maximum_interval - ceiling).abs() < 1e-9);
    assert!((clean.sm2.easy_interval - ceiling).abs() < 1e-9);
  }

  #[test]
  fn test_sanitized_keeps_valid_values() {
    let mut settings = EffectiveSettings::default();
    settings.fsrs.requested_retention = 0.85;
    settings.sm2.starting_ease = 2.1;
    let clean = settings.clone().sanitized();
    assert_eq!(clean, settings);
  }
}

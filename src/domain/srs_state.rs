use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;

/// Learning state shared by every algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemState {
  New,
  Learning,
  Review,
  Relearning,
}

impl ItemState {
  pub fn from_str(s: &str) -> Self {
    match s {
      "Learning" => Self::Learning,
      "Review" => Self::Review,
      "Relearning" => Self::Relearning,
      _ => Self::New,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Learning => "Learning",
      Self::Review => "Review",
      Self::Relearning => "Relearning",
    }
  }

  /// Learning or relearning: the item is walking a list of minute steps
  pub fn is_learning(&self) -> bool {
    matches!(self, Self::Learning | Self::Relearning)
  }
}

/// Which algorithm schedules the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scheduler {
  Sm2,
  Fsrs,
  #[default]
  Fsrs6,
}

impl Scheduler {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Sm2 => "sm2",
      Self::Fsrs => "fsrs",
      Self::Fsrs6 => "fsrs6",
    }
  }

  pub fn fsrs_version(&self) -> Option<FsrsVersion> {
    match self {
      Self::Sm2 => None,
      Self::Fsrs => Some(FsrsVersion::V4_5),
      Self::Fsrs6 => Some(FsrsVersion::V6),
    }
  }
}

/// FSRS parameter generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsrsVersion {
  V4_5,
  V6,
}

impl FsrsVersion {
  /// Number of model weights this version is trained with
  pub fn weight_count(&self) -> usize {
    match self {
      Self::V4_5 => 17,
      Self::V6 => 21,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sm2SubState {
  pub state: ItemState,
  pub due: DateTime<Utc>,
  pub repetitions: u32,
  pub lapses: u32,
  pub easiness_factor: f64,
  /// Days. For a relearning card this holds the post-lapse interval it re-graduates with.
  pub interval: f64,
  /// Index into the active step list; None before the first step is taken
  #[serde(default)]
  pub learning_step: Option<u32>,
}

impl Sm2SubState {
  pub fn new_card(starting_ease: f64, now: DateTime<Utc>) -> Self {
    Self {
      state: ItemState::New,
      due: now,
      repetitions: 0,
      lapses: 0,
      easiness_factor: starting_ease,
      interval: 0.0,
      learning_step: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsrsSubState {
  pub state: ItemState,
  pub due: DateTime<Utc>,
  /// 0.0 until the first rating
  pub stability: f64,
  /// 1..=10 once rated; 0.0 until the first rating
  pub difficulty: f64,
  pub elapsed_days: f64,
  pub scheduled_days: f64,
  pub reps: u32,
  pub lapses: u32,
  pub last_review: Option<DateTime<Utc>>,
  #[serde(default)]
  pub learning_step: Option<u32>,
}

impl FsrsSubState {
  pub fn new_card(now: DateTime<Utc>) -> Self {
    Self {
      state: ItemState::New,
      due: now,
      stability: 0.0,
      difficulty: 0.0,
      elapsed_days: 0.0,
      scheduled_days: 0.0,
      reps: 0,
      lapses: 0,
      last_review: None,
      learning_step: None,
    }
  }
}

/// Sub-state of whichever scheduler last rated the item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "algorithm", content = "data", rename_all = "snake_case")]
pub enum Schedule {
  #[default]
  Unset,
  Sm2(Sm2SubState),
  Fsrs(FsrsSubState),
  Fsrs6(FsrsSubState),
}

impl Schedule {
  pub fn scheduler(&self) -> Option<Scheduler> {
    match self {
      Self::Unset => None,
      Self::Sm2(_) => Some(Scheduler::Sm2),
      Self::Fsrs(_) => Some(Scheduler::Fsrs),
      Self::Fsrs6(_) => Some(Scheduler::Fsrs6),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SrsState {
  #[serde(default)]
  pub schedule: Schedule,
  #[serde(default)]
  pub is_suspended: bool,
  /// Insertion index used for oldest/newest-first new card ordering
  #[serde(default)]
  pub new_card_order: u64,
}

impl SrsState {
  /// SM-2 sub-state, if SM-2 last scheduled this item
  pub fn sm2(&self) -> Option<&Sm2SubState> {
    match &self.schedule {
      Schedule::Sm2(sub) => Some(sub),
      _ => None,
    }
  }

  /// FSRS sub-state for the given parameter generation, if that version last scheduled this item
  pub fn fsrs(&self, version: FsrsVersion) -> Option<&FsrsSubState> {
    match (&self.schedule, version) {
      (Schedule::Fsrs(sub), FsrsVersion::V4_5) => Some(sub),
      (Schedule::Fsrs6(sub), FsrsVersion::V6) => Some(sub),
      _ => None,
    }
  }

  /// State under the given scheduler. A missing or foreign sub-state reads as New.
  pub fn active_state(&self, scheduler: Scheduler) -> ItemState {
    match scheduler.fsrs_version() {
      None => self.sm2().map_or(ItemState::New, |s| s.state),
      Some(version) => self.fsrs(version).map_or(ItemState::New, |s| s.state),
    }
  }

  /// Due timestamp under the given scheduler; None while the item is New
  pub fn active_due(&self, scheduler: Scheduler) -> Option<DateTime<Utc>> {
    let (state, due) = match scheduler.fsrs_version() {
      None => self.sm2().map(|s| (s.state, s.due))?,
      Some(version) => self.fsrs(version).map(|s| (s.state, s.due))?,
    };
    (state != ItemState::New).then_some(due)
  }

  /// Young/mature split for reviewed items. Presentation only; nothing schedules on it.
  pub fn maturity(&self, scheduler: Scheduler) -> Option<Maturity> {
    let days = match scheduler.fsrs_version() {
      None => self
        .sm2()
        .filter(|s| s.state != ItemState::New)
        .map(|s| s.interval)?,
      Some(version) => self
        .fsrs(version)
        .filter(|s| s.state != ItemState::New)
        .map(|s| s.stability)?,
    };
    Some(if days >= config::MATURE_THRESHOLD_DAYS {
      Maturity::Mature
    } else {
      Maturity::Young
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Maturity {
  Young,
  Mature,
}

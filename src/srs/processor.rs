//! One rating event, end to end.
//!
//! `process` picks the engine for the configured scheduler, applies the
//! rating to the item's sub-state, runs leech detection on lapses and returns
//! the updated item together with the review log. Nothing is written anywhere;
//! persisting the results is the caller's job.

use chrono::{DateTime, Utc};

use super::fsrs_scheduler::FsrsEngine;
use super::leech::apply_leech_policy;
use super::sm2::Sm2Engine;
use crate::domain::{FsrsVersion, ItemState, Rating, ReviewLog, Schedule, StudyItem};
use crate::error::{Result, SchedulerError};
use crate::settings::{EffectiveSettings, LeechAction};

/// What a rating did to an item, as seen by burying and the session
#[derive(Debug, Clone, PartialEq)]
pub struct RatingOutcome {
  pub prior_state: ItemState,
  pub resulting_state: ItemState,
  /// Review -> Relearning
  pub lapsed: bool,
  pub leech_action: Option<LeechAction>,
  /// Minutes until the item is due again
  pub next_delay_minutes: i64,
}

impl RatingOutcome {
  /// Still in (re)learning and due again before tomorrow
  pub fn is_intraday_learning(&self) -> bool {
    self.resulting_state.is_learning() && self.next_delay_minutes < crate::config::MINUTES_PER_DAY
  }
}

#[derive(Debug, Clone)]
pub struct ProcessResult {
  pub item: StudyItem,
  pub log: ReviewLog,
  pub outcome: RatingOutcome,
}

struct Transition {
  schedule: Schedule,
  prior_state: ItemState,
  resulting_state: ItemState,
  lapses: u32,
  due: DateTime<Utc>,
}

/// Apply `rating` to `item` under `settings`.
///
/// A sub-state left behind by another scheduler is ignored and the item starts
/// fresh. `Rating::Manual` is not a user rating and is rejected.
pub fn process(
  item: &StudyItem,
  rating: Rating,
  settings: &EffectiveSettings,
  now: DateTime<Utc>,
  duration_ms: u64,
) -> Result<ProcessResult> {
  if rating == Rating::Manual {
    return Err(SchedulerError::InvalidRating(rating.as_u8()));
  }

  let transition = match settings.scheduler.fsrs_version() {
    None => transition_sm2(item, rating, settings, now),
    Some(version) => transition_fsrs(item, rating, settings, version, now)?,
  };

  let mut updated = item.clone();
  updated.srs.schedule = transition.schedule;

  let lapsed = transition.prior_state == ItemState::Review
    && transition.resulting_state == ItemState::Relearning;
  let leech_action = if lapsed {
    apply_leech_policy(&mut updated, transition.lapses, &settings.leech)
  } else {
    None
  };

  let outcome = RatingOutcome {
    prior_state: transition.prior_state,
    resulting_state: transition.resulting_state,
    lapsed,
    leech_action,
    next_delay_minutes: (transition.due - now).num_minutes().max(0),
  };
  #[cfg(feature = "profiling")]
  crate::profile_log!(
    crate::profiling::EventType::SrsCalculation {
      algorithm: settings.scheduler.as_str().to_string(),
      item_id: item.id.clone(),
      rating: rating.as_u8(),
    },
    prior = outcome.prior_state.as_str(),
    next = outcome.resulting_state.as_str(),
    lapsed = outcome.lapsed,
  );
  let log = ReviewLog::new(item.id.clone(), rating, now, duration_ms, outcome.resulting_state);

  tracing::debug!(
    "Rated {} {} under {}: {} -> {}",
    item.id,
    rating.as_str(),
    settings.scheduler.as_str(),
    outcome.prior_state.as_str(),
    outcome.resulting_state.as_str()
  );

  Ok(ProcessResult {
    item: updated,
    log,
    outcome,
  })
}

fn transition_sm2(
  item: &StudyItem,
  rating: Rating,
  settings: &EffectiveSettings,
  now: DateTime<Utc>,
) -> Transition {
  let engine = Sm2Engine::from_settings(settings);
  let current = item.srs.sm2().cloned().unwrap_or_else(|| engine.new_card(now));
  let next = engine.next(&current, rating, now);

  Transition {
    prior_state: current.state,
    resulting_state: next.state,
    lapses: next.lapses,
    due: next.due,
    schedule: Schedule::Sm2(next),
  }
}

fn transition_fsrs(
  item: &StudyItem,
  rating: Rating,
  settings: &EffectiveSettings,
  version: FsrsVersion,
  now: DateTime<Utc>,
) -> Result<Transition> {
  let engine = FsrsEngine::from_settings(settings, version)?;
  let current = match item.srs.fsrs(version) {
    Some(sub) => sub.clone(),
    None => item
      .srs
      .sm2()
      .filter(|_| settings.fsrs.seed_from_sm2)
      .and_then(|sm2| engine.seed_from_sm2(sm2))
      .unwrap_or_else(|| engine.new_card(now)),
  };
  let next = engine.next(&current, rating, now)?;

  Ok(Transition {
    prior_state: current.state,
    resulting_state: next.state,
    lapses: next.lapses,
    due: next.due,
    schedule: match version {
      FsrsVersion::V4_5 => Schedule::Fsrs(next),
      FsrsVersion::V6 => Schedule::Fsrs6(next),
    },
  })
}

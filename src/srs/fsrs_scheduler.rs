use chrono::{DateTime, Utc};
use fsrs::{MemoryState, NextStates, FSRS};

use super::sm2::{add_days, add_minutes};
use crate::config;
use crate::domain::{FsrsSubState, FsrsVersion, ItemState, Rating, Sm2SubState};
use crate::error::{Result, SchedulerError};
use crate::settings::{step_minutes, EffectiveSettings, FsrsParameters};

/// FSRS scheduling: learning steps for short-term memory, the FSRS memory model
/// for everything after graduation.
///
/// The memory state (stability, difficulty) is updated on every rating, including
/// ratings taken during learning steps. Only the choice of the next due date
/// differs between the step phase and the review phase.
pub struct FsrsEngine {
  model: FSRS,
  version: FsrsVersion,
  decay: f32,
  desired_retention: f32,
  maximum_interval: f64,
  learning_steps: Vec<i64>,
  relearning_steps: Vec<i64>,
}

impl FsrsEngine {
  pub fn from_settings(settings: &EffectiveSettings, version: FsrsVersion) -> Result<Self> {
    let weights = model_weights(&settings.fsrs, version);
    let model = match FSRS::new(Some(weights.as_slice())) {
      Ok(model) => model,
      Err(e) => {
        tracing::warn!("FSRS rejected configured weights ({:?}), using defaults", e);
        FSRS::new(Some(&fsrs::DEFAULT_PARAMETERS[..])).map_err(fsrs_error)?
      }
    };

    let decay = match version {
      FsrsVersion::V4_5 => config::FSRS45_DECAY,
      FsrsVersion::V6 => weights.get(20).copied().unwrap_or(fsrs::FSRS6_DEFAULT_DECAY),
    };

    Ok(Self {
      model,
      version,
      decay,
      desired_retention: settings.fsrs.requested_retention as f32,
      maximum_interval: f64::from(settings.fsrs.maximum_interval.max(1)),
      learning_steps: settings.learning_steps_minutes(),
      relearning_steps: settings.relearning_steps_minutes(),
    })
  }

  pub fn version(&self) -> FsrsVersion {
    self.version
  }

  pub fn new_card(&self, now: DateTime<Utc>) -> FsrsSubState {
    FsrsSubState::new_card(now)
  }

  pub fn next(
    &self,
    current: &FsrsSubState,
    rating: Rating,
    now: DateTime<Utc>,
  ) -> Result<FsrsSubState> {
    if rating == Rating::Manual {
      return Err(SchedulerError::InvalidRating(rating.as_u8()));
    }

    let elapsed_days = current
      .last_review
      .map_or(0.0, |last| ((now - last).num_seconds() as f64 / 86_400.0).max(0.0));

    let states = self
      .model
      .next_states(
        memory_state(current),
        self.desired_retention,
        elapsed_days.floor() as u32,
      )
      .map_err(fsrs_error)?;

    let chosen = match rating {
      Rating::Again => &states.again,
      Rating::Hard => &states.hard,
      Rating::Good => &states.good,
      Rating::Easy | Rating::Manual => &states.easy,
    };

    let mut next = FsrsSubState {
      stability: f64::from(chosen.memory.stability),
      difficulty: f64::from(chosen.memory.difficulty),
      elapsed_days,
      reps: current.reps + 1,
      last_review: Some(now),
      ..current.clone()
    };

    match current.state {
      ItemState::Review => self.review(&mut next, current, rating, &states, now),
      ItemState::New | ItemState::Learning | ItemState::Relearning => {
        self.learning(&mut next, current, rating, &states, now)
      }
    }

    tracing::debug!(
      "fsrs {} {} -> {} (stability {:.2}, difficulty {:.2}, {:.2}d)",
      rating.as_str(),
      current.state.as_str(),
      next.state.as_str(),
      next.stability,
      next.difficulty,
      next.scheduled_days
    );
    Ok(next)
  }

  fn learning(
    &self,
    next: &mut FsrsSubState,
    current: &FsrsSubState,
    rating: Rating,
    states: &NextStates,
    now: DateTime<Utc>,
  ) {
    let pre_review = match current.state {
      ItemState::New => ItemState::Learning,
      other => other,
    };
    let steps = match pre_review {
      ItemState::Relearning => &self.relearning_steps,
      _ => &self.learning_steps,
    };

    let step = match rating {
      Rating::Again | Rating::Manual => 0,
      Rating::Hard => current.learning_step.unwrap_or(0),
      Rating::Good => {
        let step = current.learning_step.map_or(0, |s| s + 1);
        if step as usize >= steps.len() {
          self.graduate(next, rating, states, now);
          return;
        }
        step
      }
      Rating::Easy => {
        self.graduate(next, rating, states, now);
        return;
      }
    };

    let minutes = step_minutes(steps, step as usize);
    next.state = pre_review;
    next.learning_step = Some(step);
    next.scheduled_days = minutes as f64 / config::MINUTES_PER_DAY as f64;
    next.due = add_minutes(now, minutes);
  }

  fn graduate(
    &self,
    next: &mut FsrsSubState,
    rating: Rating,
    states: &NextStates,
    now: DateTime<Utc>,
  ) {
    let good = self.interval_days(states.good.interval);
    let interval = match rating {
      Rating::Easy => self
        .interval_days(states.easy.interval)
        .max(good + 1.0)
        .min(self.maximum_interval),
      _ => good,
    };

    next.state = ItemState::Review;
    next.learning_step = None;
    next.scheduled_days = interval;
    next.due = add_days(now, interval);
  }

  fn review(
    &self,
    next: &mut FsrsSubState,
    current: &FsrsSubState,
    rating: Rating,
    states: &NextStates,
    now: DateTime<Utc>,
  ) {
    if !rating.is_correct() {
      let minutes = step_minutes(&self.relearning_steps, 0);
      next.state = ItemState::Relearning;
      next.lapses = current.lapses + 1;
      next.learning_step = Some(0);
      next.scheduled_days = minutes as f64 / config::MINUTES_PER_DAY as f64;
      next.due = add_minutes(now, minutes);
      return;
    }

    // Keep hard <= good < easy
    let hard = self.interval_days(states.hard.interval);
    let good = self.interval_days(states.good.interval);
    let easy = self.interval_days(states.easy.interval);
    let hard = hard.min(good);
    let good = good.max(hard + 1.0).min(self.maximum_interval);
    let easy = easy.max(good + 1.0).min(self.maximum_interval);

    let interval = match rating {
      Rating::Hard => hard,
      Rating::Easy => easy,
      _ => good,
    };

    // A successful recall never weakens memory
    next.stability = next.stability.max(current.stability);
    next.state = ItemState::Review;
    next.learning_step = None;
    next.scheduled_days = interval;
    next.due = add_days(now, interval);
  }

  /// Whole days in [1, maximum_interval]
  fn interval_days(&self, raw: f32) -> f64 {
    let days = f64::from(raw);
    if !days.is_finite() {
      return 1.0;
    }
    days.round().clamp(1.0, self.maximum_interval)
  }

  /// Probability of recall at `now`; None for items without a memory state
  pub fn retrievability(&self, sub: &FsrsSubState, now: DateTime<Utc>) -> Option<f64> {
    let memory = memory_state(sub)?;
    let last = sub.last_review?;
    let days = ((now - last).num_seconds() as f32 / 86_400.0).max(0.0);
    Some(f64::from(fsrs::current_retrievability(memory, days, self.decay)))
  }

  /// Estimate an FSRS review state from SM-2 history.
  ///
  /// Only graduated SM-2 cards carry enough information; everything else starts fresh.
  pub fn seed_from_sm2(&self, sm2: &Sm2SubState) -> Option<FsrsSubState> {
    if sm2.state != ItemState::Review || sm2.interval <= 0.0 || sm2.easiness_factor <= 0.0 {
      return None;
    }

    let (lo, hi) = config::RETENTION_RANGE;
    let retention = f64::from(self.desired_retention).clamp(lo, hi) as f32;
    let memory = self
      .model
      .memory_state_from_sm2(sm2.easiness_factor as f32, sm2.interval as f32, retention)
      .ok()?;

    Some(FsrsSubState {
      state: ItemState::Review,
      due: sm2.due,
      stability: f64::from(memory.stability),
      difficulty: f64::from(memory.difficulty),
      elapsed_days: 0.0,
      scheduled_days: sm2.interval,
      reps: sm2.repetitions,
      lapses: sm2.lapses,
      last_review: Some(add_days(sm2.due, -sm2.interval)),
      learning_step: None,
    })
  }
}

/// Compute the next FSRS state for one rating.
pub fn calculate_fsrs(
  current: &FsrsSubState,
  rating: Rating,
  settings: &EffectiveSettings,
  version: FsrsVersion,
  now: DateTime<Utc>,
) -> Result<FsrsSubState> {
  FsrsEngine::from_settings(settings, version)?.next(current, rating, now)
}

fn memory_state(sub: &FsrsSubState) -> Option<MemoryState> {
  let valid = sub.state != ItemState::New
    && sub.stability.is_finite()
    && sub.stability > 0.0
    && (1.0..=10.0).contains(&sub.difficulty);
  valid.then(|| MemoryState {
    stability: sub.stability as f32,
    difficulty: sub.difficulty as f32,
  })
}

/// Configured weights if they fit the version, otherwise the version defaults
fn model_weights(params: &FsrsParameters, version: FsrsVersion) -> Vec<f32> {
  let expected = version.weight_count();
  if params.weights.len() == expected && params.weights.iter().all(|w| w.is_finite()) {
    return params.weights.clone();
  }
  if !params.weights.is_empty() {
    tracing::warn!(
      "expected {} FSRS weights, got {}; using defaults",
      expected,
      params.weights.len()
    );
  }

  match version {
    FsrsVersion::V4_5 => config::FSRS45_DEFAULT_WEIGHTS.to_vec(),
    FsrsVersion::V6 => fsrs::DEFAULT_PARAMETERS.to_vec(),
  }
}

fn fsrs_error<E: std::fmt::Debug>(e: E) -> SchedulerError {
  SchedulerError::Fsrs(format!("{:?}", e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
  }

  fn engine(version: FsrsVersion) -> FsrsEngine {
    FsrsEngine::from_settings(&EffectiveSettings::default(), version).unwrap()
  }

  fn review_card(stability: f64, days_since_review: i64) -> FsrsSubState {
    FsrsSubState {
      state: ItemState::Review,
      due: now(),
      stability,
      difficulty: 5.0,
      elapsed_days: 0.0,
      scheduled_days: stability.round(),
      reps: 5,
      lapses: 0,
      last_review: Some(now() - Duration::days(days_since_review)),
      learning_step: None,
    }
  }

  #[test]
  fn test_new_card_good_enters_learning_step_zero() {
    let engine = engine(FsrsVersion::V6);
    let result = engine.next(&engine.new_card(now()), Rating::Good, now()).unwrap();

    assert_eq!(result.state, ItemState::Learning);
    assert_eq!(result.learning_step, Some(0));
    assert_eq!(result.due, now() + Duration::minutes(1));
    assert_eq!(result.reps, 1);
    assert_eq!(result.last_review, Some(now()));
    assert!(result.stability > 0.0);
    assert!((1.0..=10.0).contains(&result.difficulty));
  }

  #[test]
  fn test_learning_steps_then_graduation() {
    let engine = engine(FsrsVersion::V6);
    let step0 = engine.next(&engine.new_card(now()), Rating::Good, now()).unwrap();
    let step1 = engine.next(&step0, Rating::Good, now()).unwrap();
    assert_eq!(step1.learning_step, Some(1));
    assert_eq!(step1.due, now() + Duration::minutes(10));

    let graduated = engine.next(&step1, Rating::Good, now()).unwrap();
    assert_eq!(graduated.state, ItemState::Review);
    assert_eq!(graduated.learning_step, None);
    assert!(graduated.scheduled_days >= 1.0);
    assert_eq!(graduated.due, add_days(now(), graduated.scheduled_days));
    assert_eq!(graduated.reps, 3);
  }

  #[test]
  fn test_easy_graduates_past_good() {
    let mut settings = EffectiveSettings::default();
    settings.learning_steps = String::new();
    let engine = FsrsEngine::from_settings(&settings, FsrsVersion::V6).unwrap();
    let card = engine.new_card(now());

    let good = engine.next(&card, Rating::Good, now()).unwrap();
    let easy = engine.next(&card, Rating::Easy, now()).unwrap();
    assert_eq!(good.state, ItemState::Review);
    assert_eq!(easy.state, ItemState::Review);
    assert!(easy.scheduled_days >= good.scheduled_days + 1.0);
  }

  #[test]
  fn test_again_in_learning_restarts_steps() {
    let engine = engine(FsrsVersion::V6);
    let step0 = engine.next(&engine.new_card(now()), Rating::Good, now()).unwrap();
    let step1 = engine.next(&step0, Rating::Good, now()).unwrap();
    let again = engine.next(&step1, Rating::Again, now()).unwrap();

    assert_eq!(again.state, ItemState::Learning);
    assert_eq!(again.learning_step, Some(0));
    assert_eq!(again.due, now() + Duration::minutes(1));
    assert_eq!(again.lapses, 0);
  }

  #[test]
  fn test_review_again_relearns() {
    for version in [FsrsVersion::V4_5, FsrsVersion::V6] {
      let engine = engine(version);
      let card = review_card(12.0, 12);
      let result = engine.next(&card, Rating::Again, now()).unwrap();

      assert_eq!(result.state, ItemState::Relearning);
      assert_eq!(result.lapses, 1);
      assert_eq!(result.learning_step, Some(0));
      assert_eq!(result.due, now() + Duration::minutes(10));
      assert!((result.elapsed_days - 12.0).abs() < 1e-9);
    }
  }

  #[test]
  fn test_relearning_good_returns_to_review() {
    let engine = engine(FsrsVersion::V6);
    let lapsed = engine.next(&review_card(12.0, 12), Rating::Again, now()).unwrap();
    let back = engine.next(&lapsed, Rating::Good, now() + Duration::minutes(10)).unwrap();
    assert_eq!(back.state, ItemState::Review);
    assert_eq!(back.lapses, 1);
  }

  #[test]
  fn test_successful_review_never_lowers_stability() {
    for version in [FsrsVersion::V4_5, FsrsVersion::V6] {
      let engine = engine(version);
      for days in [0, 1, 5, 30, 200] {
        for stability in [0.5, 3.0, 25.0, 180.0] {
          let card = review_card(stability, days);
          for rating in [Rating::Hard, Rating::Good, Rating::Easy] {
            let result = engine.next(&card, rating, now()).unwrap();
            assert_eq!(result.state, ItemState::Review);
            assert!(
              result.stability >= card.stability,
              "{:?} {:?} after {} days: {} < {}",
              version,
              rating,
              days,
              result.stability,
              card.stability
            );
          }
        }
      }
    }
  }

  #[test]
  fn test_review_intervals_are_ordered() {
    let engine = engine(FsrsVersion::V6);
    let card = review_card(10.0, 10);
    let hard = engine.next(&card, Rating::Hard, now()).unwrap().scheduled_days;
    let good = engine.next(&card, Rating::Good, now()).unwrap().scheduled_days;
    let easy = engine.next(&card, Rating::Easy, now()).unwrap().scheduled_days;

    assert!(hard >= 1.0);
    assert!(hard <= good);
    assert!(good < easy);
  }

  #[test]
  fn test_maximum_interval_caps_review() {
    let mut settings = EffectiveSettings::default();
    settings.fsrs.maximum_interval = 5;
    let engine = FsrsEngine::from_settings(&settings, FsrsVersion::V6).unwrap();

    let result = engine.next(&review_card(300.0, 300), Rating::Easy, now()).unwrap();
    assert!(result.scheduled_days <= 5.0);
    assert!(result.due <= now() + Duration::days(5));
  }

  #[test]
  fn test_wrong_weight_count_falls_back_to_defaults() {
    let mut settings = EffectiveSettings::default();
    settings.fsrs.weights = vec![1.0, 2.0, 3.0];
    let engine = FsrsEngine::from_settings(&settings, FsrsVersion::V6).unwrap();
    let result = engine.next(&engine.new_card(now()), Rating::Good, now());
    assert!(result.is_ok());
  }

  #[test]
  fn test_model_weights_selection() {
    let mut params = FsrsParameters::default();
    assert_eq!(model_weights(&params, FsrsVersion::V4_5).len(), 17);
    assert_eq!(model_weights(&params, FsrsVersion::V6).len(), 21);

    params.weights = config::FSRS45_DEFAULT_WEIGHTS.to_vec();
    assert_eq!(model_weights(&params, FsrsVersion::V4_5), params.weights);
    assert_eq!(model_weights(&params, FsrsVersion::V6).len(), 21);
  }

  #[test]
  fn test_manual_rating_is_rejected() {
    let engine = engine(FsrsVersion::V6);
    let err = engine.next(&engine.new_card(now()), Rating::Manual, now()).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidRating(0)));
  }

  #[test]
  fn test_retrievability_decreases_over_time() {
    let engine = engine(FsrsVersion::V6);
    assert!(engine.retrievability(&engine.new_card(now()), now()).is_none());

    let card = review_card(10.0, 0);
    let fresh = engine.retrievability(&card, now()).unwrap();
    let later = engine.retrievability(&card, now() + Duration::days(10)).unwrap();
    let much_later = engine.retrievability(&card, now() + Duration::days(100)).unwrap();

    assert!((fresh - 1.0).abs() < 1e-6);
    assert!(later < fresh);
    assert!(much_later < later);
    assert!(much_later > 0.0);
  }

  #[test]
  fn test_seed_from_sm2() {
    let engine = engine(FsrsVersion::V6);
    let sm2 = Sm2SubState {
      state: ItemState::Review,
      due: now(),
      repetitions: 4,
      lapses: 1,
      easiness_factor: 2.5,
      interval: 10.0,
      learning_step: None,
    };

    let seeded = engine.seed_from_sm2(&sm2).unwrap();
    assert_eq!(seeded.state, ItemState::Review);
    assert!(seeded.stability > 0.0);
    assert!(seeded.difficulty > 0.0);
    assert_eq!(seeded.lapses, 1);
    assert_eq!(seeded.last_review, Some(now() - Duration::days(10)));

    let learning = Sm2SubState {
      state: ItemState::Learning,
      ..sm2
    };
    assert!(engine.seed_from_sm2(&learning).is_none());
  }
}

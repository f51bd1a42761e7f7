use chrono::{DateTime, Duration, Utc};

use crate::domain::{ItemState, Rating, Sm2SubState};
use crate::settings::{step_minutes, EffectiveSettings, Sm2Parameters};

/// SM-2 quality for a rating: Manual=0, Again=1, Hard=3, Good=4, Easy=5
pub fn quality(rating: Rating) -> u8 {
  match rating {
    Rating::Manual => 0,
    Rating::Again => 1,
    Rating::Hard => 3,
    Rating::Good => 4,
    Rating::Easy => 5,
  }
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
pub fn ease_delta(quality: u8) -> f64 {
  let q = f64::from(quality.min(5));
  0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02)
}

/// `now` shifted by `days`, saturating at the ends of the representable range
pub(crate) fn add_days(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
  add_seconds(now, (days * 86_400.0).round() as i64)
}

pub(crate) fn add_minutes(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
  add_seconds(now, minutes.saturating_mul(60))
}

fn add_seconds(now: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
  Duration::try_seconds(seconds)
    .and_then(|delta| now.checked_add_signed(delta))
    .unwrap_or_else(|| {
      tracing::warn!("due date out of range ({} s from {}), saturating", seconds, now);
      if seconds < 0 {
        DateTime::<Utc>::MIN_UTC
      } else {
        DateTime::<Utc>::MAX_UTC
      }
    })
}

/// SM-2 scheduler with Anki-style learning and relearning steps.
///
/// New, Learning and Relearning cards walk a list of minute steps; Review
/// cards grow their interval by the easiness factor.
pub struct Sm2Engine<'a> {
  params: &'a Sm2Parameters,
  learning_steps: Vec<i64>,
  relearning_steps: Vec<i64>,
}

impl<'a> Sm2Engine<'a> {
  pub fn from_settings(settings: &'a EffectiveSettings) -> Self {
    Self {
      params: &settings.sm2,
      learning_steps: settings.learning_steps_minutes(),
      relearning_steps: settings.relearning_steps_minutes(),
    }
  }

  /// Fresh sub-state for an item SM-2 has never scheduled
  pub fn new_card(&self, now: DateTime<Utc>) -> Sm2SubState {
    Sm2SubState::new_card(self.params.starting_ease, now)
  }

  pub fn next(&self, current: &Sm2SubState, rating: Rating, now: DateTime<Utc>) -> Sm2SubState {
    let next = match current.state {
      ItemState::Review => self.review(current, rating, now),
      ItemState::New | ItemState::Learning | ItemState::Relearning => {
        self.learning(current, rating, now)
      }
    };

    tracing::debug!(
      "sm2 {} {} -> {} (interval {:.2}d, ef {:.2})",
      rating.as_str(),
      current.state.as_str(),
      next.state.as_str(),
      next.interval,
      next.easiness_factor
    );
    next
  }

  fn active_steps(&self, state: ItemState) -> &[i64] {
    match state {
      ItemState::Relearning => &self.relearning_steps,
      _ => &self.learning_steps,
    }
  }

  /// Step-based scheduling for cards that have not (re)graduated yet
  fn learning(&self, current: &Sm2SubState, rating: Rating, now: DateTime<Utc>) -> Sm2SubState {
    let pre_review = match current.state {
      ItemState::New => ItemState::Learning,
      other => other,
    };

    match rating {
      Rating::Manual | Rating::Again => Sm2SubState {
        state: ItemState::Relearning,
        due: add_minutes(now, step_minutes(&self.relearning_steps, 0)),
        learning_step: Some(0),
        ..current.clone()
      },
      Rating::Hard => {
        let step = current.learning_step.unwrap_or(0);
        let steps = self.active_steps(pre_review);
        Sm2SubState {
          state: pre_review,
          due: add_minutes(now, step_minutes(steps, step as usize)),
          learning_step: Some(step),
          ..current.clone()
        }
      }
      Rating::Good => {
        let step = current.learning_step.map_or(0, |s| s + 1);
        let steps = self.active_steps(pre_review);
        if step as usize >= steps.len() {
          return self.graduate(current, rating, now);
        }
        Sm2SubState {
          state: pre_review,
          due: add_minutes(now, steps[step as usize]),
          learning_step: Some(step),
          ..current.clone()
        }
      }
      Rating::Easy => self.graduate(current, rating, now),
    }
  }

  /// Move a learning card into Review
  fn graduate(&self, current: &Sm2SubState, rating: Rating, now: DateTime<Utc>) -> Sm2SubState {
    let interval = if current.repetitions == 0 {
      // First graduation
      match rating {
        Rating::Easy => self.params.easy_interval,
        _ => self.params.graduating_interval,
      }
    } else {
      // Relearning card: back to the interval it kept at the lapse
      let kept = current.interval.max(self.params.minimum_interval);
      match rating {
        Rating::Easy => kept * self.params.easy_bonus,
        _ => kept,
      }
    };
    let interval = self.clamp_interval(interval);

    Sm2SubState {
      state: ItemState::Review,
      due: add_days(now, interval),
      repetitions: current.repetitions + 1,
      lapses: current.lapses,
      easiness_factor: current.easiness_factor,
      interval,
      learning_step: None,
    }
  }

  fn review(&self, current: &Sm2SubState, rating: Rating, now: DateTime<Utc>) -> Sm2SubState {
    let p = self.params;

    match rating {
      Rating::Manual | Rating::Again => {
        // Lapse
        let interval = self.clamp_interval(current.interval * p.lapse_interval_multiplier);
        Sm2SubState {
          state: ItemState::Relearning,
          due: add_minutes(now, step_minutes(&self.relearning_steps, 0)),
          repetitions: current.repetitions,
          lapses: current.lapses + 1,
          easiness_factor: (current.easiness_factor - p.lapse_ease_penalty).max(p.minimum_ease),
          interval,
          learning_step: Some(0),
        }
      }
      Rating::Hard | Rating::Good | Rating::Easy => {
        let ef = current.easiness_factor;
        let base = match rating {
          Rating::Hard => current.interval * p.hard_interval_multiplier,
          Rating::Easy => current.interval * ef * p.easy_bonus,
          _ => current.interval * ef,
        };
        let interval = self.clamp_interval(base * p.interval_modifier);

        Sm2SubState {
          state: ItemState::Review,
          due: add_days(now, interval),
          repetitions: current.repetitions + 1,
          lapses: current.lapses,
          easiness_factor: (ef + ease_delta(quality(rating))).max(p.minimum_ease),
          interval,
          learning_step: None,
        }
      }
    }
  }

  fn clamp_interval(&self, days: f64) -> f64 {
    let p = self.params;
    days.max(p.minimum_interval).min(p.maximum_interval)
  }
}

/// Compute the next SM-2 state for one rating.
pub fn calculate_sm2(
  current: &Sm2SubState,
  rating: Rating,
  settings: &EffectiveSettings,
  now: DateTime<Utc>,
) -> Sm2SubState {
  Sm2Engine::from_settings(settings).next(current, rating, now)
}

//! Fixture builders for scheduling tests.
//!
//! Each builder returns a `StudyItem` already in a given state so tests can
//! start from the middle of an item's history instead of replaying ratings.

use chrono::{DateTime, Duration, Utc};

use crate::config::{DEFAULT_STARTING_EASE, MINUTES_PER_DAY};
use crate::domain::{FsrsSubState, ItemContent, ItemState, Schedule, Sm2SubState, StudyItem};

fn item(id: &str, note: Option<&str>) -> StudyItem {
    let item = StudyItem::new(
        id,
        ItemContent::Basic {
            front: format!("front of {}", id),
            back: format!("back of {}", id),
        },
    );
    match note {
        Some(note) => item.with_note(note),
        None => item,
    }
}

/// Item no scheduler has touched yet
pub fn new_item(id: &str, note: Option<&str>, order: u64) -> StudyItem {
    item(id, note).with_new_card_order(order)
}

pub fn suspended(mut item: StudyItem) -> StudyItem {
    item.srs.is_suspended = true;
    item
}

/// Graduated SM-2 item with the given interval, due at `due`
pub fn sm2_review_item(
    id: &str,
    note: Option<&str>,
    due: DateTime<Utc>,
    interval: f64,
) -> StudyItem {
    let mut item = item(id, note);
    item.srs.schedule = Schedule::Sm2(Sm2SubState {
        state: ItemState::Review,
        due,
        repetitions: 3,
        lapses: 0,
        easiness_factor: DEFAULT_STARTING_EASE,
        interval,
        learning_step: None,
    });
    item
}

/// SM-2 item waiting out learning or relearning step `step`
pub fn sm2_learning_item(
    id: &str,
    note: Option<&str>,
    state: ItemState,
    step: u32,
    due: DateTime<Utc>,
) -> StudyItem {
    let mut item = item(id, note);
    let relearning = state == ItemState::Relearning;
    item.srs.schedule = Schedule::Sm2(Sm2SubState {
        state,
        due,
        repetitions: if relearning { 3 } else { 0 },
        lapses: if relearning { 1 } else { 0 },
        easiness_factor: DEFAULT_STARTING_EASE,
        interval: if relearning { 1.0 } else { 0.0 },
        learning_step: Some(step),
    });
    item
}

fn fsrs_review_sub(due: DateTime<Utc>, stability: f64) -> FsrsSubState {
    let scheduled_days = stability.round().max(1.0);
    FsrsSubState {
        state: ItemState::Review,
        due,
        stability,
        difficulty: 5.0,
        elapsed_days: scheduled_days,
        scheduled_days,
        reps: 4,
        lapses: 0,
        last_review: Some(due - Duration::days(scheduled_days as i64)),
        learning_step: None,
    }
}

/// FSRS-6 review item last reviewed one interval before `due`
pub fn fsrs_review_item(
    id: &str,
    note: Option<&str>,
    due: DateTime<Utc>,
    stability: f64,
) -> StudyItem {
    let mut item = item(id, note);
    item.srs.schedule = Schedule::Fsrs6(fsrs_review_sub(due, stability));
    item
}

/// Same as [`fsrs_review_item`] under FSRS-4.5
pub fn fsrs45_review_item(
    id: &str,
    note: Option<&str>,
    due: DateTime<Utc>,
    stability: f64,
) -> StudyItem {
    let mut item = item(id, note);
    item.srs.schedule = Schedule::Fsrs(fsrs_review_sub(due, stability));
    item
}

/// FSRS-6 learning item whose current step lasts `step_minutes`
pub fn fsrs_learning_item(
    id: &str,
    note: Option<&str>,
    due: DateTime<Utc>,
    step_minutes: i64,
) -> StudyItem {
    let mut item = item(id, note);
    item.srs.schedule = Schedule::Fsrs6(FsrsSubState {
        state: ItemState::Learning,
        due,
        stability: 1.0,
        difficulty: 5.0,
        elapsed_days: 0.0,
        scheduled_days: step_minutes as f64 / MINUTES_PER_DAY as f64,
        reps: 1,
        lapses: 0,
        last_review: Some(due - Duration::minutes(step_minutes)),
        learning_step: Some(0),
    });
    item
}

use super::processor::RatingOutcome;
use crate::config::MINUTES_PER_DAY;
use crate::domain::{ItemId, ItemState, StudyItem};
use crate::settings::EffectiveSettings;

/// Whether rating `item` should hide its siblings for the rest of the session.
pub fn should_bury(
  item: &StudyItem,
  outcome: &RatingOutcome,
  settings: &EffectiveSettings,
) -> bool {
  if item.note_id.is_none() {
    return false;
  }

  match outcome.prior_state {
    ItemState::New => settings.bury_new_siblings,
    ItemState::Review => settings.bury_review_siblings,
    ItemState::Learning | ItemState::Relearning => {
      settings.bury_interday_learning_siblings && outcome.next_delay_minutes >= MINUTES_PER_DAY
    }
  }
}

/// Ids of every other item generated from the same note
pub fn siblings_to_bury<'a, I>(item: &StudyItem, items: I) -> Vec<ItemId>
where
  I: IntoIterator<Item = &'a StudyItem>,
{
  items
    .into_iter()
    .filter(|other| other.is_sibling_of(item))
    .map(|other| other.id.clone())
    .collect()
}

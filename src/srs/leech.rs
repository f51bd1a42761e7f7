use crate::domain::{StudyItem, LEECH_TAG};
use crate::settings::{LeechAction, LeechPolicy};

/// Apply the leech policy after a lapse. Returns the action taken, if any.
///
/// `lapses` is the cumulative lapse count after the rating. A threshold of 0
/// disables detection. Both actions are idempotent.
pub fn apply_leech_policy(
  item: &mut StudyItem,
  lapses: u32,
  policy: &LeechPolicy,
) -> Option<LeechAction> {
  if policy.threshold == 0 || lapses < policy.threshold {
    return None;
  }

  match policy.action {
    LeechAction::Tag => {
      item.tags.insert(LEECH_TAG.to_string());
    }
    LeechAction::Suspend => {
      item.srs.is_suspended = true;
    }
  }

  tracing::info!(
    "Item {} is a leech after {} lapses ({:?})",
    item.id,
    lapses,
    policy.action
  );

  #[cfg(feature = "profiling")]
  crate::profile_log!(crate::profiling::EventType::LeechDetected {
    item_id: item.id.clone(),
    lapses,
    action: format!("{:?}", policy.action).to_lowercase(),
  });

  Some(policy.action)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ItemContent;

  fn item() -> StudyItem {
    StudyItem::new(
      "leechy",
      ItemContent::Basic {
        front: "Capital of Australia".to_string(),
        back: "Canberra".to_string(),
      },
    )
  }

  fn policy(threshold: u32, action: LeechAction) -> LeechPolicy {
    LeechPolicy { threshold, action }
  }

  #[test]
  fn test_below_threshold_does_nothing() {
    let mut item = item();
    assert_eq!(apply_leech_policy(&mut item, 2, &policy(3, LeechAction::Tag)), None);
    assert!(!item.is_leech());
    assert!(!item.srs.is_suspended);
  }

  #[test]
  fn test_tag_at_threshold() {
    let mut item = item();
    let action = apply_leech_policy(&mut item, 3, &policy(3, LeechAction::Tag));
    assert_eq!(action, Some(LeechAction::Tag));
    assert!(item.is_leech());
    assert!(!item.srs.is_suspended);
  }

  #[test]
  fn test_tag_is_idempotent() {
    let mut item = item();
    apply_leech_policy(&mut item, 3, &policy(3, LeechAction::Tag));
    apply_leech_policy(&mut item, 4, &policy(3, LeechAction::Tag));
    assert_eq!(item.tags.iter().filter(|t| *t == LEECH_TAG).count(), 1);
    assert_eq!(item.tags.len(), 1);
  }

  #[test]
  fn test_suspend_at_threshold() {
    let mut item = item();
    let action = apply_leech_policy(&mut item, 5, &policy(3, LeechAction::Suspend));
    assert_eq!(action, Some(LeechAction::Suspend));
    assert!(item.srs.is_suspended);
    assert!(!item.is_leech());
  }

  #[test]
  fn test_zero_threshold_disables() {
    let mut item = item();
    assert_eq!(apply_leech_policy(&mut item, 100, &policy(0, LeechAction::Suspend)), None);
    assert!(!item.srs.is_suspended);
  }
}

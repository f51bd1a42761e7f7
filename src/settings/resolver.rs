//! Per-deck settings overrides.
//!
//! Decks and question banks form a tree. A node with custom settings applies
//! them to itself and every descendant that has none of its own; everything
//! else uses the global settings.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::EffectiveSettings;
use crate::domain::{DeckId, StudyItem};
#[cfg(feature = "profiling")]
use crate::profiling::EventType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckNode {
  pub id: DeckId,
  pub parent_id: Option<DeckId>,
  #[serde(default)]
  pub has_custom_settings: bool,
  #[serde(default)]
  pub settings: Option<EffectiveSettings>,
}

impl DeckNode {
  pub fn new(id: impl Into<DeckId>, parent_id: Option<&str>) -> Self {
    Self {
      id: id.into(),
      parent_id: parent_id.map(str::to_string),
      has_custom_settings: false,
      settings: None,
    }
  }

  pub fn with_settings(mut self, settings: EffectiveSettings) -> Self {
    self.has_custom_settings = true;
    self.settings = Some(settings.sanitized());
    self
  }

  fn custom_settings(&self) -> Option<&EffectiveSettings> {
    if !self.has_custom_settings {
      return None;
    }
    if self.settings.is_none() {
      tracing::warn!("Deck {} flagged as custom but has no settings", self.id);
    }
    self.settings.as_ref()
  }
}

/// Deck hierarchy indexed by id
#[derive(Debug, Clone, Default)]
pub struct DeckTree {
  nodes: HashMap<DeckId, DeckNode>,
}

impl DeckTree {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or replace a deck. Its custom settings are sanitized on the way in.
  pub fn insert(&mut self, mut node: DeckNode) {
    node.settings = node.settings.map(EffectiveSettings::sanitized);
    self.nodes.insert(node.id.clone(), node);
  }

  pub fn get(&self, id: &str) -> Option<&DeckNode> {
    self.nodes.get(id)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

impl FromIterator<DeckNode> for DeckTree {
  fn from_iter<I: IntoIterator<Item = DeckNode>>(iter: I) -> Self {
    let mut tree = Self::new();
    for node in iter {
      tree.insert(node);
    }
    tree
  }
}

/// Settings in force for `deck_id`: the nearest custom settings walking from the
/// deck up to the root, or `global` if there are none.
///
/// Unknown decks, dangling parents and cycles end the walk and fall back to `global`.
pub fn resolve<'a>(
  tree: &'a DeckTree,
  deck_id: &str,
  global: &'a EffectiveSettings,
) -> &'a EffectiveSettings {
  let mut visited: HashSet<&str> = HashSet::new();
  let mut current = tree.get(deck_id);

  while let Some(node) = current {
    if !visited.insert(node.id.as_str()) {
      tracing::warn!("Cycle in deck hierarchy at {}, using global settings", node.id);
      break;
    }

    if let Some(settings) = node.custom_settings() {
      #[cfg(feature = "profiling")]
      crate::profile_log!(EventType::SettingsResolved {
        deck_id: deck_id.to_string(),
        source: node.id.clone(),
      });
      return settings;
    }

    current = match node.parent_id.as_deref() {
      Some(parent) => {
        let next = tree.get(parent);
        if next.is_none() {
          tracing::debug!("Deck {} has unknown parent {}", node.id, parent);
        }
        next
      }
      None => None,
    };
  }

  global
}

/// Settings in force for an item's deck; items without a deck use `global`.
pub fn resolve_for_item<'a>(
  tree: &'a DeckTree,
  item: &StudyItem,
  global: &'a EffectiveSettings,
) -> &'a EffectiveSettings {
  match item.deck_id.as_deref() {
    Some(deck_id) => resolve(tree, deck_id, global),
    None => global,
  }
}

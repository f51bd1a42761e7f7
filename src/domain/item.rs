use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::srs_state::SrsState;
use super::{DeckId, ItemId, NoteId};

/// Tag applied to items flagged by the leech detector
pub const LEECH_TAG: &str = "leech";

/// Card content. The scheduler never inspects it; it only travels with the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemContent {
  Basic {
    front: String,
    back: String,
  },
  Cloze {
    text: String,
    /// Which cloze deletion of the note this card asks for (c1, c2, ...)
    ordinal: u32,
  },
  ImageOcclusion {
    image_ref: String,
    mask_id: String,
  },
  MultipleChoice {
    question: String,
    options: Vec<String>,
    correct_index: usize,
  },
}

/// A flashcard or multiple-choice question together with its scheduling metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyItem {
  pub id: ItemId,
  /// Siblings generated from the same note or occlusion group share this id
  pub note_id: Option<NoteId>,
  /// Deck or question bank the item belongs to
  pub deck_id: Option<DeckId>,
  #[serde(default)]
  pub tags: BTreeSet<String>,
  pub content: ItemContent,
  #[serde(default)]
  pub srs: SrsState,
}

impl StudyItem {
  pub fn new(id: impl Into<ItemId>, content: ItemContent) -> Self {
    Self {
      id: id.into(),
      note_id: None,
      deck_id: None,
      tags: BTreeSet::new(),
      content,
      srs: SrsState::default(),
    }
  }

  pub fn with_note(mut self, note_id: impl Into<NoteId>) -> Self {
    self.note_id = Some(note_id.into());
    self
  }

  pub fn with_deck(mut self, deck_id: impl Into<DeckId>) -> Self {
    self.deck_id = Some(deck_id.into());
    self
  }

  pub fn with_new_card_order(mut self, order: u64) -> Self {
    self.srs.new_card_order = order;
    self
  }

  pub fn has_tag(&self, tag: &str) -> bool {
    self.tags.contains(tag)
  }

  pub fn is_leech(&self) -> bool {
    self.has_tag(LEECH_TAG)
  }

  /// True if both items come from the same note. Items without a note have no siblings.
  pub fn is_sibling_of(&self, other: &StudyItem) -> bool {
    self.id != other.id
      && matches!((&self.note_id, &other.note_id), (Some(a), Some(b)) if a == b)
  }
}

pub mod item;
pub mod review;
pub mod srs_state;

pub use item::{ItemContent, StudyItem, LEECH_TAG};
pub use review::{failed_since, Rating, ReviewLog};
pub use srs_state::{
  FsrsSubState, FsrsVersion, ItemState, Maturity, Schedule, Scheduler, Sm2SubState, SrsState,
};

pub type ItemId = String;
pub type NoteId = String;
pub type DeckId = String;

//! aula-core - domain model and store abstraction for the aula platform
//!
//! This crate holds the persisted entities (lessons, transcript passages,
//! viewing progress, route assignments), the keyed store traits the rest of
//! the system talks to, and the transcript segmentation policy. The store is
//! an opaque interface: callers get/upsert/delete by natural key and delegate
//! similarity search to the store itself.

mod error;
mod model;
pub mod segment;
pub mod store;

pub use error::{Result, StoreError};
pub use model::{Lesson, Passage, PassageMatch, RouteAssignment, ViewingProgress};
pub use segment::{SegmentationPolicy, SentenceSplitter};
pub use store::memory::MemoryStore;
pub use store::{LessonStore, PassageStore, ProgressStore, RouteStore, Store};

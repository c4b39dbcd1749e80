//! Editing layer over `pb-core` documents: reversible commands, a bounded
//! undo/redo history, and debounced persistence of the edited document.

pub mod commands;
pub mod history;
pub mod persist;

pub use commands::{Command, Edit, Reversible};
pub use history::{
    CommandHistory, DEFAULT_STORAGE_KEY, HistoryAction, HistoryConfig, HistoryInfo, ListenerId,
};
pub use persist::{DebouncedSave, FileStore, MemoryStore, StateStore};

//! Persistence Adapters
//!
//! Key-value implementations of the persistence port plus the journal
//! repository layered on top of them. Values are JSON documents; keys are
//! namespaced strings (`users`, `trades_{user_id}`).

mod file;
mod journal;
mod memory;

pub use file::JsonFileStore;
pub use journal::KvJournalStore;
pub use memory::InMemoryKeyValueStore;

//! Frame sources for facemood (JSON-lines replay, in-memory) and the
//! producer thread that feeds the dispatcher.

pub mod jsonl;
pub mod memory;
pub mod producer;

pub use jsonl::JsonlSource;
pub use memory::MemorySource;
pub use producer::spawn_source_thread;

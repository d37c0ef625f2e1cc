//! In-Memory Storage Adapters
//!
//! Process-local implementations of the storage ports. They back the default
//! wiring and every test; a persistent backend only has to implement the same
//! traits.

mod names;
mod pairs;
mod store;

pub use names::MemoryNameRegistry;
pub use pairs::{MemoryPairRepository, MemoryTokenSource};
pub use store::{MemoryMarketStore, MemoryPriorityCache};

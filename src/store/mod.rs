pub mod document;
pub mod gateway;
pub mod memory;

pub use document::{BatchWrite, DocumentStore, Fields};
pub use gateway::{ChunkRef, DocumentGateway, RemoteSnapshot, StoredPhoto};
pub use memory::MemoryStore;

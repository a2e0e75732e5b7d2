pub mod api;

pub use api::{ApiMessage, ChatChunk, ChunkChoice, ChunkDelta, Delta};

//! Text-to-concept retrieval: chunking, aggregation, caching, pipeline.

pub mod aggregate;
pub mod cache;
pub mod chunker;
pub mod pipeline;

pub use cache::{CacheStats, ResultCache};
pub use pipeline::Retriever;

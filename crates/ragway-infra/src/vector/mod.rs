//! Vector similarity search backed by LanceDB.

pub mod index;
pub mod lance;

pub use index::LanceSimilarityIndex;
pub use lance::LanceVectorStore;

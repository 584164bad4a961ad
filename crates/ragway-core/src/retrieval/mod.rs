//! Retrieval-augmented prompt construction.
//!
//! Collaborator traits for embedding and similarity search, their type-erased
//! wrappers, and the [`RetrievalAugmenter`] that grounds a prompt in search
//! results.

pub mod augmenter;
pub mod box_embedder;
pub mod box_index;
pub mod embedder;
pub mod index;

pub use augmenter::{Augmentation, RetrievalAugmenter};

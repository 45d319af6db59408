//! Controlled-vocabulary taxonomy: loading and hierarchy traversal.
//!
//! The taxonomy is a JSON document published by the vocabulary maintainer
//! (IPTC Media Topics). Loading turns it into an in-memory id-to-concept
//! map; traversal expands a leaf concept into its full ancestor chain.

pub mod fetch;
pub mod hierarchy;
pub mod vocabulary;

pub use vocabulary::{TaxonomyDocument, Vocabulary};

//! Parser module for Behavior Lock
//!
//! This module contains:
//! - `document`: JSON contract documents (contracts, type declarations, config)
//! - `markdown`: Markdown notes carrying `behavior` listings
//!
//! The grammar-level front end for the contract language is external; this
//! crate consumes its structured output.

pub mod document;
pub mod markdown;

pub use document::{load_path, Document};
pub use markdown::extract_listings;

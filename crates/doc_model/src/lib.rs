//! Document Model - Core document tree structure and types
//!
//! This crate provides the document tree the notes editor operates on:
//! typed block and inline nodes, the JSON wire shape they are persisted in,
//! the flat position space used to address content, and the block identity
//! attributes (persistent id + creation time) that deep links point at.

mod node;
mod run;
mod node_id;
mod position;
mod selection;
mod tree;
mod error;
pub mod json;

pub use node::*;
pub use run::*;
pub use node_id::*;
pub use position::*;
pub use selection::*;
pub use tree::*;
pub use error::*;

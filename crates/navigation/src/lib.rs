//! Navigation - Deep links into the notebook hierarchy
//!
//! Hash fragments address a notebook, optionally narrowed to a section, a
//! page and a block. This crate parses and builds those fragments, expands
//! partial addresses through an async [`HierarchyLookup`], discards stale
//! resolutions via [`NavigationContext`], and drives the notebook → section
//! → page selection cascade from [`NavigationController`].

mod address;
mod controller;
mod error;
mod hash;
mod history;
mod initial;
mod lookup;
mod resolver;

pub use address::*;
pub use controller::*;
pub use error::*;
pub use hash::*;
pub use history::*;
pub use initial::*;
pub use lookup::*;
pub use resolver::*;

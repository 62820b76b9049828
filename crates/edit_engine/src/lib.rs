//! Edit Engine - Transactions, structural editing, search and placement
//!
//! This crate implements the editing side of the notes editor: commands that
//! produce transactions, the identity pass that keeps block ids unique, list
//! indent/outdent via the keymap, cross-block find, and placement of
//! AI-generated content. [`EditingEngine`] ties them together.

mod command;
mod executor;
mod error;
mod identity;
mod find;
mod list_commands;
mod keymap;
mod placement;
mod settings;

pub use command::*;
pub use executor::*;
pub use error::*;
pub use identity::*;
pub use find::*;
pub use list_commands::*;
pub use keymap::*;
pub use placement::*;
pub use settings::*;

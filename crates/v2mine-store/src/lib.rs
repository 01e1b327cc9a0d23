//! Persistence of the working-configuration list.
//!
//! The list is a UTF-8 text file with one share link per line, a trailing
//! newline when non-empty and no header. Saves go through a uniquely named
//! temporary file in the target directory that is fsynced and renamed over
//! the target, so readers (and concurrent runs) only ever observe a complete
//! old or a complete new list.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{render, ConfigStore};

//! Schema-aware JSON:API serde engine.
//!
//! The crate turns JSON:API documents into an in-memory representation (see [`model`]),
//! validates them against resource [`descriptor`]s while collecting every error on the way
//! ([`deserializer`]), renders them back into JSON ([`renderer`]) and offers incremental
//! [`builder`]s plus an [`entity`] layer mapping user structs to whole compound documents.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;

#[macro_use]
mod macros;

pub mod builder;
pub mod descriptor;
pub mod deserializer;
pub mod entity;
pub mod error;
pub mod model;
pub mod renderer;
pub mod utils;

use crate::error::JsonApiSerdeError;

pub type Result<T> = std::result::Result<T, JsonApiSerdeError>;

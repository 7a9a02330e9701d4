//! A provider-neutral protocol for completion models.
//!
//! The brainstorming pipeline talks to a language model through the types
//! in this crate only, so a real endpoint and a scripted test double can be
//! swapped without touching the session logic.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;

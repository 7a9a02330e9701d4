//! An out-of-the-box brainstorming studio: chat with a model about an app
//! idea, then turn the conversation into a user-flow diagram.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to drive the studio from your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod studio;

pub use studio::{Screen, Studio, StudioBuilder, StudioError};

/// Re-exports of [`ideaflow_core`] crate.
pub mod core {
    pub use ideaflow_core::*;
}

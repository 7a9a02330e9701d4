//! A lightweight actor runtime.
//!
//! An actor owns a piece of state and mutates it only from its message
//! handlers, one message at a time. Background tasks never touch the state
//! directly; they report back by sending messages.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::Message;

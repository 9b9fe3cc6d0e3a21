//! Transport implementations.
//!
//! The crate ships only the in-memory pair; a real serial port is an
//! external collaborator implemented against [`crate::transport::Transport`]
//! by the embedding application.

pub mod mock;

pub use mock::{LcuHandle, MockTransport, pair};

//! Herald Core
//!
//! Boundary types shared between the execution engine and host game servers:
//! the command-source abstraction, result-callback chaining, and the command
//! error taxonomy.

pub mod callback;
pub mod error;
pub mod source;

pub use callback::ResultCallback;
pub use error::CommandError;
pub use source::CommandSource;

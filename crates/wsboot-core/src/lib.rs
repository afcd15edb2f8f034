pub mod config;
pub mod content;
pub mod descriptor;
pub mod error;
pub mod guard;
pub mod io;
pub mod materialize;
pub mod paths;
pub mod snapshot;
pub mod structure;
pub mod tier;
pub mod upgrade;
pub mod validate;
pub mod workspace;

pub use error::{ErrorKind, Result, WorkspaceError};
pub use tier::Tier;

//! codeshift core - event log, run state, oracle boundary, and error taxonomy

pub mod error;
pub mod event;
pub mod log;
pub mod oracle;
pub mod state;
pub mod types;

pub use error::{Error, Result};
pub use event::*;
pub use log::Log;
pub use oracle::Oracle;
pub use state::*;
pub use types::*;

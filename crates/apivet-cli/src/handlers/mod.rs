//! Command handlers for CLI subcommands
//!
//! Each handler returns the process exit code on success. Errors are usage or
//! input problems that end the invocation.

mod config;
mod rules;
mod validate;

pub use config::handle_config;
pub use rules::handle_rules;
pub use validate::handle_validate;

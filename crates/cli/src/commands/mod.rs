//! Command handlers for the VCraft CLI.

pub mod ask;
pub mod init;
pub mod query;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use init::InitCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;

use serde::Serialize;
use vcraft_core::AppResult;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

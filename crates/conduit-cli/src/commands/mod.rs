//! Command implementations for conduit-cli

pub mod create;
pub mod inspect;
pub mod list;
pub mod map;
pub mod run;

pub use create::run_create;
pub use inspect::{run_contracts, run_logs, run_purge_logs};
pub use list::run_list;
pub use map::run_map;
pub use run::{run_synchronization, run_test};

use serde::Serialize;

use crate::error::Result;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Command dispatch: bridges CLI args -> session -> output formatting.

pub mod config_cmd;
pub mod snapshot;
pub mod tree;
pub mod util;
pub mod watch;

use emsmon_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Tree(args) => tree::handle(session, args, global).await,
        Command::Snapshot(args) => snapshot::handle(session, args, global).await,
        Command::Watch(args) => watch::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

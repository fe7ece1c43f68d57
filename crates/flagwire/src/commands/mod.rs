//! Command dispatch: bridges CLI args -> resolver calls -> output formatting.

pub mod config_cmd;
pub mod eval;
pub mod watch;

use flagwire_core::ResolverConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that talks to the evaluation service.
pub async fn dispatch(
    cmd: Command,
    config: ResolverConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Eval(args) => eval::handle(config, &args, global).await,
        Command::Watch(args) => watch::handle(config, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}

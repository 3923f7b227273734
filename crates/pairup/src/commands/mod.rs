//! Command dispatch: bridges CLI args -> client calls -> output formatting.

pub mod account;
pub mod chat;
pub mod identity;
pub mod report;

use pairup_core::PairupClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &PairupClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Register => account::register(client, global).await,
        Command::Me => account::me(client, global).await,
        Command::Profile(args) => account::profile(client, args, global).await,
        Command::Verify(args) => account::verify(client, args, global).await,
        Command::Report(args) => report::report(client, args, global).await,
        Command::Karma => report::karma(client, global).await,
        Command::Complete => report::complete(client, global).await,
        Command::Chat(args) => chat::handle(client, args, global).await,
        // Identity and Completions are handled before dispatch
        Command::Identity(_) | Command::Completions(_) => unreachable!(),
    }
}

//! Command handlers. Each returns the text to print.

pub mod admin;
pub mod pipeline;

use crate::cli::Command;
use crate::state::AppState;

/// Run `command` against `state`.
pub async fn execute(state: &mut AppState, command: Command, json: bool) -> anyhow::Result<String> {
    match command {
        Command::Run => pipeline::run(state, json).await,
        Command::Discover => pipeline::discover(state, json).await,
        Command::Outreach => pipeline::outreach(state, json).await,
        Command::Export { format } => admin::export(state, format.map(Into::into), json).await,
        Command::Status => admin::status(state, json).await,
        Command::Week { week } => admin::week(state, week).await,
        Command::Resume => admin::resume(state).await,
        Command::Approval { state: toggle } => admin::approval(state, toggle.is_on()).await,
    }
}

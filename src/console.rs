//! Line commands and rendering for the console driver.
//!
//! The console stands in for both the identity provider (sign-in/sign-out)
//! and the browser location bar (open). Parsing and rendering are pure so
//! they can be tested without stdin.

use crate::auth::Identity;
use crate::controller::ViewUpdate;
use crate::navigation::RouteSelection;
use crate::sync::SyncStatus;

pub const HELP: &str = "\
commands:
  sign-in <user_id> <session_id> [first_name]
  sign-out
  open <path>
  status
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    SignIn(Identity),
    SignOut,
    Open(String),
    Status,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown command `{0}`; try `help`")]
    Unknown(String),
}

/// Parse one input line.
///
/// # Errors
///
/// Returns a [`CommandError`] for blank lines, wrong arity, or unknown verbs.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(CommandError::Empty);
    };
    let args: Vec<&str> = words.collect();

    match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("sign-in" | "signin", [user_id, session_id]) => {
            Ok(ConsoleCommand::SignIn(Identity::new(*user_id, *session_id)))
        }
        ("sign-in" | "signin", [user_id, session_id, first_name]) => Ok(ConsoleCommand::SignIn(
            Identity::new(*user_id, *session_id).with_first_name(*first_name),
        )),
        ("sign-in" | "signin", _) => Err(CommandError::Usage("sign-in <user_id> <session_id> [first_name]")),
        ("sign-out" | "signout", []) => Ok(ConsoleCommand::SignOut),
        ("sign-out" | "signout", _) => Err(CommandError::Usage("sign-out")),
        ("open", [path]) => Ok(ConsoleCommand::Open((*path).to_owned())),
        ("open", _) => Err(CommandError::Usage("open <path>")),
        ("status", []) => Ok(ConsoleCommand::Status),
        ("status", _) => Err(CommandError::Usage("status")),
        ("help" | "?", _) => Ok(ConsoleCommand::Help),
        ("quit" | "exit", _) => Ok(ConsoleCommand::Quit),
        _ => Err(CommandError::Unknown(verb.to_owned())),
    }
}

/// One-line description of a settled update.
#[must_use]
pub fn render_update(update: &ViewUpdate, identity: Option<&Identity>) -> String {
    let screen = match update.view {
        RouteSelection::Pending => "loading".to_owned(),
        RouteSelection::LoginView => "login".to_owned(),
        RouteSelection::DashboardView => match identity {
            Some(identity) => format!("dashboard | {}", identity.welcome_banner()),
            None => "dashboard".to_owned(),
        },
        RouteSelection::RedirectTo(route) => format!("redirect -> {route}"),
    };
    format!("{} {} [sync: {}]", update.location, screen, render_sync(&update.sync))
}

fn render_sync(status: &SyncStatus) -> String {
    match status {
        SyncStatus::Idle => "idle".to_owned(),
        SyncStatus::InFlight { generation } => format!("#{generation} in flight"),
        SyncStatus::Acknowledged { generation, user: Some(user) } => {
            format!("#{generation} ok (user {} / {})", user.id, user.clerk_id)
        }
        SyncStatus::Acknowledged { generation, user: None } => format!("#{generation} ok"),
        SyncStatus::Failed { generation, reason } => format!("#{generation} failed: {reason}"),
    }
}

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;

//! Command Parsing
//!
//! Commands: /start [token], /register, /cancel, /ready, /status [ticket],
//! /help, /addadmin, /removeadmin, /listadmins, /addgroups, /removegroup,
//! /listgroups. The per-ticket "notify ready" control arrives as an action
//! payload (`ready:<queue_number>`), not as text.

/// Inbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin registration, or resolve a deep link when a token is present
    Start { token: Option<String> },

    /// Staff registration of a plate (gated)
    Register,

    /// Abort the current dialogue
    Cancel,

    /// List waiting customers as ready controls (gated)
    Ready,

    /// Ticket status, all visible tickets when no ticket is named
    Status { ticket: Option<String> },

    /// Show help
    Help,

    /// Add staff identities (gated)
    AddAdmin { ids: Vec<String> },

    /// Remove staff identities (gated)
    RemoveAdmin { ids: Vec<String> },

    /// List staff identities (gated)
    ListAdmins,

    /// Add broadcast destinations (gated)
    AddGroups { ids: Vec<String> },

    /// Remove one broadcast destination (gated)
    RemoveGroup { id: Option<String> },

    /// List broadcast destinations (gated)
    ListGroups,

    /// Unknown command
    Unknown(String),
}

impl Command {
    /// Command syntax and description for help text.
    pub fn help_text(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Command::Start { .. } => Some(("/start", "Begin registration")),
            Command::Register => Some(("/register", "Register a new customer")),
            Command::Cancel => Some(("/cancel", "Cancel the current operation")),
            Command::Ready => Some(("/ready", "Notify a customer their car is ready")),
            Command::Status { .. } => Some(("/status [ticket]", "Check ticket status")),
            Command::Help => Some(("/help", "Show this help message")),
            Command::AddAdmin { .. } => Some(("/addadmin <id...>", "Add admins")),
            Command::RemoveAdmin { .. } => Some(("/removeadmin <id...>", "Remove admins")),
            Command::ListAdmins => Some(("/listadmins", "List admins")),
            Command::AddGroups { .. } => {
                Some(("/addgroups <id...>", "Add notification groups"))
            }
            Command::RemoveGroup { .. } => {
                Some(("/removegroup <id>", "Remove a notification group"))
            }
            Command::ListGroups => Some(("/listgroups", "List notification groups")),
            Command::Unknown(_) => None,
        }
    }

    /// Commands that require the caller to be an admin.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::Register
                | Command::Ready
                | Command::AddAdmin { .. }
                | Command::RemoveAdmin { .. }
                | Command::ListAdmins
                | Command::AddGroups { .. }
                | Command::RemoveGroup { .. }
                | Command::ListGroups
        )
    }

    /// Help rows for staff.
    pub fn staff_commands() -> Vec<(&'static str, &'static str)> {
        [
            Command::Register,
            Command::Ready,
            Command::Cancel,
            Command::Status { ticket: None },
            Command::AddAdmin { ids: Vec::new() },
            Command::RemoveAdmin { ids: Vec::new() },
            Command::ListAdmins,
            Command::AddGroups { ids: Vec::new() },
            Command::RemoveGroup { id: None },
            Command::ListGroups,
            Command::Help,
        ]
        .iter()
        .filter_map(Command::help_text)
        .collect()
    }

    /// Help rows for customers.
    pub fn customer_commands() -> Vec<(&'static str, &'static str)> {
        [
            Command::Start { token: None },
            Command::Status { ticket: None },
            Command::Cancel,
            Command::Help,
        ]
        .iter()
        .filter_map(Command::help_text)
        .collect()
    }
}

/// Parse message text into a command.
///
/// Returns `None` for plain text (no leading `/`). A `@botname` suffix on
/// the command word is ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = text.split_whitespace().collect();
    let Some(head) = parts.first() else {
        return Some(Command::Unknown(text.to_string()));
    };
    let name = head.split('@').next().unwrap_or(head);
    let args = || parts[1..].iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let first_arg = || parts.get(1).map(|s| s.to_string());

    let command = match name {
        "/start" => Command::Start { token: first_arg() },
        "/register" => Command::Register,
        "/cancel" => Command::Cancel,
        "/ready" => Command::Ready,
        "/status" => Command::Status {
            ticket: first_arg(),
        },
        "/help" => Command::Help,
        "/addadmin" => Command::AddAdmin { ids: args() },
        "/removeadmin" => Command::RemoveAdmin { ids: args() },
        "/listadmins" => Command::ListAdmins,
        "/addgroups" | "/addgroup" => Command::AddGroups { ids: args() },
        "/removegroup" => Command::RemoveGroup { id: first_arg() },
        "/listgroups" => Command::ListGroups,
        _ => Command::Unknown(text.to_string()),
    };
    Some(command)
}

/// Action payload from a selectable control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Notify the customer of `queue_number` that the vehicle is ready
    NotifyReady { queue_number: String },
}

const READY_PREFIX: &str = "ready:";

impl Action {
    pub fn payload(&self) -> String {
        match self {
            Action::NotifyReady { queue_number } => format!("{}{}", READY_PREFIX, queue_number),
        }
    }
}

pub fn parse_action(payload: &str) -> Option<Action> {
    let queue_number = payload.trim().strip_prefix(READY_PREFIX)?;
    if queue_number.is_empty() {
        return None;
    }
    Some(Action::NotifyReady {
        queue_number: queue_number.to_string(),
    })
}

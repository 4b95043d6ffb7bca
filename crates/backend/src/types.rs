//! Wire types shared with the backend bridge.

use serde::{Deserialize, Serialize};

/// Opaque peer token issued by the backend when resolving a counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One message from a conversation history fetch, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Backend identifier of the sender; absent for some channel posts.
    pub sender_id: Option<String>,
    /// Whether the account holder sent this message.
    #[serde(default)]
    pub outgoing: bool,
    #[serde(default)]
    pub text: String,
}

/// A resolved message sender.
///
/// Closed set of variants; display-name derivation is a pure function per
/// variant rather than runtime type inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sender {
    Individual {
        first_name: Option<String>,
        last_name: Option<String>,
        username: Option<String>,
        phone: Option<String>,
    },
    Group {
        title: Option<String>,
        username: Option<String>,
    },
    Channel {
        title: Option<String>,
        username: Option<String>,
    },
}

/// Derive the display name for a sender.
///
/// Individuals: first+last name, else username, else raw phone. Groups and
/// channels: title, else username. Empty strings count as missing.
pub fn display_name(sender: &Sender) -> String {
    match sender {
        Sender::Individual {
            first_name,
            last_name,
            username,
            phone,
        } => {
            if let Some(first) = non_empty(first_name) {
                match non_empty(last_name) {
                    Some(last) => format!("{first} {last}"),
                    None => first.to_string(),
                }
            } else if let Some(username) = non_empty(username) {
                username.to_string()
            } else {
                non_empty(phone).unwrap_or_default().to_string()
            }
        },
        Sender::Group { title, username } | Sender::Channel { title, username } => {
            non_empty(title)
                .or_else(|| non_empty(username))
                .unwrap_or_default()
                .to_string()
        },
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

//! Access filter for inbound chat messages.
//!
//! Only direct conversations are answered. When a whitelist is configured
//! the sender must match one of its entries exactly, after both sides are
//! in transport-qualified form (`<digits>@c.us`).

use crate::errors::BridgeError;

/// Suffix of a qualified user identity.
pub const USER_SUFFIX: &str = "@c.us";
/// Suffix of a qualified group conversation.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Qualify a phone number or id as a user identity.
///
/// Ids that already carry a domain (`@...`) are returned trimmed. Anything
/// else keeps only its digits, so `+55 11-9999` becomes `55119999@c.us`.
pub fn qualify_user_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains('@') {
        return raw.to_string();
    }
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    format!("{}{}", digits, USER_SUFFIX)
}

pub fn is_group_id(id: &str) -> bool {
    id.ends_with(GROUP_SUFFIX)
}

/// Set of senders allowed to reach the agent. Empty means everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: Vec<String>,
}

impl Whitelist {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut entries: Vec<String> = entries
            .iter()
            .map(|e| e.as_ref())
            .filter(|e| e.chars().any(|c| c.is_ascii_alphanumeric()))
            .map(qualify_user_id)
            .collect();
        entries.sort();
        entries.dedup();
        Self { entries }
    }

    /// Parse a comma-separated list (`5511999,5511888`).
    pub fn from_csv(list: &str) -> Self {
        let parts: Vec<&str> = list.split(',').collect();
        Self::new(parts.as_slice())
    }

    /// Qualified entries, sorted.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, sender_id: &str) -> bool {
        self.entries.binary_search_by(|e| e.as_str().cmp(sender_id)).is_ok()
    }
}

/// Decide whether an inbound message may reach the agent.
///
/// Pure and side-effect free; safe to call from any task.
pub fn allow(conversation_id: &str, sender_id: &str, is_group: bool, whitelist: &Whitelist) -> bool {
    if is_group || is_group_id(conversation_id) {
        return false;
    }
    whitelist.is_empty() || whitelist.contains(sender_id)
}

/// [`allow`] as a boundary check: a denied message is `Unauthorized`.
pub fn authorize(
    conversation_id: &str,
    sender_id: &str,
    is_group: bool,
    whitelist: &Whitelist,
) -> Result<(), BridgeError> {
    if allow(conversation_id, sender_id, is_group, whitelist) {
        Ok(())
    } else {
        Err(BridgeError::Unauthorized)
    }
}

#[cfg(test)]
mod tests;

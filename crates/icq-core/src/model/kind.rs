//! The closed set of event kinds delivered by `events/get`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Kind of an incoming event.
///
/// The set is fixed by the vendor API; there is no extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A message was posted.
    NewMessage,
    /// A message was edited.
    EditedMessage,
    /// A message was deleted.
    DeletedMessage,
    /// A message was pinned.
    PinnedMessage,
    /// A message was unpinned.
    UnpinnedMessage,
    /// Users joined the chat.
    NewChatMembers,
    /// Users left or were removed from the chat.
    LeftChatMembers,
    /// Title, about or rules of the chat changed.
    ChangedChatInfo,
    /// An inline keyboard button was pressed.
    CallbackQuery,
}

impl EventKind {
    /// Every kind, in wire documentation order.
    pub const ALL: [EventKind; 9] = [
        Self::NewMessage,
        Self::EditedMessage,
        Self::DeletedMessage,
        Self::PinnedMessage,
        Self::UnpinnedMessage,
        Self::NewChatMembers,
        Self::LeftChatMembers,
        Self::ChangedChatInfo,
        Self::CallbackQuery,
    ];

    /// Returns the wire name used in the envelope's `type` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "newMessage",
            Self::EditedMessage => "editedMessage",
            Self::DeletedMessage => "deletedMessage",
            Self::PinnedMessage => "pinnedMessage",
            Self::UnpinnedMessage => "unpinnedMessage",
            Self::NewChatMembers => "newChatMembers",
            Self::LeftChatMembers => "leftChatMembers",
            Self::ChangedChatInfo => "changedChatInfo",
            Self::CallbackQuery => "callbackQuery",
        }
    }

    /// Whether events of this kind carry a sender, text and message id.
    pub const fn is_message_like(self) -> bool {
        matches!(
            self,
            Self::NewMessage | Self::EditedMessage | Self::PinnedMessage
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DecodeError;

    /// Exact, case-sensitive match against the wire names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DecodeError::UnknownEventKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_roundtrip_through_from_str() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_from_str_is_case_sensitive() {
        assert_eq!(
            "NewMessage".parse::<EventKind>(),
            Err(DecodeError::UnknownEventKind("NewMessage".into()))
        );
        assert!("notAThing".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_serde_matches_wire_names() {
        let json = serde_json::to_string(&EventKind::CallbackQuery).unwrap();
        assert_eq!(json, "\"callbackQuery\"");
    }
}

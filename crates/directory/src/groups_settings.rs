//! Groups Settings API payloads
//!
//! The API models every boolean as the string `"true"`/`"false"` and answers
//! in Atom unless `alt=json` is requested.

use serde::{Deserialize, Serialize};

/// Partial settings resource sent with `groups.patch`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_collaborative_inbox: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub who_can_post_message: Option<String>,
}

impl GroupSettings {
    /// Settings turning a group into a shared inbox that external senders
    /// can write to
    pub fn collaborative_inbox() -> Self {
        Self {
            enable_collaborative_inbox: Some("true".to_string()),
            who_can_post_message: Some("ANYONE_CAN_POST".to_string()),
        }
    }
}

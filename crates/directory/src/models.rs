//! Directory API resources (only the fields the tools use)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub domain_name: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserName {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub primary_email: String,
    #[serde(default)]
    pub name: UserName,
    #[serde(default)]
    pub suspended: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// The API returns this count as a string
    #[serde(default)]
    pub direct_members_count: Option<String>,
}

/// Body of `groups.insert`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGroup {
    pub email: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Owner,
    Manager,
    Member,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: MemberRole,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Body of `members.insert`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMember {
    pub email: String,
    pub role: MemberRole,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainList {
    #[serde(default)]
    pub domains: Vec<Domain>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserList {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupList {
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_role_wire_format() {
        let body = serde_json::to_value(NewMember {
            email: "owner@example.com".into(),
            role: MemberRole::Owner,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"email": "owner@example.com", "role": "OWNER"}));
    }

    #[test]
    fn test_empty_list_has_no_key() {
        let list: GroupList = serde_json::from_str(r#"{"kind":"admin#directory#groups","etag":"x"}"#).unwrap();
        assert!(list.groups.is_empty());
    }
}

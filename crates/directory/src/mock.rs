//! In-memory `DirectoryApi` for tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::api::DirectoryApi;
use crate::error::DirectoryError;
use crate::groups_settings::GroupSettings;
use crate::models::{Domain, Group, Member, NewGroup, NewMember, User};

#[derive(Default)]
pub struct MockDirectory {
    pub domains: Vec<Domain>,
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    /// Group emails whose insert answers 409
    pub existing_groups: HashSet<String>,
    /// Owner emails whose insert answers 404
    pub unknown_members: HashSet<String>,
    /// Group emails whose settings patch answers 403
    pub failing_settings: HashSet<String>,
    /// Makes every list call answer 403
    pub forbidden: bool,
    pub group_inserts: Mutex<Vec<NewGroup>>,
    pub member_inserts: Mutex<Vec<(String, NewMember)>>,
    pub settings_patches: Mutex<Vec<String>>,
}

impl MockDirectory {
    fn check_access(&self) -> Result<(), DirectoryError> {
        if self.forbidden {
            return Err(DirectoryError::Api {
                status: 403,
                message: "Not Authorized to access this resource/api".into(),
                reason: Some("forbidden".into()),
            });
        }
        Ok(())
    }

    pub fn group_insert_count(&self) -> usize {
        self.group_inserts.lock().unwrap().len()
    }

    pub fn member_insert_count(&self) -> usize {
        self.member_inserts.lock().unwrap().len()
    }
}

#[async_trait]
impl DirectoryApi for MockDirectory {
    async fn list_domains(&self) -> Result<Vec<Domain>, DirectoryError> {
        self.check_access()?;
        Ok(self.domains.clone())
    }

    async fn list_users(&self, max_results: u32) -> Result<Vec<User>, DirectoryError> {
        self.check_access()?;
        Ok(self.users.iter().take(max_results as usize).cloned().collect())
    }

    async fn list_groups(&self, max_results: u32) -> Result<Vec<Group>, DirectoryError> {
        self.check_access()?;
        Ok(self.groups.iter().take(max_results as usize).cloned().collect())
    }

    async fn insert_group(&self, group: &NewGroup) -> Result<Group, DirectoryError> {
        self.group_inserts.lock().unwrap().push(group.clone());
        if self.existing_groups.contains(&group.email) {
            return Err(DirectoryError::Api {
                status: 409,
                message: "Entity already exists.".into(),
                reason: Some("duplicate".into()),
            });
        }
        Ok(Group {
            id: Some(format!("id-{}", group.email)),
            email: group.email.clone(),
            name: Some(group.name.clone()),
            description: Some(group.description.clone()),
            direct_members_count: Some("0".into()),
        })
    }

    async fn insert_member(&self, group_key: &str, member: &NewMember) -> Result<Member, DirectoryError> {
        self.member_inserts
            .lock()
            .unwrap()
            .push((group_key.to_string(), member.clone()));
        if self.unknown_members.contains(&member.email) {
            return Err(DirectoryError::Api {
                status: 404,
                message: "Resource Not Found: memberKey".into(),
                reason: Some("notFound".into()),
            });
        }
        Ok(Member {
            id: None,
            email: Some(member.email.clone()),
            role: member.role,
            kind: Some("USER".into()),
        })
    }

    async fn patch_group_settings(
        &self,
        group_email: &str,
        _settings: &GroupSettings,
    ) -> Result<(), DirectoryError> {
        self.settings_patches.lock().unwrap().push(group_email.to_string());
        if self.failing_settings.contains(group_email) {
            return Err(DirectoryError::Api {
                status: 403,
                message: "Insufficient Permission".into(),
                reason: Some("insufficientPermissions".into()),
            });
        }
        Ok(())
    }
}

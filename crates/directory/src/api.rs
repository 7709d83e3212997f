use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::groups_settings::GroupSettings;
use crate::models::{Domain, Group, Member, NewGroup, NewMember, User};

/// Remote operations used by the provisioner and the access tester
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn list_domains(&self) -> Result<Vec<Domain>, DirectoryError>;

    async fn list_users(&self, max_results: u32) -> Result<Vec<User>, DirectoryError>;

    async fn list_groups(&self, max_results: u32) -> Result<Vec<Group>, DirectoryError>;

    async fn insert_group(&self, group: &NewGroup) -> Result<Group, DirectoryError>;

    async fn insert_member(&self, group_key: &str, member: &NewMember) -> Result<Member, DirectoryError>;

    /// Groups Settings API `groups.patch`
    async fn patch_group_settings(
        &self,
        group_email: &str,
        settings: &GroupSettings,
    ) -> Result<(), DirectoryError>;
}

//! Admin SDK Directory API client
//!
//! A thin reqwest wrapper: one method per REST call, the bearer token taken
//! from the shared credential (renewed on expiry) and Google error bodies
//! mapped to [`DirectoryError::Api`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use common::Config;
use oauth::Credential;

use crate::api::DirectoryApi;
use crate::error::DirectoryError;
use crate::groups_settings::GroupSettings;
use crate::models::{Domain, DomainList, Group, GroupList, Member, NewGroup, NewMember, User, UserList};

pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
    groups_settings_url: String,
    customer: String,
    credential: Mutex<Credential>,
}

impl DirectoryClient {
    pub fn new(
        credential: Credential,
        base_url: impl Into<String>,
        groups_settings_url: impl Into<String>,
        customer: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            groups_settings_url: groups_settings_url.into().trim_end_matches('/').to_string(),
            customer: customer.into(),
            credential: Mutex::new(credential),
        }
    }

    /// Client pointed at the configured endpoints and customer
    pub fn from_config(credential: Credential, config: &Config) -> Self {
        Self::new(
            credential,
            &config.endpoints.directory,
            &config.endpoints.groups_settings,
            &config.workspace.customer,
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn bearer(&self) -> Result<String, DirectoryError> {
        let mut credential = self.credential.lock().await;
        credential
            .access_token()
            .await
            .map(str::to_string)
            .map_err(DirectoryError::Credential)
    }

    /// Sends the request and returns the raw success body
    async fn send_raw(&self, request: RequestBuilder) -> Result<String, DirectoryError> {
        let token = self.bearer().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Directory API responded {}", status);

        if !status.is_success() {
            return Err(DirectoryError::from_response(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DirectoryError> {
        let body = self.send_raw(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    async fn list_domains(&self) -> Result<Vec<Domain>, DirectoryError> {
        let path = format!("/customer/{}/domains", urlencoding::encode(&self.customer));
        let list: DomainList = self.send(self.request(Method::GET, &path)).await?;
        Ok(list.domains)
    }

    async fn list_users(&self, max_results: u32) -> Result<Vec<User>, DirectoryError> {
        let request = self
            .request(Method::GET, "/users")
            .query(&[("customer", self.customer.clone()), ("maxResults", max_results.to_string())]);
        let list: UserList = self.send(request).await?;
        Ok(list.users)
    }

    async fn list_groups(&self, max_results: u32) -> Result<Vec<Group>, DirectoryError> {
        let request = self
            .request(Method::GET, "/groups")
            .query(&[("customer", self.customer.clone()), ("maxResults", max_results.to_string())]);
        let list: GroupList = self.send(request).await?;
        Ok(list.groups)
    }

    async fn insert_group(&self, group: &NewGroup) -> Result<Group, DirectoryError> {
        debug!("Inserting group {}", group.email);
        self.send(self.request(Method::POST, "/groups").json(group)).await
    }

    async fn insert_member(&self, group_key: &str, member: &NewMember) -> Result<Member, DirectoryError> {
        debug!("Inserting {:?} {} into {}", member.role, member.email, group_key);
        let path = format!("/groups/{}/members", urlencoding::encode(group_key));
        self.send(self.request(Method::POST, &path).json(member)).await
    }

    async fn patch_group_settings(
        &self,
        group_email: &str,
        settings: &GroupSettings,
    ) -> Result<(), DirectoryError> {
        debug!("Patching settings of {}", group_email);
        let url = format!("{}/{}", self.groups_settings_url, urlencoding::encode(group_email));
        let request = self
            .http
            .patch(url)
            .query(&[("alt", "json")])
            .json(settings);
        self.send_raw(request).await.map(|_| ())
    }
}

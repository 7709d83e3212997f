//! Bulk group provisioning from CSV
//!
//! Expected columns: `Group Email`, `Group Name`, `Description`, `Owners`
//! (owners separated by `;`). Every row is attempted independently: a row
//! that cannot be read, a group that cannot be created or an owner that
//! cannot be added is recorded and the run moves on. Nothing is rolled back
//! or retried.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{error, info, warn};

use crate::api::DirectoryApi;
use crate::groups_settings::GroupSettings;
use crate::models::{MemberRole, NewGroup, NewMember};

/// One CSV row
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "Group Email")]
    pub email: String,
    #[serde(rename = "Group Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Owners")]
    pub owners: String,
}

impl GroupRecord {
    /// Owner emails, trimmed, with empty entries dropped
    pub fn owner_emails(&self) -> Vec<String> {
        self.owners
            .split(';')
            .map(str::trim)
            .filter(|owner| !owner.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn new_group(&self) -> NewGroup {
        NewGroup {
            email: self.email.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }

    fn from_result<T, E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Outcome::Succeeded,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OwnerOutcome {
    pub email: String,
    pub outcome: Outcome,
}

/// What happened to one CSV row
#[derive(Debug, Clone)]
pub struct RowOutcome {
    /// Line in the CSV file (the header is line 1)
    pub line: u64,
    /// `None` when the row could not be read
    pub group_email: Option<String>,
    pub group: Outcome,
    pub owners: Vec<OwnerOutcome>,
    /// Present when collaborative inbox configuration was requested
    pub settings: Option<Outcome>,
}

impl RowOutcome {
    pub fn is_unreadable(&self) -> bool {
        self.group_email.is_none()
    }
}

#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub rows: Vec<RowOutcome>,
}

impl ProvisionReport {
    pub fn groups_created(&self) -> usize {
        self.rows.iter().filter(|r| r.group.is_success()).count()
    }

    pub fn groups_failed(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| !r.is_unreadable() && !r.group.is_success())
            .count()
    }

    pub fn unreadable_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.is_unreadable()).count()
    }

    pub fn owners_added(&self) -> usize {
        self.owner_outcomes().filter(|o| o.outcome.is_success()).count()
    }

    pub fn owners_failed(&self) -> usize {
        self.owner_outcomes().filter(|o| !o.outcome.is_success()).count()
    }

    fn owner_outcomes(&self) -> impl Iterator<Item = &OwnerOutcome> {
        self.rows.iter().flat_map(|r| r.owners.iter())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    /// Configure each group as a collaborative inbox after creating it
    pub collaborative_inbox: bool,
}

pub struct GroupProvisioner<'a, A: DirectoryApi + ?Sized> {
    api: &'a A,
    options: ProvisionOptions,
}

impl<'a, A: DirectoryApi + ?Sized> GroupProvisioner<'a, A> {
    pub fn new(api: &'a A, options: ProvisionOptions) -> Self {
        Self { api, options }
    }

    /// Provisions every row of the CSV file at `path`
    ///
    /// Only an unopenable file or an unreadable header is an error; row
    /// failures end up in the report.
    pub async fn provision_file(&self, path: &Path) -> Result<ProvisionReport> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open groups file {}", path.display()))?;
        self.provision_reader(file).await
    }

    pub async fn provision_reader<R: Read>(&self, reader: R) -> Result<ProvisionReport> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv.headers().context("Failed to read CSV header")?.clone();

        let mut report = ProvisionReport::default();
        let mut line = 1;
        for result in csv.records() {
            line += 1;
            let parsed = result.and_then(|record| {
                if let Some(position) = record.position() {
                    line = position.line();
                }
                record.deserialize::<GroupRecord>(Some(&headers))
            });

            let outcome = match parsed {
                Ok(record) => self.provision_record(line, &record).await,
                Err(e) => {
                    error!("Skipping unreadable row on line {}: {}", line, e);
                    RowOutcome {
                        line,
                        group_email: None,
                        group: Outcome::Failed(format!("unreadable row: {}", e)),
                        owners: vec![],
                        settings: None,
                    }
                }
            };
            report.rows.push(outcome);
        }

        info!(
            "Provisioned {} rows: {} groups created, {} failed, {} unreadable, {} owners added, {} owner failures",
            report.rows.len(),
            report.groups_created(),
            report.groups_failed(),
            report.unreadable_rows(),
            report.owners_added(),
            report.owners_failed()
        );
        Ok(report)
    }

    /// Creates one group, then adds each listed owner
    ///
    /// Owners are attempted even when the group insert fails, so a re-run
    /// against an existing group still ensures its owners.
    pub async fn provision_record(&self, line: u64, record: &GroupRecord) -> RowOutcome {
        let group = match self.api.insert_group(&record.new_group()).await {
            Ok(_) => {
                info!("Created group: {}", record.email);
                Outcome::Succeeded
            }
            Err(e) if e.is_duplicate() => {
                warn!("Group {} already exists", record.email);
                Outcome::Failed(format!("already exists ({})", e))
            }
            Err(e) => {
                error!("Error creating {}: {}", record.email, e);
                Outcome::Failed(e.to_string())
            }
        };

        let mut owners = Vec::new();
        for email in record.owner_emails() {
            let member = NewMember {
                email: email.clone(),
                role: MemberRole::Owner,
            };
            let outcome = Outcome::from_result(self.api.insert_member(&record.email, &member).await);
            if let Outcome::Failed(e) = &outcome {
                error!("Error adding owner {} to {}: {}", email, record.email, e);
            }
            owners.push(OwnerOutcome { email, outcome });
        }

        let settings = if self.options.collaborative_inbox && group.is_success() {
            let result = self
                .api
                .patch_group_settings(&record.email, &GroupSettings::collaborative_inbox())
                .await;
            if let Err(e) = &result {
                warn!("Could not make {} a collaborative inbox: {}", record.email, e);
            }
            Some(Outcome::from_result(result))
        } else {
            None
        };

        RowOutcome {
            line,
            group_email: Some(record.email.clone()),
            group,
            owners,
            settings,
        }
    }
}

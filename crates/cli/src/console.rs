//! Human-facing report text
//!
//! Everything here returns a `String` so the binaries only decide when to
//! print it.

use std::fmt::Write;

use directory::{AccessReport, Outcome, ProvisionReport, RowOutcome};
use oauth::ChainReport;

pub const MANUAL_STEPS: &[&str] = &[
    "Go to: https://console.cloud.google.com",
    "Enable Admin SDK API",
    "Create OAuth credentials",
    "Download as credentials.json",
];

pub const NEXT_STEPS: &[&str] = &[
    "Configure domain DNS records",
    "Set up email migration",
    "Configure SSO if needed",
    "Set up automation scripts",
];

pub fn banner(title: &str) -> String {
    format!("{}\n{}", title, "=".repeat(title.chars().count()))
}

pub fn numbered(steps: &[&str]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per credential source that was tried
pub fn chain_report(report: &ChainReport) -> String {
    let mut out = String::new();
    for attempt in &report.attempts {
        let line = match &attempt.error {
            None => format!("✓ {} working", attempt.provider),
            Some(e) => format!("✗ {} failed: {}", attempt.provider, e),
        };
        writeln!(out, "{}", line).ok();
    }
    out
}

pub fn access_report(report: &AccessReport) -> String {
    let mut out = String::new();
    writeln!(out, "✓ Found {} domains:", report.domains.len()).ok();
    for domain in &report.domains {
        let verified = if domain.verified { "verified" } else { "unverified" };
        writeln!(out, "   • {} ({})", domain.domain_name, verified).ok();
    }
    writeln!(out, "✓ Found {} users (showing first 10)", report.user_count).ok();
    writeln!(out, "✓ Found {} groups (showing first 10)", report.group_count).ok();
    out
}

fn row_lines(row: &RowOutcome) -> Vec<String> {
    let email = match &row.group_email {
        Some(email) => email,
        None => {
            let reason = match &row.group {
                Outcome::Failed(e) => e.as_str(),
                Outcome::Succeeded => "",
            };
            return vec![format!("✗ Line {}: {}", row.line, reason)];
        }
    };

    let mut lines = vec![match &row.group {
        Outcome::Succeeded => format!("✓ Created group: {}", email),
        Outcome::Failed(e) => format!("✗ Error creating {}: {}", email, e),
    }];
    for owner in &row.owners {
        lines.push(match &owner.outcome {
            Outcome::Succeeded => format!("  ✓ Owner {}", owner.email),
            Outcome::Failed(e) => format!("  ✗ Owner {}: {}", owner.email, e),
        });
    }
    match &row.settings {
        Some(Outcome::Succeeded) => lines.push("  ✓ Collaborative inbox enabled".to_string()),
        Some(Outcome::Failed(e)) => lines.push(format!("  ✗ Collaborative inbox: {}", e)),
        None => {}
    }
    lines
}

pub fn provision_report(report: &ProvisionReport) -> String {
    let mut out = String::new();
    for row in &report.rows {
        for line in row_lines(row) {
            writeln!(out, "{}", line).ok();
        }
    }
    writeln!(
        out,
        "\n{} groups created, {} failed, {} unreadable rows; {} owners added, {} failed",
        report.groups_created(),
        report.groups_failed(),
        report.unreadable_rows(),
        report.owners_added(),
        report.owners_failed()
    )
    .ok();
    out
}

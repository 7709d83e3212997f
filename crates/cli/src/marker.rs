//! `auth_working.json`, written once the diagnostic has succeeded

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthMarker {
    pub status: String,
}

impl AuthMarker {
    pub fn authenticated() -> Self {
        Self {
            status: "authenticated".to_string(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write marker {}", path.display()))?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

use std::path::PathBuf;
use tracing::debug;

/// Name of the optional config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "workspace-admin.toml";

/// Environment variable that relocates the gcloud config directory
const CLOUDSDK_CONFIG_ENV: &str = "CLOUDSDK_CONFIG";

/// Gets the default configuration file path for the admin tools.
/// - Linux: ~/.config/workspace-admin/workspace-admin.toml
/// - macOS: ~/Library/Application Support/com.workspace-admin.workspace-admin/workspace-admin.toml
/// - Windows: %APPDATA%\workspace-admin\workspace-admin\config\workspace-admin.toml
pub fn get_config_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "workspace-admin", "workspace-admin")?;
    Some(dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Gets the gcloud SDK configuration directory.
///
/// gcloud uses `~/.config/gcloud` on every Unix, including macOS, and
/// `%APPDATA%\gcloud` on Windows. `CLOUDSDK_CONFIG` overrides both.
pub fn gcloud_config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CLOUDSDK_CONFIG_ENV) {
        debug!("Using gcloud config dir from {}", CLOUDSDK_CONFIG_ENV);
        return Some(PathBuf::from(dir));
    }

    #[cfg(target_os = "windows")]
    return dirs::config_dir().map(|dir| dir.join("gcloud"));

    #[cfg(not(target_os = "windows"))]
    return dirs::home_dir().map(|home| home.join(".config").join("gcloud"));
}

/// Path of the Application Default Credentials file written by
/// `gcloud auth application-default login`
pub fn adc_well_known_file() -> Option<PathBuf> {
    gcloud_config_dir().map(|dir| dir.join("application_default_credentials.json"))
}

/// Name of the gcloud executable on the current platform
pub fn gcloud_binary() -> &'static str {
    #[cfg(target_os = "windows")]
    return "gcloud.cmd";

    #[cfg(not(target_os = "windows"))]
    return "gcloud";
}

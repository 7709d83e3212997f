//! OAuth endpoints and scopes for the Google Admin SDK

/// Directory API: manage users
pub const SCOPE_DIRECTORY_USER: &str = "https://www.googleapis.com/auth/admin.directory.user";

/// Directory API: manage groups and memberships
pub const SCOPE_DIRECTORY_GROUP: &str = "https://www.googleapis.com/auth/admin.directory.group";

/// Directory API: manage domains
pub const SCOPE_DIRECTORY_DOMAIN: &str = "https://www.googleapis.com/auth/admin.directory.domain";

/// Groups Settings API
pub const SCOPE_GROUPS_SETTINGS: &str = "https://www.googleapis.com/auth/apps.groups.settings";

/// Scopes requested by the group provisioner's consent flow
pub const PROVISIONING_SCOPES: &[&str] = &[
    SCOPE_DIRECTORY_USER,
    SCOPE_DIRECTORY_GROUP,
    SCOPE_GROUPS_SETTINGS,
];

/// Scopes requested by the diagnostic fallback chain
pub const DIAGNOSTIC_SCOPES: &[&str] = &[
    SCOPE_DIRECTORY_USER,
    SCOPE_DIRECTORY_GROUP,
    SCOPE_DIRECTORY_DOMAIN,
];

/// Google OAuth authorization endpoint
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token exchange endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Grant type for service-account JWT assertions
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a service-account assertion (Google caps it at one hour)
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Path of the OAuth callback on the local redirect server
pub const CALLBACK_PATH: &str = "/";

/// How long the consent flow waits for the browser redirect
pub const CALLBACK_TIMEOUT_SECS: u64 = 300;

/// Environment variable pointing at an ADC key file
pub const ADC_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Metadata server path serving the default service account's token
pub const METADATA_TOKEN_PATH: &str =
    "/computeMetadata/v1/instance/service-accounts/default/token";

/// Budget for the metadata server probe (it is unreachable off GCE)
pub const METADATA_TIMEOUT_SECS: u64 = 2;

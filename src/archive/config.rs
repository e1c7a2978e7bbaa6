use super::error::ArchiveError;

/// Environment variable naming the archive installation, e.g.
/// `https://demo.dataverse.org`.
pub const SERVER_ENV: &str = "DATAVERSE_SERVER";

/// Environment variable holding an optional API token for restricted
/// datasets.
pub const TOKEN_ENV: &str = "DATAVERSE_KEY";

/// Where to reach the archive, and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Normalized base URL with no trailing slash.
    pub base_url: String,
    pub api_token: Option<String>,
}

impl ArchiveConfig {
    pub fn new(server: &str, api_token: Option<String>) -> Self {
        Self {
            base_url: normalize_server(server),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Read the server and token from the environment.
    pub fn from_env() -> Result<Self, ArchiveError> {
        let server = std::env::var(SERVER_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ArchiveError::MissingServer)?;
        let token = std::env::var(TOKEN_ENV).ok();
        Ok(Self::new(&server, token))
    }
}

/// Trim whitespace and trailing slashes; assume https when no scheme is
/// given.
fn normalize_server(server: &str) -> String {
    let trimmed = server.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

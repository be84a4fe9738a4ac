//! Configuration for the campus-id authorization server.

use std::collections::HashSet;

/// Protocol policy constants.
pub mod policy {
    /// Authorization code lifetime: 10 minutes. Deliberately short since a
    /// code is single-use and exchanged immediately after consent.
    pub const AUTH_CODE_TTL: i64 = 600;

    /// Access token lifetime: 1 hour.
    pub const ACCESS_TOKEN_TTL: i64 = 3600;

    /// Refresh token window: 7 days from issuance of the pair.
    pub const REFRESH_TOKEN_TTL: i64 = 7 * 24 * 3600;

    /// bcrypt cost for client-secret hashes.
    pub const BCRYPT_COST: u32 = 12;
}

/// Scope catalog: every grantable scope and the profile fields it covers.
pub mod scopes {
    /// Scope names with human-readable consent descriptions.
    pub const AVAILABLE: &[(&str, &str)] = &[
        ("profile:basic", "Read your basic identity (Name, PRN, SRN)."),
        ("profile:academic", "Read your academic details (Program, Branch, Semester, Section, Campus)."),
        ("profile:photo", "Read your profile photo."),
        ("profile:contact", "Read your contact information (Email, Phone Number)."),
    ];

    /// Profile fields grantable under each scope.
    pub const FIELDS: &[(&str, &[&str])] = &[
        ("profile:basic", &["name", "prn", "srn"]),
        ("profile:academic", &["program", "branch", "semester", "section", "campus", "campus_code"]),
        ("profile:photo", &["photo_base64"]),
        ("profile:contact", &["email", "phone"]),
    ];

    /// Fields grantable under `scope`, or `None` for an unknown scope.
    #[must_use]
    pub fn fields_for(scope: &str) -> Option<&'static [&'static str]> {
        FIELDS.iter().find(|(s, _)| *s == scope).map(|(_, fields)| *fields)
    }

    /// Whether `scope` is in the catalog.
    #[must_use]
    pub fn is_known(scope: &str) -> bool {
        AVAILABLE.iter().any(|(s, _)| *s == scope)
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public base URL, used in logs and endpoint announcements.
    pub base_url: String,

    /// Privileged user identifiers allowed to manage clients.
    ///
    /// A capability check for the admin boundary; the grant engine itself
    /// never consults it.
    pub admin_users: HashSet<String>,
}

impl Config {
    /// Create a configuration with an explicit admin allowlist.
    #[must_use]
    pub fn new(base_url: impl Into<String>, admin_users: HashSet<String>) -> Self {
        Self { base_url: base_url.into(), admin_users }
    }

    /// Create configuration from environment variables.
    ///
    /// `ADMIN_USERS` is a comma-separated list of privileged identifiers;
    /// empty entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let admin_users = std::env::var("ADMIN_USERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        Ok(Self::new(base_url, admin_users))
    }

    /// Create a test configuration.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self::new(base_url, HashSet::new())
    }

    /// Check whether `user` is on the admin allowlist.
    #[must_use]
    pub fn is_admin(&self, user: &str) -> bool {
        self.admin_users.contains(user)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8080", HashSet::new())
    }
}

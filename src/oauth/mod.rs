//! Provider OAuth clients.
//!
//! Two providers with deliberately different shapes: Granola discovers its
//! authorization server and registers a client dynamically (public PKCE
//! client, no secret), while Google Calendar uses a statically configured
//! client and supports refresh-token rotation.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub mod google;
pub mod granola;

pub use google::GoogleOAuth;
pub use granola::GranolaOAuth;

pub const GRANOLA_PROVIDER_SLUG: &str = "granola";
pub const GOOGLE_CALENDAR_PROVIDER_SLUG: &str = "google-calendar";

/// Providers this deployment can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Granola,
    GoogleCalendar,
}

impl Provider {
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Granola => GRANOLA_PROVIDER_SLUG,
            Provider::GoogleCalendar => GOOGLE_CALENDAR_PROVIDER_SLUG,
        }
    }

    pub fn all() -> [Provider; 2] {
        [Provider::Granola, Provider::GoogleCalendar]
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            GRANOLA_PROVIDER_SLUG => Ok(Provider::Granola),
            GOOGLE_CALENDAR_PROVIDER_SLUG => Ok(Provider::GoogleCalendar),
            other => Err(UnknownProvider {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown provider '{name}'")]
pub struct UnknownProvider {
    pub name: String,
}

/// Token endpoint response shared by both providers.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Truncate an upstream response body for inclusion in error messages.
pub(crate) fn truncate_body(body: String) -> String {
    if body.chars().count() > 200 {
        let truncated: String = body.chars().take(200).collect();
        format!("{}...", truncated)
    } else {
        body
    }
}

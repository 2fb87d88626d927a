//! Connector-platform configuration and wire types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConnectEnvironment
// ---------------------------------------------------------------------------

/// Pipedream project environment sent in `X-PD-Environment`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectEnvironment {
    #[default]
    Development,
    Production,
}

impl ConnectEnvironment {
    /// Parse `development` / `production`; anything else is development.
    ///
    /// ```
    /// use super_characters::connect::ConnectEnvironment;
    ///
    /// assert_eq!(ConnectEnvironment::parse_lossy("production"), ConnectEnvironment::Production);
    /// assert_eq!(ConnectEnvironment::parse_lossy("staging"), ConnectEnvironment::Development);
    /// assert_eq!(ConnectEnvironment::parse_lossy(""), ConnectEnvironment::Development);
    /// ```
    pub fn parse_lossy(value: &str) -> Self {
        match value {
            "production" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for ConnectEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConnectConfig
// ---------------------------------------------------------------------------

/// OAuth client credentials and project for the connector platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectConfig {
    pub client_id: String,
    pub client_secret: String,
    pub project_id: String,
    pub environment: ConnectEnvironment,
}

impl ConnectConfig {
    /// `true` when client id, client secret and project id are all set.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.project_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

/// App summary nested inside a [`ConnectedAccount`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectedAccountApp {
    pub name_slug: String,
    pub name: String,
    pub img_src: String,
}

/// An account a user connected through the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectedAccount {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub healthy: bool,
    pub dead: bool,
    pub app: ConnectedAccountApp,
    pub created_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

impl ConnectedAccount {
    pub fn app_slug(&self) -> &str {
        &self.app.name_slug
    }

    pub fn app_name(&self) -> &str {
        &self.app.name
    }
}

/// An integration in the platform's app catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct App {
    pub id: String,
    pub name_slug: String,
    pub name: String,
    pub description: String,
    pub auth_type: String,
    pub img_src: String,
    pub categories: Vec<String>,
    pub featured_weight: i64,
}

/// Short-lived token handed to the frontend SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectToken {
    pub token: String,
    pub expires_at: String,
    pub connect_link_url: String,
}

/// What a remote MCP client needs to reach the platform's MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpConfig {
    pub server_url: String,
    pub project_id: String,
    pub environment: ConnectEnvironment,
}

/// `{"data": [...]}` list envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DataList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// OAuth client-credentials grant response.
#[derive(Debug, Deserialize)]
pub(crate) struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

//! Pipedream Connect integration.
//!
//! Lets the character reach third-party accounts the user has connected:
//! [`ConnectClient`] mints frontend connect tokens, searches the app
//! catalogue, lists and deletes connected accounts, and hands out MCP
//! credentials.  Credentials come from the settings store via
//! [`SettingsStore::connect_config`](crate::config::SettingsStore::connect_config).

pub mod client;
pub mod types;

pub use client::{ConnectClient, CONNECT_PAGE_URL, MCP_SERVER_URL, PIPEDREAM_BASE_URL};
pub use types::{
    App, ConnectConfig, ConnectEnvironment, ConnectToken, ConnectedAccount, ConnectedAccountApp,
    McpConfig,
};

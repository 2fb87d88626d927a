//! Pipedream Connect REST client.
//!
//! All calls authenticate with an OAuth client-credentials access token that
//! is fetched lazily and cached until one minute before it expires.

use std::time::{Duration, Instant};

use reqwest::{StatusCode, Url};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::{self, ApiError, DEFAULT_TIMEOUT};
use crate::connect::types::{
    App, ConnectConfig, ConnectToken, ConnectedAccount, DataList, McpConfig, OAuthToken,
};

/// Connect REST endpoint.
pub const PIPEDREAM_BASE_URL: &str = "https://api.pipedream.com/v1";

/// Remote MCP server handed to MCP clients.
pub const MCP_SERVER_URL: &str = "https://remote.mcp.pipedream.net";

/// Hosted connect page used when a token carries no link of its own.
pub const CONNECT_PAGE_URL: &str = "https://pipedream.com/_static/connect.html";

const SERVICE: &str = "pipedream";

/// Cached tokens are refreshed this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Longest lifetime a cached token is trusted for, whatever the grant says.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct CreateTokenRequest<'a> {
    external_user_id: &'a str,
}

// ---------------------------------------------------------------------------
// ConnectClient
// ---------------------------------------------------------------------------

/// Client for the Connect API: tokens, app catalogue and connected accounts.
#[derive(Debug)]
pub struct ConnectClient {
    client: reqwest::Client,
    config: ConnectConfig,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl ConnectClient {
    pub fn new(config: ConnectConfig) -> Self {
        Self {
            client: api::http_client(DEFAULT_TIMEOUT),
            config,
            base_url: PIPEDREAM_BASE_URL.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Point the client at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the credentials and forget any cached access token.
    pub fn configure(&mut self, config: ConnectConfig) {
        self.config = config;
        *self.token.get_mut() = None;
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Create a short-lived token for the frontend connect flow.
    pub async fn create_connect_token(
        &self,
        external_user_id: &str,
    ) -> Result<ConnectToken, ApiError> {
        let access_token = self.access_token().await?;
        let url = format!("{}/connect/{}/tokens", self.base_url, self.config.project_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .header("X-PD-Environment", self.config.environment.as_str())
            .json(&CreateTokenRequest { external_user_id })
            .send()
            .await?;

        api::read_json(SERVICE, response, &[StatusCode::OK, StatusCode::CREATED]).await
    }

    /// A connect link for `app_slug`, minted from a fresh connect token.
    pub async fn connect_link_url(
        &self,
        external_user_id: &str,
        app_slug: &str,
    ) -> Result<String, ApiError> {
        let token = self.create_connect_token(external_user_id).await?;
        link_with_app(&token, app_slug)
    }

    /// Search the app catalogue, most featured first.  `limit == 0` leaves
    /// the page size to the server.
    pub async fn list_apps(&self, query: &str, limit: usize) -> Result<Vec<App>, ApiError> {
        let access_token = self.access_token().await?;

        let mut params: Vec<(&str, String)> = Vec::with_capacity(4);
        if !query.is_empty() {
            params.push(("q", query.to_string()));
        }
        if limit > 0 {
            params.push(("limit", limit.to_string()));
        }
        params.push(("sort_key", "featured_weight".to_string()));
        params.push(("sort_direction", "desc".to_string()));

        let response = self
            .client
            .get(format!("{}/apps", self.base_url))
            .query(&params)
            .bearer_auth(&access_token)
            .header("X-PD-Project-Id", self.config.project_id.as_str())
            .header("X-PD-Environment", self.config.environment.as_str())
            .send()
            .await?;

        let list: DataList<App> = api::read_json(SERVICE, response, &[StatusCode::OK]).await?;
        Ok(list.data)
    }

    /// Accounts connected by `external_user_id`.
    pub async fn list_connected_accounts(
        &self,
        external_user_id: &str,
    ) -> Result<Vec<ConnectedAccount>, ApiError> {
        let access_token = self.access_token().await?;
        let url = format!("{}/connect/{}/accounts", self.base_url, self.config.project_id);

        let response = self
            .client
            .get(&url)
            .query(&[("external_user_id", external_user_id)])
            .bearer_auth(&access_token)
            .header("X-PD-Environment", self.config.environment.as_str())
            .send()
            .await?;

        let list: DataList<ConnectedAccount> =
            api::read_json(SERVICE, response, &[StatusCode::OK]).await?;
        Ok(list.data)
    }

    pub async fn delete_connected_account(&self, account_id: &str) -> Result<(), ApiError> {
        let access_token = self.access_token().await?;
        let url = self.endpoint(&["connect", &self.config.project_id, "accounts", account_id])?;

        let response = self
            .client
            .delete(url)
            .bearer_auth(&access_token)
            .header("X-PD-Environment", self.config.environment.as_str())
            .send()
            .await?;

        api::read_body(SERVICE, response, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        log::info!("Deleted connected account {account_id}");
        Ok(())
    }

    /// Access token for authenticating against the MCP server.
    pub async fn mcp_access_token(&self) -> Result<String, ApiError> {
        self.access_token().await
    }

    pub fn mcp_config(&self) -> McpConfig {
        McpConfig {
            server_url: MCP_SERVER_URL.to_string(),
            project_id: self.config.project_id.clone(),
            environment: self.config.environment,
        }
    }

    /// `base_url` with `segments` appended, each percent-encoded as a
    /// single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Build(format!("invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Build(format!("base URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // -----------------------------------------------------------------------
    // Token cache
    // -----------------------------------------------------------------------

    async fn access_token(&self) -> Result<String, ApiError> {
        if !self.config.is_configured() {
            return Err(ApiError::NotConfigured("pipedream credentials"));
        }

        // Held across the fetch so concurrent callers share one grant.
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .form(&form)
            .send()
            .await?;

        let grant: OAuthToken = api::read_json(SERVICE, response, &[StatusCode::OK]).await?;
        if grant.access_token.is_empty() {
            return Err(ApiError::EmptyResult(SERVICE));
        }
        log::debug!("Fetched connector access token (expires in {}s)", grant.expires_in);

        let lifetime = Duration::from_secs(grant.expires_in).min(MAX_TOKEN_LIFETIME);
        let now = Instant::now();
        let token = CachedToken {
            access_token: grant.access_token,
            expires_at: now.checked_add(lifetime).unwrap_or(now),
        };
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}

/// The token's link (or the hosted page with `token=`) with `app` set to
/// `app_slug`, replacing any existing `app` parameter.
fn link_with_app(token: &ConnectToken, app_slug: &str) -> Result<String, ApiError> {
    let mut url = if token.connect_link_url.is_empty() {
        Url::parse_with_params(CONNECT_PAGE_URL, &[("token", token.token.as_str())])
    } else {
        Url::parse(&token.connect_link_url)
    }
    .map_err(|e| ApiError::Decode(format!("invalid connect link URL: {e}")))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "app")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("app", app_slug);

    Ok(url.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{serve, CannedResponse};
    use crate::connect::types::ConnectEnvironment;
    use serde_json::json;

    fn config() -> ConnectConfig {
        ConnectConfig {
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            project_id: "proj_1".into(),
            environment: ConnectEnvironment::Development,
        }
    }

    fn grant(token: &str, expires_in: u64) -> CannedResponse {
        CannedResponse::json(
            200,
            json!({ "access_token": token, "expires_in": expires_in, "token_type": "Bearer" }),
        )
    }

    #[tokio::test]
    async fn unconfigured_calls_send_nothing() {
        let mut cfg = config();
        cfg.client_secret.clear();
        let client = ConnectClient::new(cfg).with_base_url("http://127.0.0.1:9");

        assert!(!client.is_configured());
        assert!(matches!(
            client.list_apps("", 0).await,
            Err(ApiError::NotConfigured(_))
        ));
        assert!(matches!(
            client.create_connect_token("u").await,
            Err(ApiError::NotConfigured(_))
        ));
        assert!(matches!(
            client.delete_connected_account("a").await,
            Err(ApiError::NotConfigured(_))
        ));
        assert!(matches!(
            client.mcp_access_token().await,
            Err(ApiError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn token_is_fetched_once_and_reused() {
        let (base, server) = serve(vec![
            grant("at-1", 3600),
            CannedResponse::json(200, json!({ "data": [] })),
            CannedResponse::json(
                200,
                json!({ "data": [{ "id": "app_1", "name_slug": "gmail", "name": "Gmail" }] }),
            ),
        ])
        .await;
        let client = ConnectClient::new(config()).with_base_url(&base);

        assert!(client.list_connected_accounts("user-1").await.unwrap().is_empty());
        let apps = client.list_apps("mail", 5).await.unwrap();
        assert_eq!(apps[0].name_slug, "gmail");

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 3);

        let token_req = &requests[0];
        assert_eq!(token_req.method, "POST");
        assert_eq!(token_req.target, "/oauth/token");
        assert_eq!(
            token_req.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        let form = token_req.body_text();
        assert!(form.contains("grant_type=client_credentials"), "{form}");
        assert!(form.contains("client_id=cid"), "{form}");
        assert!(form.contains("client_secret=csecret"), "{form}");

        let accounts = &requests[1];
        assert_eq!(accounts.target, "/connect/proj_1/accounts?external_user_id=user-1");
        assert_eq!(accounts.header("authorization"), Some("Bearer at-1"));
        assert_eq!(accounts.header("x-pd-environment"), Some("development"));

        let apps = &requests[2];
        assert_eq!(
            apps.target,
            "/apps?q=mail&limit=5&sort_key=featured_weight&sort_direction=desc"
        );
        assert_eq!(apps.header("authorization"), Some("Bearer at-1"));
        assert_eq!(apps.header("x-pd-project-id"), Some("proj_1"));
    }

    #[tokio::test]
    async fn token_inside_expiry_margin_is_refetched() {
        let (base, server) = serve(vec![
            grant("short", 30),
            CannedResponse::json(200, json!({ "data": [] })),
            grant("long", 3600),
            CannedResponse::json(200, json!({ "data": [] })),
        ])
        .await;
        let client = ConnectClient::new(config()).with_base_url(&base);

        client.list_connected_accounts("u").await.unwrap();
        client.list_connected_accounts("u").await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests[2].target, "/oauth/token");
        assert_eq!(requests[3].header("authorization"), Some("Bearer long"));
    }

    #[tokio::test]
    async fn configure_drops_cached_token() {
        let (base, server) = serve(vec![
            grant("first", 3600),
            grant("second", 3600),
        ])
        .await;
        let mut client = ConnectClient::new(config()).with_base_url(&base);

        assert_eq!(client.mcp_access_token().await.unwrap(), "first");
        let mut cfg = config();
        cfg.environment = ConnectEnvironment::Production;
        client.configure(cfg);
        assert_eq!(client.mcp_access_token().await.unwrap(), "second");

        let requests = server.await.unwrap();
        assert!(requests.iter().all(|r| r.target == "/oauth/token"));
    }

    #[tokio::test]
    async fn token_failure_surfaces_status() {
        let (base, server) =
            serve(vec![CannedResponse::bytes(401, "application/json", r#"{"error":"invalid_client"}"#)])
                .await;
        let client = ConnectClient::new(config()).with_base_url(&base);

        let err = client.mcp_access_token().await.unwrap_err();
        match err {
            ApiError::Remote { service, status, body } => {
                assert_eq!(service, "pipedream");
                assert_eq!(status, 401);
                assert!(body.contains("invalid_client"));
            }
            other => panic!("expected Remote, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_token_posts_external_user() {
        let (base, server) = serve(vec![
            grant("at", 3600),
            CannedResponse::json(
                201,
                json!({
                    "token": "ctok",
                    "expires_at": "2026-01-01T00:00:00Z",
                    "connect_link_url": "https://pipedream.com/_static/connect.html?token=ctok"
                }),
            ),
        ])
        .await;
        let mut cfg = config();
        cfg.environment = ConnectEnvironment::Production;
        let client = ConnectClient::new(cfg).with_base_url(&base);

        let token = client.create_connect_token("user-7").await.unwrap();
        assert_eq!(token.token, "ctok");

        let requests = server.await.unwrap();
        let req = &requests[1];
        assert_eq!(req.target, "/connect/proj_1/tokens");
        assert_eq!(req.header("x-pd-environment"), Some("production"));
        assert_eq!(req.json(), json!({ "external_user_id": "user-7" }));
    }

    #[tokio::test]
    async fn link_url_sets_app_parameter() {
        let (base, server) = serve(vec![
            grant("at", 3600),
            CannedResponse::json(
                200,
                json!({
                    "token": "ctok",
                    "connect_link_url": "https://pipedream.com/_static/connect.html?token=ctok&app=old"
                }),
            ),
        ])
        .await;
        let client = ConnectClient::new(config()).with_base_url(&base);

        let link = client.connect_link_url("u", "gmail").await.unwrap();
        assert_eq!(
            link,
            "https://pipedream.com/_static/connect.html?token=ctok&app=gmail"
        );
        server.await.unwrap();
    }

    #[test]
    fn link_falls_back_to_hosted_page() {
        let token = ConnectToken {
            token: "ctok".into(),
            ..Default::default()
        };
        assert_eq!(
            link_with_app(&token, "slack").unwrap(),
            "https://pipedream.com/_static/connect.html?token=ctok&app=slack"
        );
    }

    #[tokio::test]
    async fn delete_hits_account_path() {
        let (base, server) = serve(vec![
            grant("at", 3600),
            CannedResponse::bytes(200, "application/json", ""),
            CannedResponse::bytes(404, "application/json", r#"{"error":"not found"}"#),
        ])
        .await;
        let client = ConnectClient::new(config()).with_base_url(&base);

        client.delete_connected_account("apn_1").await.unwrap();
        let err = client.delete_connected_account("apn_2").await.unwrap_err();
        assert!(err.to_string().contains("404"), "{err}");

        let requests = server.await.unwrap();
        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].target, "/connect/proj_1/accounts/apn_1");
    }

    #[tokio::test]
    async fn delete_escapes_account_id() {
        let (base, server) = serve(vec![
            grant("at", 3600),
            CannedResponse::bytes(204, "application/json", ""),
        ])
        .await;
        let client = ConnectClient::new(config()).with_base_url(&base);

        client.delete_connected_account("apn/../x?y=1").await.unwrap();

        let requests = server.await.unwrap();
        assert_eq!(requests[1].target, "/connect/proj_1/accounts/apn%2F..%2Fx%3Fy=1");
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = ConnectClient::new(config());
        let url = client.endpoint(&["connect", "proj_1", "accounts", "a b"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.pipedream.com/v1/connect/proj_1/accounts/a%20b"
        );
    }

    #[tokio::test]
    async fn huge_token_lifetime_is_capped() {
        let (base, server) = serve(vec![
            grant("at-max", u64::MAX),
            CannedResponse::json(200, json!({ "data": [] })),
        ])
        .await;
        let client = ConnectClient::new(config()).with_base_url(&base);

        assert_eq!(client.mcp_access_token().await.unwrap(), "at-max");
        // Still cached: the second call reuses it without another grant.
        assert_eq!(client.mcp_access_token().await.unwrap(), "at-max");
        assert!(client.list_apps("", 0).await.unwrap().is_empty());

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].target.split('?').next(), Some("/apps"));
    }

    #[test]
    fn mcp_config_reflects_project() {
        let client = ConnectClient::new(config());
        let mcp = client.mcp_config();
        assert_eq!(mcp.server_url, MCP_SERVER_URL);
        assert_eq!(mcp.project_id, "proj_1");
        assert_eq!(mcp.environment, ConnectEnvironment::Development);
    }
}

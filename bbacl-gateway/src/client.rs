//! Bitbucket Cloud implementation of the permission gateway

use async_trait::async_trait;
use bbacl_model::{Action, Operation, PermissionGrant, PrincipalKind, ReviewerAccount};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::wire::{GroupPermission, Page, PermissionBody, UserPermission, UserRef};
use crate::{GatewayError, PermissionGateway};

/// Public API root. Pagination links point here even when the gateway is
/// configured with another base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Gateway configuration: where to connect and who to authenticate as
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Configuration against the public API with default timeout
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the API root (trailing slashes are dropped)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Gateway talking to the Bitbucket Cloud REST API
pub struct BitbucketGateway {
    client: Client,
    config: GatewayConfig,
}

impl BitbucketGateway {
    /// Create a new gateway
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bbacl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build an endpoint URL from raw path segments; each segment is
    /// percent-encoded on its own.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn permission_endpoint(
        &self,
        workspace: &str,
        repository: &str,
        kind: PrincipalKind,
        object_id: Option<&str>,
    ) -> Result<Url, GatewayError> {
        let collection = match kind {
            PrincipalKind::User => "users",
            PrincipalKind::Group => "groups",
        };
        let mut segments = vec![
            "repositories",
            workspace,
            repository,
            "permissions-config",
            collection,
        ];
        segments.extend(object_id);
        self.endpoint(&segments)
    }

    fn reviewer_endpoint(
        &self,
        workspace: &str,
        repository: &str,
        reviewer: Option<&str>,
    ) -> Result<Url, GatewayError> {
        let mut segments = vec!["repositories", workspace, repository, "default-reviewers"];
        segments.extend(reviewer);
        self.endpoint(&segments)
    }

    /// Turn a `next` link into a URL under the configured base.
    ///
    /// The scheme and host of the link are discarded, so pagination keeps
    /// working when the gateway points at a proxy or a test server.
    fn resolve_next(&self, next: &str) -> Result<Url, GatewayError> {
        let relative = [self.config.base_url.as_str(), DEFAULT_BASE_URL]
            .iter()
            .find_map(|prefix| next.strip_prefix(prefix))
            .map(str::to_string);

        let relative = match relative {
            Some(rest) => rest,
            None => {
                let link = Url::parse(next)?;
                let base = Url::parse(&self.config.base_url)?;
                let root = base.path().trim_end_matches('/');
                let path = link.path().strip_prefix(root).unwrap_or(link.path());
                match link.query() {
                    Some(query) => format!("{}?{}", path, query),
                    None => path.to_string(),
                }
            }
        };

        Ok(Url::parse(&format!("{}{}", self.config.base_url, relative))?)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&PermissionBody>,
    ) -> Result<String, GatewayError> {
        tracing::debug!(%method, path = url.path(), "request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() >= 400 {
            let err = GatewayError::http(status, &text);
            tracing::debug!(status = status.as_u16(), error = %err, "request failed");
            return Err(err);
        }
        Ok(text)
    }

    /// Walk a cursor-paginated listing until no `next` link is returned
    async fn walk<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, GatewayError> {
        let mut values = Vec::new();
        let mut next = Some(first);
        let mut pages = 0usize;

        while let Some(url) = next {
            let context = url.path().to_string();
            let body = self.send(Method::GET, url, None).await?;
            let page: Page<T> =
                serde_json::from_str(&body).map_err(|e| GatewayError::decode(&context, e))?;
            pages += 1;

            tracing::trace!(
                path = %context,
                page = pages,
                pagelen = ?page.pagelen,
                size = ?page.size,
                "page received"
            );

            values.extend(page.values);
            next = page.next.as_deref().map(|n| self.resolve_next(n)).transpose()?;
        }

        tracing::debug!(pages, values = values.len(), "listing complete");
        Ok(values)
    }
}

#[async_trait]
impl PermissionGateway for BitbucketGateway {
    async fn fetch_group_grants(
        &self,
        workspace: &str,
        repository: &str,
    ) -> Result<Vec<PermissionGrant>, GatewayError> {
        let url = self.permission_endpoint(workspace, repository, PrincipalKind::Group, None)?;
        let values: Vec<GroupPermission> = self.walk(url).await?;
        Ok(values.into_iter().map(PermissionGrant::from).collect())
    }

    async fn fetch_user_grants(
        &self,
        workspace: &str,
        repository: &str,
    ) -> Result<Vec<PermissionGrant>, GatewayError> {
        let url = self.permission_endpoint(workspace, repository, PrincipalKind::User, None)?;
        let values: Vec<UserPermission> = self.walk(url).await?;
        Ok(values.into_iter().map(PermissionGrant::from).collect())
    }

    async fn apply(
        &self,
        workspace: &str,
        repository: &str,
        operation: &Operation,
    ) -> Result<(), GatewayError> {
        let url = self.permission_endpoint(
            workspace,
            repository,
            operation.kind(),
            Some(operation.object_id()),
        )?;

        match (operation.action(), operation.level_after()) {
            (Action::Add | Action::Update, Some(level)) => {
                let body = PermissionBody { permission: level };
                self.send(Method::PUT, url, Some(&body)).await?;
            }
            (Action::Remove, _) => {
                self.send(Method::DELETE, url, None).await?;
            }
            _ => {
                return Err(GatewayError::NoOp {
                    object_id: operation.object_id().to_string(),
                })
            }
        }
        Ok(())
    }

    async fn list_default_reviewers(
        &self,
        workspace: &str,
        repository: &str,
    ) -> Result<Vec<ReviewerAccount>, GatewayError> {
        let url = self.reviewer_endpoint(workspace, repository, None)?;
        let values: Vec<UserRef> = self.walk(url).await?;
        Ok(values.into_iter().map(ReviewerAccount::from).collect())
    }

    async fn add_default_reviewer(
        &self,
        workspace: &str,
        repository: &str,
        reviewer: &str,
    ) -> Result<(), GatewayError> {
        let url = self.reviewer_endpoint(workspace, repository, Some(reviewer))?;
        self.send(Method::PUT, url, None).await?;
        Ok(())
    }

    async fn remove_default_reviewer(
        &self,
        workspace: &str,
        repository: &str,
        reviewer: &str,
    ) -> Result<(), GatewayError> {
        let url = self.reviewer_endpoint(workspace, repository, Some(reviewer))?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base_url: &str) -> BitbucketGateway {
        BitbucketGateway::new(GatewayConfig::new("user", "pass").with_base_url(base_url)).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_braced_ids() {
        let gw = gateway(DEFAULT_BASE_URL);
        let url = gw
            .permission_endpoint("ws", "repo", PrincipalKind::User, Some("{abcd-1234}"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.bitbucket.org/2.0/repositories/ws/repo/permissions-config/users/%7Babcd-1234%7D"
        );
    }

    #[test]
    fn test_reviewer_endpoint() {
        let gw = gateway("http://localhost:8080/");
        let url = gw.reviewer_endpoint("ws", "repo", None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/repositories/ws/repo/default-reviewers"
        );
    }

    #[test]
    fn test_next_link_from_public_api_is_rebased() {
        let gw = gateway("http://127.0.0.1:9000");
        let url = gw
            .resolve_next("https://api.bitbucket.org/2.0/repositories/ws/repo/permissions-config/groups?page=2")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/repositories/ws/repo/permissions-config/groups?page=2"
        );
    }

    #[test]
    fn test_next_link_from_foreign_host_keeps_path_and_query() {
        let gw = gateway(DEFAULT_BASE_URL);
        let url = gw
            .resolve_next("https://mirror.example.com/2.0/repositories/ws/repo/default-reviewers?page=3")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.bitbucket.org/2.0/repositories/ws/repo/default-reviewers?page=3"
        );
    }
}

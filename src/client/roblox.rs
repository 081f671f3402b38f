//! HTTP client for the Roblox users and groups web APIs.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rank::{GroupService, Role, RobloxUser, ServiceError};

/// Header carrying the anti-forgery token required on writes.
const CSRF_HEADER: &str = "x-csrf-token";

/// Request to look users up by username.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsernamesRequest<'a> {
    usernames: [&'a str; 1],
    exclude_banned_users: bool,
}

/// One match from a username lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameMatch {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: Vec<T>,
}

/// A role as returned by the groups API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub id: u64,
    pub name: String,
    pub rank: u8,
}

impl From<RoleResponse> for Role {
    fn from(role: RoleResponse) -> Self {
        Role {
            id: role.id,
            rank: role.rank,
            name: role.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GroupRolesResponse {
    roles: Vec<RoleResponse>,
}

#[derive(Debug, Deserialize)]
struct GroupRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct MembershipResponse {
    group: GroupRef,
    role: RoleResponse,
}

/// Body of a rank change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetRoleRequest {
    role_id: u64,
}

/// The account behind the session cookie.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// Cookie-authenticated client for the Roblox web APIs.
#[derive(Debug)]
pub struct RobloxClient {
    client: Client,
    users_url: String,
    groups_url: String,
    cookie: String,
    csrf_token: Mutex<Option<String>>,
}

impl RobloxClient {
    /// Create a new client using the given session cookie.
    pub fn new(users_url: &str, groups_url: &str, cookie: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("group-ranker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            users_url: users_url.trim_end_matches('/').to_string(),
            groups_url: groups_url.trim_end_matches('/').to_string(),
            cookie: format!(".ROBLOSECURITY={}", cookie.trim()),
            csrf_token: Mutex::new(None),
        })
    }

    /// Check that the session cookie is valid.
    pub async fn authenticated_user(&self) -> Result<AuthenticatedUser> {
        let url = format!("{}/v1/users/authenticated", self.users_url);
        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("Failed to connect to Roblox")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Roblox login failed ({}): {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse authenticated user response")
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::COOKIE, &self.cookie)
    }

    fn current_csrf(&self) -> Option<String> {
        self.csrf_token.lock().ok().and_then(|token| token.clone())
    }

    fn store_csrf(&self, token: String) {
        if let Ok(mut slot) = self.csrf_token.lock() {
            *slot = Some(token);
        }
    }

    async fn send_write(&self, url: &str, body: &SetRoleRequest) -> Result<Response, ServiceError> {
        let mut request = self.authed(self.client.patch(url)).json(body);
        if let Some(token) = self.current_csrf() {
            request = request.header(CSRF_HEADER, token);
        }
        request.send().await.map_err(transport_error)
    }
}

#[async_trait]
impl GroupService for RobloxClient {
    async fn resolve_username(&self, username: &str) -> Result<RobloxUser, ServiceError> {
        let url = format!("{}/v1/usernames/users", self.users_url);
        let request = UsernamesRequest {
            usernames: [username],
            exclude_banned_users: false,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let found: DataResponse<UsernameMatch> = read_json(response).await?;
        found
            .data
            .into_iter()
            .next()
            .map(|user| RobloxUser {
                id: user.id,
                name: user.name,
            })
            .ok_or(ServiceError::NotFound)
    }

    async fn rank_in_group(&self, group_id: u64, user_id: u64) -> Result<u8, ServiceError> {
        let url = format!("{}/v2/users/{}/groups/roles", self.groups_url, user_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        let memberships: DataResponse<MembershipResponse> = read_json(response).await?;
        Ok(membership_rank(&memberships.data, group_id))
    }

    async fn list_roles(&self, group_id: u64) -> Result<Vec<Role>, ServiceError> {
        let url = format!("{}/v1/groups/{}/roles", self.groups_url, group_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        let table: GroupRolesResponse = read_json(response).await?;
        Ok(table.roles.into_iter().map(Role::from).collect())
    }

    async fn set_rank(&self, group_id: u64, user_id: u64, role: &Role) -> Result<(), ServiceError> {
        let url = format!("{}/v1/groups/{}/users/{}", self.groups_url, group_id, user_id);
        let body = SetRoleRequest { role_id: role.id };

        let mut response = self.send_write(&url, &body).await?;

        // A stale or missing token is answered with 403 and a fresh token.
        if response.status() == StatusCode::FORBIDDEN {
            let fresh = response
                .headers()
                .get(CSRF_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if let Some(token) = fresh {
                debug!("Refreshing CSRF token");
                self.store_csrf(token);
                response = self.send_write(&url, &body).await?;
            }
        }

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Rank write returned {}: {}", status, body);
        Err(classify_write(status, body))
    }
}

/// Rank held in `group_id`, or 0 when the user is not a member.
fn membership_rank(memberships: &[MembershipResponse], group_id: u64) -> u8 {
    memberships
        .iter()
        .find(|m| m.group.id == group_id)
        .map(|m| m.role.rank)
        .unwrap_or(0)
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    ServiceError::Unavailable(e.to_string())
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Map a failed read to a service error.
fn classify_read(status: StatusCode, body: String) -> ServiceError {
    if is_transient(status) {
        ServiceError::Unavailable(format!("{}: {}", status, body))
    } else if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
        ServiceError::NotFound
    } else {
        ServiceError::Rejected(format!("{}: {}", status, body))
    }
}

/// Map a failed write to a service error.
fn classify_write(status: StatusCode, body: String) -> ServiceError {
    if is_transient(status) {
        ServiceError::Unavailable(format!("{}: {}", status, body))
    } else if status == StatusCode::NOT_FOUND {
        ServiceError::NotFound
    } else {
        ServiceError::Rejected(format!("{}: {}", status, body))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_read(status, body));
    }

    response
        .json()
        .await
        .map_err(|e| ServiceError::Unavailable(format!("malformed response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_rank() {
        let body = r#"{"data":[
            {"group":{"id":7,"name":"Other"},"role":{"id":70,"name":"Fan","rank":1}},
            {"group":{"id":4200,"name":"Ours"},"role":{"id":99,"name":"Captain","rank":50}}
        ]}"#;
        let memberships: DataResponse<MembershipResponse> = serde_json::from_str(body).unwrap();

        assert_eq!(membership_rank(&memberships.data, 4200), 50);
        assert_eq!(membership_rank(&memberships.data, 1), 0);
    }

    #[test]
    fn test_role_table_parse() {
        let body = r#"{"groupId":4200,"roles":[
            {"id":1,"name":"Guest","rank":0,"memberCount":0},
            {"id":20,"name":"Officer","rank":20,"memberCount":3}
        ]}"#;
        let table: GroupRolesResponse = serde_json::from_str(body).unwrap();
        let roles: Vec<Role> = table.roles.into_iter().map(Role::from).collect();

        assert_eq!(roles.len(), 2);
        assert_eq!(roles[1].id, 20);
        assert_eq!(roles[1].name, "Officer");
        assert!(!roles[0].is_assignable());
    }

    #[test]
    fn test_username_lookup_parse() {
        let body = r#"{"data":[{"requestedUsername":"builderman","hasVerifiedBadge":true,
            "id":156,"name":"builderman","displayName":"builderman"}]}"#;
        let found: DataResponse<UsernameMatch> = serde_json::from_str(body).unwrap();
        assert_eq!(found.data[0].id, 156);

        let empty: DataResponse<UsernameMatch> = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(empty.data.is_empty());
    }

    #[test]
    fn test_set_role_body() {
        let body = serde_json::to_string(&SetRoleRequest { role_id: 20 }).unwrap();
        assert_eq!(body, r#"{"roleId":20}"#);
    }

    #[test]
    fn test_classify_statuses() {
        assert!(matches!(
            classify_write(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            ServiceError::Unavailable(_)
        ));
        assert!(matches!(
            classify_write(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ServiceError::Unavailable(_)
        ));
        assert!(matches!(
            classify_write(StatusCode::FORBIDDEN, String::new()),
            ServiceError::Rejected(_)
        ));
        assert!(matches!(
            classify_write(StatusCode::BAD_REQUEST, String::new()),
            ServiceError::Rejected(_)
        ));
        assert_eq!(
            classify_read(StatusCode::BAD_REQUEST, String::new()),
            ServiceError::NotFound
        );
        assert_eq!(
            classify_read(StatusCode::NOT_FOUND, String::new()),
            ServiceError::NotFound
        );
        // An expired session is a credential problem, not a missing user.
        assert!(matches!(
            classify_read(StatusCode::UNAUTHORIZED, String::new()),
            ServiceError::Rejected(_)
        ));
        assert!(matches!(
            classify_read(StatusCode::FORBIDDEN, String::new()),
            ServiceError::Rejected(_)
        ));
    }
}

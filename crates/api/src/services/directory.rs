//! HTTP client for the upstream user and club directories.
//!
//! Every call runs under a per-attempt timeout and is retried with
//! exponential backoff while the failure is transient. A 404 counts as
//! transient: a user or club that was just created may not have reached
//! the directory replica yet.

use async_trait::async_trait;
use domain::models::{Club, Permission, User};
use domain::ports::{Directory, DirectoryResult};
use domain::DirectoryError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::{ClubId, UserId};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::middleware::metrics::record_directory_retry;

const USER_SERVICE: &str = "user";
const CLUB_SERVICE: &str = "club";

#[derive(Debug, Deserialize)]
struct MembershipResponse {
    is_member: bool,
}

#[derive(Debug, Deserialize)]
struct BanResponse {
    is_banned: bool,
}

#[derive(Debug, Deserialize)]
struct PermissionResponse {
    has_permission: bool,
}

/// Outcome of a single attempt that did not succeed.
#[derive(Debug)]
struct AttemptError {
    error: DirectoryError,
    retryable: bool,
}

impl AttemptError {
    fn transient(error: DirectoryError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn permanent(error: DirectoryError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

/// Classifies a non-success HTTP status.
fn classify_status(status: StatusCode, body: String) -> AttemptError {
    match status {
        StatusCode::NOT_FOUND => AttemptError::transient(DirectoryError::NotFound),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AttemptError::permanent(DirectoryError::InvalidArgument(body))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_MANY_REQUESTS => {
            AttemptError::transient(DirectoryError::Unavailable(format!("HTTP {}", status)))
        }
        s if s.is_server_error() => {
            AttemptError::transient(DirectoryError::Unavailable(format!("HTTP {}: {}", s, body)))
        }
        s => AttemptError::permanent(DirectoryError::Unavailable(format!("HTTP {}: {}", s, body))),
    }
}

/// Delay before retry number `retry` (1-based).
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(1u32 << retry.saturating_sub(1).min(16))
}

/// [`Directory`] backed by the user and club services' HTTP APIs.
#[derive(Clone)]
pub struct HttpDirectory {
    client: Client,
    config: DirectoryConfig,
}

impl HttpDirectory {
    pub fn new(config: DirectoryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    fn user_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1{}",
            self.config.user_service_url.trim_end_matches('/'),
            path
        )
    }

    fn club_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1{}",
            self.config.club_service_url.trim_end_matches('/'),
            path
        )
    }

    async fn attempt<T: DeserializeOwned>(&self, url: &str) -> Result<T, AttemptError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                AttemptError::transient(DirectoryError::Unavailable(e.to_string()))
            } else {
                AttemptError::permanent(DirectoryError::Unavailable(e.to_string()))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        response.json::<T>().await.map_err(|e| {
            AttemptError::permanent(DirectoryError::Unavailable(format!(
                "invalid response: {}",
                e
            )))
        })
    }

    /// GETs `url`, retrying transient failures up to `max_attempts` times.
    async fn get<T: DeserializeOwned>(&self, service: &'static str, url: String) -> DirectoryResult<T> {
        let max_attempts = self.config.max_attempts.max(1);
        let base = Duration::from_millis(self.config.backoff_base_ms);
        let mut attempt = 1;

        loop {
            match self.attempt(&url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.retryable && attempt < max_attempts => {
                    let delay = backoff_delay(base, attempt);
                    debug!(
                        service = service,
                        url = %url,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e.error,
                        "Retrying directory call"
                    );
                    record_directory_retry(service);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if !matches!(e.error, DirectoryError::NotFound) {
                        warn!(
                            service = service,
                            url = %url,
                            attempts = attempt,
                            error = %e.error,
                            "Directory call failed"
                        );
                    }
                    return Err(e.error);
                }
            }
        }
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn get_user(&self, user_id: UserId) -> DirectoryResult<User> {
        self.get(USER_SERVICE, self.user_url(&format!("/users/{}", user_id)))
            .await
    }

    async fn get_club(&self, club_id: ClubId) -> DirectoryResult<Club> {
        self.get(CLUB_SERVICE, self.club_url(&format!("/clubs/{}", club_id)))
            .await
    }

    async fn is_club_member(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool> {
        let response: MembershipResponse = self
            .get(
                CLUB_SERVICE,
                self.club_url(&format!("/clubs/{}/members/{}", club_id, user_id)),
            )
            .await?;
        Ok(response.is_member)
    }

    async fn is_banned_in_club(&self, user_id: UserId, club_id: ClubId) -> DirectoryResult<bool> {
        let response: BanResponse = self
            .get(
                CLUB_SERVICE,
                self.club_url(&format!("/clubs/{}/bans/{}", club_id, user_id)),
            )
            .await?;
        Ok(response.is_banned)
    }

    async fn has_permission(
        &self,
        user_id: UserId,
        club_id: ClubId,
        permission: Permission,
    ) -> DirectoryResult<bool> {
        let response: PermissionResponse = self
            .get(
                CLUB_SERVICE,
                self.club_url(&format!(
                    "/clubs/{}/members/{}/permissions/{}",
                    club_id, user_id, permission
                )),
            )
            .await?;
        Ok(response.has_permission)
    }
}

//! iBroadcast JSON API: login, library fetch and stream URLs.

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{ApiConfig, Credentials};
use crate::error::ApiError;
use crate::normalize::id_string;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    pub token: String,
    pub user_id: String,
}

/// Where the data manager gets raw library payloads from.
pub trait LibrarySource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    result: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<UserInfo>,
}

#[derive(Deserialize)]
struct UserInfo {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    id: Value,
}

pub struct Session {
    client: reqwest::Client,
    api: ApiConfig,
    credentials: Credentials,
    login: RwLock<Option<Login>>,
}

impl Session {
    pub fn new(api: ApiConfig, credentials: Credentials) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", api.client, api.version))
            .timeout(Duration::from_secs(api.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            api,
            credentials,
            login: RwLock::new(None),
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.username.as_deref()
    }

    pub async fn current_login(&self) -> Option<Login> {
        self.login.read().await.clone()
    }

    /// Adopt a previously stored login instead of authenticating again.
    pub async fn restore(&self, login: Login) {
        *self.login.write().await = Some(login);
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Login, ApiError> {
        let (Some(username), Some(password)) = (
            credentials.username.as_deref(),
            credentials.password.as_deref(),
        ) else {
            return Err(ApiError::MissingCredentials);
        };

        let body = json!({
            "mode": "status",
            "email_address": username,
            "password": password,
            "version": self.api.version,
            "client": self.api.client,
            "device_name": self.api.device_name,
            "supported_types": false,
        });
        debug!("logging in as {}", username);
        let value = self.post_json(&self.api.base_url, &body).await?;
        let login = parse_login(value)?;
        info!("logged in as user {}", login.user_id);
        *self.login.write().await = Some(login.clone());
        Ok(login)
    }

    /// Log in with the configured credentials.
    pub async fn relogin(&self) -> Result<Login, ApiError> {
        self.login(&self.credentials).await
    }

    pub async fn fetch_library(&self) -> Result<Value, ApiError> {
        let login = self.current_login().await.ok_or(ApiError::NotLoggedIn)?;
        let body = json!({
            "mode": "library",
            "_token": login.token,
            "_userid": login.user_id,
            "version": self.api.version,
            "client": self.api.client,
            "device_name": self.api.device_name,
            "supported_types": false,
        });
        let started = std::time::Instant::now();
        let value = self.post_json(&self.api.library_url, &body).await?;
        if value.get("authenticated").and_then(Value::as_bool) == Some(false) {
            return Err(ApiError::Unauthorized);
        }
        if value.get("result").and_then(Value::as_bool) == Some(false) {
            return Err(ApiError::Rejected(message_of(&value)));
        }
        info!("fetched library in {:?}", started.elapsed());
        Ok(value)
    }

    /// Fetch, and on `Unauthorized` log in again and retry exactly once.
    pub async fn fetch_library_with_reauth(&self) -> Result<Value, ApiError> {
        retry_once_unauthorized(|| self.fetch_library(), || self.relogin()).await
    }

    pub async fn stream_url(
        &self,
        track_id: &str,
        path_hint: Option<&str>,
    ) -> Result<String, ApiError> {
        // a cache-only start never logged in
        let login = current_or_login(self.current_login().await, || self.relogin()).await?;
        let expires = chrono::Utc::now().timestamp_millis();
        build_stream_url(&self.api, &login, track_id, path_hint, expires)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            warn!("{} returned {}", url, status);
            return Err(ApiError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl LibrarySource for Session {
    fn fetch(&self) -> impl Future<Output = Result<Value, ApiError>> + Send {
        self.fetch_library_with_reauth()
    }
}

/// Run `attempt`; if it is unauthorized, run `relogin` and then `attempt`
/// one more time. Any other outcome is returned as is.
pub(crate) async fn retry_once_unauthorized<T, A, AFut, R, RFut, L>(
    mut attempt: A,
    relogin: R,
) -> Result<T, ApiError>
where
    A: FnMut() -> AFut,
    AFut: Future<Output = Result<T, ApiError>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<L, ApiError>>,
{
    match attempt().await {
        Err(ApiError::Unauthorized | ApiError::NotLoggedIn) => {
            info!("session not authorized, logging in again");
            relogin().await?;
            attempt().await
        }
        other => other,
    }
}

/// The existing login, or the result of `login` when there is none.
pub(crate) async fn current_or_login<F, Fut>(
    current: Option<Login>,
    login: F,
) -> Result<Login, ApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Login, ApiError>>,
{
    match current {
        Some(login) => Ok(login),
        None => {
            info!("no session yet, logging in");
            login().await
        }
    }
}

fn parse_login(value: Value) -> Result<Login, ApiError> {
    let message = message_of(&value);
    let status: StatusResponse = serde_json::from_value(value)?;
    if !status.result {
        return Err(ApiError::Rejected(status.message.unwrap_or(message)));
    }
    let user = status
        .user
        .ok_or_else(|| ApiError::Rejected("response has no user".into()))?;
    let token = user
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Rejected("response has no token".into()))?;
    let user_id = id_string(&user.id)
        .ok_or_else(|| ApiError::Rejected("response has no user id".into()))?;
    Ok(Login { token, user_id })
}

fn message_of(value: &Value) -> String {
    value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request rejected")
        .to_string()
}

/// `{streaming_url}/{path}?Expires=..&Signature=..&file=..&user_id=..&platform=..&version=..`
pub fn build_stream_url(
    api: &ApiConfig,
    login: &Login,
    track_id: &str,
    path_hint: Option<&str>,
    expires: i64,
) -> Result<String, ApiError> {
    let path = path_hint
        .map(|p| p.trim_start_matches('/'))
        .filter(|p| !p.is_empty())
        .unwrap_or(track_id);
    let base = format!("{}/{}", api.streaming_url.trim_end_matches('/'), path);
    let expires = expires.to_string();
    let url = Url::parse_with_params(
        &base,
        &[
            ("Expires", expires.as_str()),
            ("Signature", login.token.as_str()),
            ("file", track_id),
            ("user_id", login.user_id.as_str()),
            ("platform", api.client.as_str()),
            ("version", api.version.as_str()),
        ],
    )
    .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn login_response_is_parsed() {
        let login = parse_login(json!({
            "result": true,
            "user": {"token": "abc", "id": 42, "username": "me"}
        }))
        .unwrap();
        assert_eq!(login.token, "abc");
        assert_eq!(login.user_id, "42");
    }

    #[test]
    fn rejected_login_carries_message() {
        let err = parse_login(json!({"result": false, "message": "bad password"})).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "bad password"));
    }

    #[test]
    fn login_without_token_is_rejected() {
        let err = parse_login(json!({"result": true, "user": {"id": 1}})).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(_)));
    }

    #[test]
    fn stream_url_encodes_parameters() {
        let api = ApiConfig::default();
        let login = Login {
            token: "t o/k".into(),
            user_id: "7".into(),
        };
        let url = build_stream_url(&api, &login, "101", None, 1000).unwrap();
        assert!(url.starts_with("https://streaming.ibroadcast.com/101?"));
        assert!(url.contains("Expires=1000"));
        assert!(url.contains("Signature=t+o%2Fk"));
        assert!(url.contains("file=101"));
        assert!(url.contains("user_id=7"));

        let hinted = build_stream_url(&api, &login, "101", Some("/128/abc/101"), 1).unwrap();
        assert!(hinted.starts_with("https://streaming.ibroadcast.com/128/abc/101?"));
    }

    #[tokio::test]
    async fn missing_login_is_obtained_first() {
        let logins = &AtomicUsize::new(0);
        let login = current_or_login(None, move || async move {
            logins.fetch_add(1, Ordering::SeqCst);
            Ok(Login {
                token: "fresh".into(),
                user_id: "7".into(),
            })
        })
        .await
        .unwrap();
        assert_eq!(login.token, "fresh");
        assert_eq!(logins.load(Ordering::SeqCst), 1);

        let existing = Login {
            token: "kept".into(),
            user_id: "7".into(),
        };
        let login = current_or_login(Some(existing.clone()), move || async move {
            logins.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::Unauthorized)
        })
        .await
        .unwrap();
        assert_eq!(login, existing);
        assert_eq!(logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_url_without_login_tries_to_log_in() {
        let session = Session::new(ApiConfig::default(), Credentials::default()).unwrap();
        let err = session.stream_url("7", None).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingCredentials));

        session
            .restore(Login {
                token: "tok".into(),
                user_id: "1".into(),
            })
            .await;
        let url = session.stream_url("7", None).await.unwrap();
        assert!(url.contains("Signature=tok"));
    }

    #[tokio::test]
    async fn unauthorized_is_retried_once() {
        let attempts = &AtomicUsize::new(0);
        let relogins = &AtomicUsize::new(0);
        let result = retry_once_unauthorized(
            move || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::Unauthorized)
                } else {
                    Ok(json!({"library": {}}))
                }
            },
            move || async move {
                relogins.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>(())
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(relogins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_unauthorized_is_returned() {
        let attempts = &AtomicUsize::new(0);
        let result: Result<Value, _> = retry_once_unauthorized(
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Unauthorized)
            },
            || async { Ok::<_, ApiError>(()) },
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_relogin_stops_the_retry() {
        let attempts = &AtomicUsize::new(0);
        let result: Result<Value, _> = retry_once_unauthorized(
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Unauthorized)
            },
            || async { Err::<(), _>(ApiError::MissingCredentials) },
        )
        .await;
        assert!(matches!(result, Err(ApiError::MissingCredentials)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let attempts = &AtomicUsize::new(0);
        let result: Result<Value, _> = retry_once_unauthorized(
            move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Status(500))
            },
            || async { Ok::<_, ApiError>(()) },
        )
        .await;
        assert!(matches!(result, Err(ApiError::Status(500))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

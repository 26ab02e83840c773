use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use reqwest::blocking::{multipart, Client as HttpClient, RequestBuilder};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::model::{AuthResponse, Channel, Comment, Like, Notification, Post, User};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5006/";

pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("api: not signed in")]
    MissingToken,
    #[error("api: unauthorized")]
    Unauthorized,
    #[error("api: request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("api: unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("api: invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api: transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

pub enum Body {
    Empty,
    Json(Value),
    Multipart(multipart::Form),
}

pub struct Client {
    token_provider: Arc<dyn TokenProvider>,
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(token_provider: Arc<dyn TokenProvider>, config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("api client user agent required");
        }
        let mut base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url.trim().to_string()
        };
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            token_provider,
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    /// Anonymous request.
    pub fn fetch<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let req = self.build(method, path, query, body)?;
        let text = self.execute(path, req)?;
        decode(path, &text)
    }

    /// Request carrying the session's bearer token. Fails without touching
    /// the network when nobody is signed in.
    pub fn auth_fetch<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let req = self.authorized(method, path, query, body)?;
        let text = self.execute(path, req)?;
        decode(path, &text)
    }

    pub fn channels(&self) -> Result<Vec<Channel>, ApiError> {
        self.fetch(Method::GET, "channels", &[], Body::Empty)
    }

    pub fn channel_posts(&self, channel_id: &str, page: Option<Page>) -> Result<Vec<Post>, ApiError> {
        let path = format!("posts/channel/{channel_id}");
        let query = page
            .map(|page| {
                vec![
                    ("offset", page.offset.to_string()),
                    ("limit", page.limit.to_string()),
                ]
            })
            .unwrap_or_default();
        self.fetch(Method::GET, &path, &query, Body::Empty)
    }

    pub fn post(&self, post_id: &str) -> Result<Post, ApiError> {
        self.fetch(Method::GET, &format!("posts/{post_id}"), &[], Body::Empty)
    }

    pub fn create_post(&self, channel_id: &str, title: &str) -> Result<Post, ApiError> {
        let form = multipart::Form::new()
            .text("title", title.to_string())
            .text("channelId", channel_id.to_string());
        self.auth_fetch(Method::POST, "posts/create", &[], Body::Multipart(form))
    }

    pub fn update_post(&self, post_id: &str, channel_id: &str, title: &str) -> Result<Post, ApiError> {
        let form = multipart::Form::new()
            .text("postId", post_id.to_string())
            .text("title", title.to_string())
            .text("channelId", channel_id.to_string());
        self.auth_fetch(Method::PUT, "posts/update", &[], Body::Multipart(form))
    }

    pub fn create_comment(&self, post_id: &str, text: &str) -> Result<Comment, ApiError> {
        let body = json!({ "comment": text, "postId": post_id });
        self.auth_fetch(Method::POST, "comments/create", &[], Body::Json(body))
    }

    pub fn delete_comment(&self, comment_id: &str) -> Result<Comment, ApiError> {
        let body = json!({ "id": comment_id });
        self.auth_fetch(Method::DELETE, "comments/delete", &[], Body::Json(body))
    }

    pub fn create_like(&self, post_id: &str) -> Result<Like, ApiError> {
        let body = json!({ "postId": post_id });
        self.auth_fetch(Method::POST, "likes/create", &[], Body::Json(body))
    }

    pub fn delete_like(&self, like_id: &str) -> Result<Like, ApiError> {
        let body = json!({ "id": like_id });
        self.auth_fetch(Method::DELETE, "likes/delete", &[], Body::Json(body))
    }

    pub fn create_notification(&self, notification: &Notification) -> Result<(), ApiError> {
        let body = serde_json::to_value(notification).map_err(|source| ApiError::Decode {
            path: "notifications/create".into(),
            source,
        })?;
        let req = self.authorized(Method::POST, "notifications/create", &[], Body::Json(body))?;
        self.execute("notifications/create", req)?;
        Ok(())
    }

    pub fn update_user(&self, full_name: &str, username: &str) -> Result<User, ApiError> {
        let body = json!({ "fullName": full_name, "username": username });
        self.auth_fetch(Method::PUT, "settings/update-user", &[], Body::Json(body))
    }

    pub fn user(&self, user_id: &str) -> Result<User, ApiError> {
        self.fetch(Method::GET, &format!("users/{user_id}"), &[], Body::Empty)
    }

    pub fn auth_user(&self) -> Result<User, ApiError> {
        self.auth_fetch(Method::GET, "auth-user", &[], Body::Empty)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = json!({ "email": email, "password": password });
        self.fetch(Method::POST, "login", &[], Body::Json(body))
    }

    pub fn signup(&self, email: &str, full_name: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = json!({ "email": email, "fullName": full_name, "password": password });
        self.fetch(Method::POST, "signup", &[], Body::Json(body))
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        let req = self.authorized(Method::POST, "logout", &[], Body::Empty)?;
        self.execute("logout", req)?;
        Ok(())
    }

    fn authorized(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<RequestBuilder, ApiError> {
        let token = self.token_provider.token().ok_or(ApiError::MissingToken)?;
        Ok(self
            .build(method, path, query, body)?
            .header(AUTHORIZATION, format!("Bearer {token}")))
    }

    fn build(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<RequestBuilder, ApiError> {
        let mut url = self.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }

        debug!(%method, %url, "api request");
        let req = self
            .http
            .request(method, url)
            .header(USER_AGENT, self.user_agent.clone());
        Ok(match body {
            Body::Empty => req,
            Body::Json(value) => req.json(&value),
            Body::Multipart(form) => req.multipart(form),
        })
    }

    fn execute(&self, path: &str, req: RequestBuilder) -> Result<String, ApiError> {
        let resp = req.send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.text()?);
        }
        let body = resp.text().unwrap_or_default();
        warn!(path, %status, "api request rejected");
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            _ => Err(ApiError::Status { status, body }),
        }
    }
}

fn decode<T: DeserializeOwned>(path: &str, text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

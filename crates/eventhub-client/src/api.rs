use eventhub_core::types::{Event, Role, Rsvp};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::session::{Session, SessionUser};

#[derive(Deserialize)]
struct AuthBody {
    id: String,
    email: String,
    role: Role,
    token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Thin REST client for the gateway's JSON API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({ "email": email, "password": password });
        let auth: AuthBody = self.post("/login", &body).await?;
        Ok(to_session(auth))
    }

    pub async fn signup(&self, email: &str, password: &str, role: Option<Role>) -> Result<Session> {
        let body = json!({ "email": email, "password": password, "role": role });
        let auth: AuthBody = self.post("/signup", &body).await?;
        Ok(to_session(auth))
    }

    pub async fn events(&self) -> Result<Vec<Event>> {
        self.get("/events").await
    }

    pub async fn my_rsvps(&self) -> Result<Vec<Rsvp>> {
        self.get("/my-rsvps").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut req = self.http.get(format!("{}{}", self.base, path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        decode(req.send().await?).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        let mut req = self.http.post(format!("{}{}", self.base, path)).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        decode(req.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    debug!(status = status.as_u16(), url = %resp.url(), "api response");
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(api_error(status, &text))
}

fn api_error(status: StatusCode, text: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(text)
        .map(|b| b.error)
        .unwrap_or_else(|_| text.to_string());
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

fn to_session(auth: AuthBody) -> Session {
    Session {
        user: SessionUser {
            id: auth.id,
            email: auth.email,
            role: auth.role,
        },
        token: auth.token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_message_is_extracted() {
        let err = api_error(StatusCode::FORBIDDEN, r#"{"error":"Only ADMIN can approve events"}"#);
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Only ADMIN can approve events");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_kept_verbatim() {
        let err = api_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "API error (502): upstream down");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://localhost:3000/api/");
        assert_eq!(api.base, "http://localhost:3000/api");
    }
}

//! HTTP implementation of the API client.
//!
//! Endpoint paths are relative to the configured base URL. Non-success answers
//! become [`SessionError::Rejected`] carrying the server message when the body
//! has one (`message`, `error` or `errors`), otherwise a per-call fallback.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::SessionApi;
use crate::config::Config;
use crate::errors::{SessionError, SessionResult};
use crate::models::{
    AuthResponse, Authenticated, Company, LoginRequest, MemberData, MembershipRequest,
    RegistrationRequest, UserAccount,
};

/// Status and optional body of a `DELETE` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResponse {
    pub status: u16,
    pub data: Option<Value>,
}

pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
    bearer_token: RwLock<Option<String>>,
}

impl HttpApiClient {
    pub fn new(config: &Config) -> SessionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url: config.api_base_url.clone(),
            client,
            bearer_token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        let token = self
            .bearer_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match token {
            Some(token) => builder.header(AUTHORIZATION, token),
            None => builder,
        }
    }

    /// `GET` a JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SessionResult<T> {
        let response = self.request(Method::GET, path).send().await?;
        decode_json(response, "Request failed").await
    }

    /// `POST` a JSON body and decode the JSON answer.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> SessionResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.request(Method::POST, path).json(body).send().await?;
        decode_json(response, "Request failed").await
    }

    /// `PATCH` a JSON body and decode the JSON answer.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> SessionResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.request(Method::PATCH, path).json(body).send().await?;
        decode_json(response, "Request failed").await
    }

    /// `PUT` a JSON body and decode the JSON answer.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> SessionResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        decode_json(response, "Request failed").await
    }

    /// `DELETE` a resource. The status is reported whatever it is; the body is
    /// decoded only when `with_body` is set and the body is not empty.
    pub async fn delete(&self, path: &str, with_body: bool) -> SessionResult<DeleteResponse> {
        let response = self.request(Method::DELETE, path).send().await?;
        let status = response.status().as_u16();
        let data = if with_body {
            let text = response.text().await?;
            if text.trim().is_empty() {
                None
            } else {
                Some(serde_json::from_str(&text)?)
            }
        } else {
            None
        };
        Ok(DeleteResponse { status, data })
    }

    async fn authenticate<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> SessionResult<Authenticated> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let token = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body: AuthResponse = decode_json(response, fallback).await?;
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SessionError::decode("Authorization header missing from response"))?;

        Ok(Authenticated {
            response: body,
            token,
        })
    }
}

/// Decodes a JSON answer, turning non-success statuses into `Rejected`.
async fn decode_json<T: DeserializeOwned>(response: Response, fallback: &str) -> SessionResult<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = extract_error_message(&text).unwrap_or_else(|| fallback.to_string());
        tracing::debug!("Request rejected with {}: {}", status, message);
        return Err(SessionError::rejected(status.as_u16(), message));
    }

    serde_json::from_str(&text).map_err(|e| SessionError::decode(e.to_string()))
}

/// Pulls a human-readable message out of an error body.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    for field in ["message", "error"] {
        if let Some(message) = value.get(field).and_then(Value::as_str) {
            if !message.is_empty() {
                return Some(message.to_string());
            }
        }
    }

    match value.get("errors")? {
        Value::String(message) => Some(message.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!messages.is_empty()).then(|| messages.join(", "))
        }
        Value::Object(fields) => {
            let messages: Vec<String> = fields
                .iter()
                .flat_map(|(field, errors)| match errors {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|message| format!("{} {}", field, message))
                        .collect::<Vec<_>>(),
                    Value::String(message) => vec![format!("{} {}", field, message)],
                    _ => Vec::new(),
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join(", "))
        }
        _ => None,
    }
}

#[async_trait]
impl SessionApi for HttpApiClient {
    async fn register(&self, payload: &RegistrationRequest) -> SessionResult<Authenticated> {
        self.authenticate("users", payload, "Error registering user")
            .await
    }

    async fn sign_in(&self, payload: &LoginRequest) -> SessionResult<Authenticated> {
        self.authenticate("users/sign_in", payload, "Invalid email or password")
            .await
    }

    async fn member_data(&self, token: &str) -> SessionResult<MemberData> {
        let response = self
            .client
            .get(self.url("member_data"))
            .header(AUTHORIZATION, token)
            .send()
            .await?;
        decode_json(response, "Error logging in with token").await
    }

    async fn validated_companies(&self, user_id: i64) -> SessionResult<Vec<Company>> {
        self.get_json(&format!("accounts/{}/validated_companies_accounts", user_id))
            .await
    }

    async fn fetch_account(&self, user_id: i64, company_id: i64) -> SessionResult<UserAccount> {
        self.get_json(&format!(
            "accounts/{}/companies/{}/fetch_account",
            user_id, company_id
        ))
        .await
    }

    async fn pending_requests(&self, user_id: i64) -> SessionResult<Vec<MembershipRequest>> {
        self.get_json(&format!("accounts/{}/pending_requests", user_id))
            .await
    }

    async fn access_requests(&self, user_id: i64) -> SessionResult<Vec<MembershipRequest>> {
        self.get_json(&format!("accounts/{}/access_requests", user_id))
            .await
    }

    fn set_bearer_token(&self, token: Option<&str>) {
        let mut bearer = self.bearer_token.write().unwrap_or_else(|e| e.into_inner());
        *bearer = token.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::models::{MembershipStatus, NewUser};
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{delete, get, patch, post};
    use axum::{Json, Router};
    use serde_json::json;

    async fn sign_in(Json(body): Json<Value>) -> AxumResponse {
        if body["user"]["password"] == "secret" {
            (
                [(header::AUTHORIZATION, "Bearer issued-token")],
                Json(json!({
                    "user": {"id": 7, "username": "ops", "email": "ops@acme.fr"},
                    "message": "Signed in"
                })),
            )
                .into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid Email or password."})),
            )
                .into_response()
        }
    }

    async fn register() -> AxumResponse {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"errors": {"email": ["has already been taken"]}})),
        )
            .into_response()
    }

    async fn member_data(headers: HeaderMap) -> AxumResponse {
        match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some("sso-token") => Json(json!({
                "resource_owner": {"id": 9, "username": "sso", "email": "sso@acme.fr"},
                "token": "access-1",
                "refresh_token": "refresh-1"
            }))
            .into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn fetch_account(Path((user_id, company_id)): Path<(i64, i64)>) -> Json<Value> {
        Json(json!({
            "id": 1,
            "user_id": user_id,
            "company_id": company_id,
            "status": "accepted",
            "is_owner": company_id == 5
        }))
    }

    async fn companies(headers: HeaderMap) -> AxumResponse {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        Json(json!([
            {"id": 5, "name": "Acme", "bearer": bearer},
            {"id": 6, "name": "Forge"}
        ]))
        .into_response()
    }

    async fn not_json() -> &'static str {
        "<html>oops</html>"
    }

    async fn patch_part(Json(body): Json<Value>) -> Json<Value> {
        Json(json!({"id": 3, "reference": body["reference"]}))
    }

    async fn delete_part() -> AxumResponse {
        (StatusCode::OK, Json(json!({"deleted": true}))).into_response()
    }

    async fn spawn_server() -> String {
        let router = Router::new()
            .route("/api/users", post(register))
            .route("/api/users/sign_in", post(sign_in))
            .route("/api/member_data", get(member_data))
            .route(
                "/api/accounts/{user_id}/companies/{company_id}/fetch_account",
                get(fetch_account),
            )
            .route(
                "/api/accounts/{user_id}/validated_companies_accounts",
                get(companies),
            )
            .route("/api/accounts/{user_id}/pending_requests", get(not_json))
            .route("/api/parts/{id}", patch(patch_part))
            .route("/api/parts/{id}/remove", delete(delete_part));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    async fn client() -> HttpApiClient {
        let base_url = spawn_server().await;
        HttpApiClient::new(&Config::new(base_url)).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_reads_authorization_header() {
        let client = client().await;

        let authenticated = client
            .sign_in(&LoginRequest::new("ops@acme.fr", "secret"))
            .await
            .unwrap();

        assert_eq!(authenticated.token, "Bearer issued-token");
        assert_eq!(authenticated.response.user.id, Some(7));
        assert_eq!(authenticated.response.extra["message"], "Signed in");
    }

    #[tokio::test]
    async fn test_rejected_sign_in_carries_server_message() {
        let client = client().await;

        let error = client
            .sign_in(&LoginRequest::new("ops@acme.fr", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Rejected);
        assert!(matches!(error, SessionError::Rejected { status: 401, .. }));
        assert_eq!(error.user_message(), "Invalid Email or password.");
    }

    #[tokio::test]
    async fn test_register_joins_field_errors() {
        let client = client().await;
        let payload = RegistrationRequest {
            user: NewUser {
                username: "ops".to_string(),
                email: "ops@acme.fr".to_string(),
                password: "secret".to_string(),
                password_confirmation: None,
            },
        };

        let error = client.register(&payload).await.unwrap_err();
        assert_eq!(error.user_message(), "email has already been taken");
    }

    #[tokio::test]
    async fn test_member_data_sends_raw_token() {
        let client = client().await;

        let data = client.member_data("sso-token").await.unwrap();
        assert_eq!(data.token, "access-1");
        assert_eq!(data.resource_owner["id"], 9);

        let error = client.member_data("other").await.unwrap_err();
        assert_eq!(error.user_message(), "Error logging in with token");
    }

    #[tokio::test]
    async fn test_fetch_account_builds_path() {
        let client = client().await;

        let account = client.fetch_account(7, 5).await.unwrap();
        assert_eq!(account.user_id, Some(7));
        assert_eq!(account.company_id, Some(5));
        assert_eq!(account.status, MembershipStatus::Accepted);
        assert!(account.is_owner);
    }

    #[tokio::test]
    async fn test_bearer_token_is_attached_once_set() {
        let client = client().await;

        let companies = client.validated_companies(7).await.unwrap();
        assert_eq!(companies[0].extra["bearer"], "none");

        client.set_bearer_token(Some("Bearer issued-token"));
        let companies = client.validated_companies(7).await.unwrap();
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].extra["bearer"], "Bearer issued-token");

        client.set_bearer_token(None);
        let companies = client.validated_companies(7).await.unwrap();
        assert_eq!(companies[0].extra["bearer"], "none");
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let client = client().await;

        let error = client.pending_requests(7).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_generic_helpers() {
        let client = client().await;

        let part: Value = client
            .patch_json("parts/3", &json!({"reference": "BOLT-M8"}))
            .await
            .unwrap();
        assert_eq!(part["reference"], "BOLT-M8");

        let deleted = client.delete("/parts/3/remove", true).await.unwrap();
        assert_eq!(deleted.status, 200);
        assert_eq!(deleted.data, Some(json!({"deleted": true})));

        let missing = client.delete("parts/4/unknown", false).await.unwrap();
        assert_eq!(missing.status, 404);
        assert!(missing.data.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_kind() {
        let client = HttpApiClient::new(&Config::new("http://127.0.0.1:1/api")).unwrap();

        let error = client.validated_companies(7).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_extract_error_message_shapes() {
        assert_eq!(
            extract_error_message(r#"{"message": "Nope"}"#).as_deref(),
            Some("Nope")
        );
        assert_eq!(
            extract_error_message(r#"{"errors": ["a", "b"]}"#).as_deref(),
            Some("a, b")
        );
        assert_eq!(extract_error_message(r#"{"message": ""}"#), None);
        assert_eq!(extract_error_message("plain text"), None);
    }
}

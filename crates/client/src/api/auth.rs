//! `/auth` endpoints.

use serde::{Deserialize, Serialize};

use eduadmin_core::error::CoreError;

use super::ApiClient;
use crate::error::ClientError;
use crate::session::User;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// `POST /auth/login` answers `{ success, data: { token, user }, message? }`.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    data: Option<LoginData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
    user: User,
}

impl ApiClient {
    /// Authenticate and persist the token and user in the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let response = self
            .send(self.post("/auth/login", &LoginRequest { username, password }))
            .await?;
        let body: LoginResponse = serde_json::from_slice(&response.bytes().await?)?;

        let data = match (body.success, body.data) {
            (true, Some(data)) => data,
            _ => {
                return Err(CoreError::Unauthorized(
                    body.message.unwrap_or_else(|| "Login failed".to_string()),
                )
                .into())
            }
        };

        self.session.sign_in(data.token, data.user.clone())?;
        Ok(data.user)
    }

    /// Tell the backend, then clear local state whatever it answered.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if self.session.is_authenticated() {
            if let Err(e) = self.execute(self.post("/auth/logout", &serde_json::json!({}))).await {
                tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
            }
        }
        self.session.sign_out()
    }

    /// The user behind the current token.
    pub async fn me(&self) -> Result<User, ClientError> {
        self.fetch_required(self.get("/auth/me")).await
    }
}

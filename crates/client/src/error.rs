use eduadmin_core::error::CoreError;
use eduadmin_core::validation::FieldErrors;

/// Errors from the admin client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status other than 401.
    #[error("API error ({status}): {}", message.as_deref().unwrap_or("<no message>"))]
    Api {
        status: u16,
        /// `error` or `message` from the response body, when present.
        message: Option<String>,
    },

    /// The backend rejected the credentials; the local session has
    /// already been cleared.
    #[error("Not authenticated: {}", message.as_deref().unwrap_or("session expired"))]
    Unauthorized { message: Option<String> },

    /// A response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A successful response carried no `data`.
    #[error("Response contained no data")]
    MissingData,

    /// Reading or writing persisted client state failed.
    #[error("Client storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Form input failed client-side validation; nothing was sent.
    #[error("Invalid input: {0}")]
    Form(FieldErrors),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<FieldErrors> for ClientError {
    fn from(errors: FieldErrors) -> Self {
        ClientError::Form(errors)
    }
}

/// The message a domain error shows to the user.
pub fn core_message(error: &CoreError, fallback: &str) -> String {
    match error {
        CoreError::Validation(m)
        | CoreError::Conflict(m)
        | CoreError::Forbidden(m)
        | CoreError::Unauthorized(m) => m.clone(),
        CoreError::NotFound { .. } => error.to_string(),
        CoreError::Internal(_) => fallback.to_string(),
    }
}

impl ClientError {
    /// Text for the user: the backend's own message when it sent one,
    /// the rule that failed for client-side errors, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api {
                message: Some(message),
                ..
            } => message.clone(),
            ClientError::Unauthorized { message } => message
                .clone()
                .unwrap_or_else(|| "Your session has expired. Please log in again.".to_string()),
            ClientError::Form(errors) => errors.summary(),
            ClientError::Core(core) => core_message(core, fallback),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_preferred() {
        let err = ClientError::Api {
            status: 400,
            message: Some("Bundle name already taken".into()),
        };
        assert_eq!(err.user_message("Failed to save bundle"), "Bundle name already taken");
    }

    #[test]
    fn test_fallback_without_message() {
        let err = ClientError::Api {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message("Failed to save bundle"), "Failed to save bundle");
        assert_eq!(
            ClientError::MissingData.user_message("Failed"),
            "Failed"
        );
    }

    #[test]
    fn test_client_side_rules_are_shown() {
        let err = ClientError::from(CoreError::Conflict("Deactivate first".into()));
        assert_eq!(err.user_message("x"), "Deactivate first");

        let mut fields = FieldErrors::new();
        fields.insert("price", "Price is required");
        assert_eq!(
            ClientError::from(fields).user_message("x"),
            "price: Price is required"
        );
    }

    #[test]
    fn test_unauthorized_message() {
        let err = ClientError::Unauthorized { message: None };
        assert!(err.is_unauthorized());
        assert_eq!(
            err.user_message("x"),
            "Your session has expired. Please log in again."
        );
    }
}

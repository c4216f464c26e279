use thiserror::Error;

/// Failures reported by the Nalo API. Either one aborts the whole run.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Bad credentials, missing token or an account list without payload.
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    /// Any other failed or malformed request.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ConnectorError>;

impl ConnectorError {
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, ConnectorError::AuthenticationFailure(_))
    }
}

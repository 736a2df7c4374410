use thiserror::Error;

/// Failure taxonomy for the authentication flows. User-facing variants
/// double as flash messages; the source-carrying variants stay in the logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No account exists with this email")]
    UserNotFound,
    #[error("Password reset token is invalid or has expired")]
    TokenInvalidOrExpired,
    #[error("Passwords do not match. Please type again")]
    CredentialMismatch,
    #[error("Invalid email or password. Please try again")]
    AuthenticationFailed,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password must be at least 8 characters")]
    WeakPassword,
    #[error("database error")]
    Persistence(#[source] anyhow::Error),
    #[error("mail delivery failed")]
    MailDelivery(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    /// What the flash message should say. Internals are never shown.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Persistence(_) | AuthError::MailDelivery(_) | AuthError::Internal(_) => {
                "Something went wrong. Please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_variants_speak_for_themselves() {
        assert_eq!(
            AuthError::CredentialMismatch.user_message(),
            "Passwords do not match. Please type again"
        );
        assert_eq!(
            AuthError::TokenInvalidOrExpired.user_message(),
            "Password reset token is invalid or has expired"
        );
    }

    #[test]
    fn internal_variants_are_masked() {
        let err = AuthError::Persistence(anyhow::anyhow!("connection refused on 5432"));
        let msg = err.user_message();
        assert!(!msg.contains("5432"));
        assert_eq!(msg, "Something went wrong. Please try again");
    }
}

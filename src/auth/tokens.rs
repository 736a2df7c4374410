use crate::auth::error::AuthError;
use crate::auth::repo::User;
use crate::auth::services;
use crate::mailer::{self, PASSWORD_CHANGED_SUBJECT};
use crate::state::AppState;
use rand::rngs::OsRng;
use rand::RngCore;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

/// 20 random bytes, hex-encoded to a 40-character token.
pub const RESET_TOKEN_BYTES: usize = 20;

pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn reset_deadline(ttl_minutes: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes)
}

/// Mint a reset token for the account behind `email` and persist it,
/// replacing any token issued earlier. Returns the user and the token
/// for the caller to deliver.
pub async fn issue(state: &AppState, email: &str) -> Result<(User, String), AuthError> {
    let user = User::find_by_email(&state.db, email)
        .await
        .map_err(AuthError::Persistence)?
        .ok_or(AuthError::UserNotFound)?;

    let token = generate_reset_token();
    let expires = reset_deadline(state.config.reset_token_ttl_minutes);
    User::set_reset_token(&state.db, user.id, &token, expires)
        .await
        .map_err(AuthError::Persistence)?;

    debug!(user_id = %user.id, "reset token issued");
    Ok((user, token))
}

/// Resolve a token to its owner, failing uniformly whether the token is
/// unknown, already used, or past its deadline.
pub async fn validate(state: &AppState, token: &str) -> Result<User, AuthError> {
    User::find_by_valid_reset_token(&state.db, token)
        .await
        .map_err(AuthError::Persistence)?
        .ok_or(AuthError::TokenInvalidOrExpired)
}

/// Exchange a valid token for a new password. The confirmation check
/// runs before the store is touched, and the token only burns once the
/// new hash is in place. The notification mail is best effort.
pub async fn redeem(
    state: &AppState,
    token: &str,
    new_password: &str,
    confirmation: &str,
) -> Result<User, AuthError> {
    if new_password != confirmation {
        return Err(AuthError::CredentialMismatch);
    }
    if !services::is_acceptable_password(new_password) {
        return Err(AuthError::WeakPassword);
    }

    let user = validate(state, token).await?;

    let hash = services::hash_password(new_password).map_err(AuthError::Internal)?;
    User::reset_password(&state.db, user.id, &hash)
        .await
        .map_err(AuthError::Persistence)?;
    debug!(user_id = %user.id, "password reset completed");

    let body = mailer::password_changed_body(&user.name, &user.email);
    if let Err(e) = state
        .mailer
        .send(&user.email, PASSWORD_CHANGED_SUBJECT, &body)
        .await
    {
        warn!(error = %e, user_id = %user.id, "password changed mail failed");
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_forty_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
    }

    #[test]
    fn deadline_lands_in_the_window() {
        let before = OffsetDateTime::now_utc() + Duration::minutes(30) - Duration::seconds(5);
        let deadline = reset_deadline(30);
        let after = OffsetDateTime::now_utc() + Duration::minutes(30) + Duration::seconds(5);
        assert!(deadline > before);
        assert!(deadline < after);
    }

    #[tokio::test]
    async fn redeem_rejects_mismatch_before_touching_storage() {
        // The fake state has a lazy pool that never connects; reaching the
        // store would error with Persistence, not CredentialMismatch.
        let state = AppState::fake();
        let err = redeem(&state, "irrelevant", "new-password", "different")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CredentialMismatch));
    }

    #[tokio::test]
    async fn redeem_rejects_short_password_before_touching_storage() {
        let state = AppState::fake();
        let err = redeem(&state, "irrelevant", "short", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword));
    }
}

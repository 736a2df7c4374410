use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use super::sessions::{Session, SESSION_COOKIE};
use crate::flash::{self, Flash};
use crate::state::AppState;

/// Resolves the session cookie to a live session, or bounces the
/// request to the login page with a flash.
#[derive(Debug)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        let jar = flash::set(
            CookieJar::new(),
            Flash::error("Please log in first to access this page"),
        );
        (jar, Redirect::to("/login")).into_response()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let session_id = jar
            .get(SESSION_COOKIE)
            .and_then(|c| c.value().parse::<Uuid>().ok())
            .ok_or(LoginRedirect)?;

        let session = match Session::find_active(&state.db, session_id).await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(LoginRedirect),
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                return Err(LoginRedirect);
            }
        };

        Ok(SessionUser {
            user_id: session.user_id,
            session_id: session.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    #[test]
    fn rejection_redirects_to_login_with_flash() {
        let response = LoginRedirect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(set_cookie.starts_with("flash="));
    }
}

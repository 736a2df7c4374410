use axum::{
    extract::{Host, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::CookieJar;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{ChangePasswordForm, ForgotForm, LoginForm, ResetPasswordForm, SignupForm},
        error::AuthError,
        extractors::SessionUser,
        pages,
        repo::User,
        services::{hash_password, is_acceptable_password, is_valid_email, verify_password},
        sessions::{clear_session_cookie, session_cookie, Session},
        tokens,
    },
    flash::{self, Flash},
    mailer::{self, PASSWORD_CHANGED_SUBJECT, RESET_MAIL_SUBJECT},
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/signup", get(signup_form).post(signup))
        .route("/forgot", get(forgot_form).post(forgot))
        .route("/reset/:token", get(reset_form).post(reset))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/logout", get(logout))
        .route("/password/change", get(change_password_form).post(change_password))
}

fn redirect_with_flash(jar: CookieJar, flash: Flash, to: &str) -> Response {
    (flash::set(jar, flash), Redirect::to(to)).into_response()
}

#[instrument(skip(jar))]
pub async fn login_form(jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    (jar, Html(pages::login_page(flash.as_ref()))).into_response()
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut payload): Form<LoginForm>,
) -> Response {
    payload.email = payload.email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::AuthenticationFailed.user_message()),
                "/login",
            );
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Persistence(e).user_message()),
                "/login",
            );
        }
    };

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Internal(e).user_message()),
                "/login",
            );
        }
    };

    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return redirect_with_flash(
            jar,
            Flash::error(AuthError::AuthenticationFailed.user_message()),
            "/login",
        );
    }

    let session = match Session::create(&state.db, user.id, state.config.session_ttl_minutes).await
    {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "session create failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Persistence(e).user_message()),
                "/login",
            );
        }
    };

    info!(user_id = %user.id, email = %user.email, "user logged in");
    let jar = jar.add(session_cookie(&session, state.config.session_ttl_minutes));
    (jar, Redirect::to("/dashboard")).into_response()
}

#[instrument(skip(jar))]
pub async fn signup_form(jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    (jar, Html(pages::signup_page(flash.as_ref()))).into_response()
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut payload): Form<SignupForm>,
) -> Response {
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return redirect_with_flash(
            jar,
            Flash::error(AuthError::InvalidEmail.user_message()),
            "/signup",
        );
    }

    if !is_acceptable_password(&payload.password) {
        warn!("password too short");
        return redirect_with_flash(
            jar,
            Flash::error(AuthError::WeakPassword.user_message()),
            "/signup",
        );
    }

    match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::EmailTaken.user_message()),
                "/signup",
            );
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Persistence(e).user_message()),
                "/signup",
            );
        }
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Internal(e).user_message()),
                "/signup",
            );
        }
    };

    let user = match User::create(&state.db, &payload.name, &payload.email, &hash).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "create user failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Persistence(e).user_message()),
                "/signup",
            );
        }
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    redirect_with_flash(
        jar,
        Flash::success("Account created successfully. Please log in"),
        "/login",
    )
}

#[instrument(skip(jar))]
pub async fn forgot_form(jar: CookieJar) -> Response {
    let (jar, flash) = flash::take(jar);
    (jar, Html(pages::forgot_page(flash.as_ref()))).into_response()
}

#[instrument(skip(state, jar, payload))]
pub async fn forgot(
    State(state): State<AppState>,
    Host(host): Host,
    jar: CookieJar,
    Form(mut payload): Form<ForgotForm>,
) -> Response {
    payload.email = payload.email.trim().to_lowercase();

    let (user, token) = match tokens::issue(&state, &payload.email).await {
        Ok(pair) => pair,
        Err(e) => {
            warn!(email = %payload.email, error = %e, "reset token issue failed");
            return redirect_with_flash(jar, Flash::error(e.user_message()), "/forgot");
        }
    };

    let reset_url = format!("http://{}/reset/{}", host, token);
    let body = mailer::reset_mail_body(&reset_url);
    if let Err(e) = state.mailer.send(&user.email, RESET_MAIL_SUBJECT, &body).await {
        error!(error = %e, user_id = %user.id, "reset mail failed");
        return redirect_with_flash(
            jar,
            Flash::error(AuthError::MailDelivery(e).user_message()),
            "/forgot",
        );
    }

    info!(user_id = %user.id, "reset mail sent");
    redirect_with_flash(
        jar,
        Flash::success(format!(
            "An email has been sent to {} with further instructions",
            user.email
        )),
        "/forgot",
    )
}

#[instrument(skip(state, jar))]
pub async fn reset_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
) -> Response {
    match tokens::validate(&state, &token).await {
        Ok(_) => {
            let (jar, flash) = flash::take(jar);
            (jar, Html(pages::reset_page(flash.as_ref(), &token))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "reset link rejected");
            redirect_with_flash(jar, Flash::error(e.user_message()), "/forgot")
        }
    }
}

#[instrument(skip(state, jar, payload))]
pub async fn reset(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
    Form(payload): Form<ResetPasswordForm>,
) -> Response {
    let user = match tokens::redeem(
        &state,
        &token,
        &payload.password,
        &payload.confirm_password,
    )
    .await
    {
        Ok(user) => user,
        Err(e @ (AuthError::CredentialMismatch | AuthError::WeakPassword)) => {
            let back = format!("/reset/{}", token);
            return redirect_with_flash(jar, Flash::error(e.user_message()), &back);
        }
        Err(e @ AuthError::TokenInvalidOrExpired) => {
            warn!("stale reset token redeemed");
            return redirect_with_flash(jar, Flash::error(e.user_message()), "/forgot");
        }
        Err(e) => {
            error!(error = %e, "password reset failed");
            let back = format!("/reset/{}", token);
            return redirect_with_flash(jar, Flash::error(e.user_message()), &back);
        }
    };

    // Log the user straight in. If the session cannot be opened the reset
    // itself already succeeded, so fall back to the login page.
    match Session::create(&state.db, user.id, state.config.session_ttl_minutes).await {
        Ok(session) => {
            info!(user_id = %user.id, "password reset, session opened");
            let jar = jar.add(session_cookie(&session, state.config.session_ttl_minutes));
            redirect_with_flash(
                jar,
                Flash::success("Success! Your password has been changed"),
                "/dashboard",
            )
        }
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "session create after reset failed");
            redirect_with_flash(
                jar,
                Flash::success("Success! Your password has been changed. Please log in"),
                "/login",
            )
        }
    }
}

#[instrument(skip(state, jar))]
pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    session: SessionUser,
) -> Response {
    let user = match User::find_by_id(&state.db, session.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(user_id = %session.user_id, "session for deleted user");
            let jar = jar.remove(clear_session_cookie());
            return redirect_with_flash(
                jar,
                Flash::error("Please log in first to access this page"),
                "/login",
            );
        }
        Err(e) => {
            error!(error = %e, user_id = %session.user_id, "find_by_id failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Persistence(e).user_message()),
                "/login",
            );
        }
    };

    let (jar, flash) = flash::take(jar);
    (jar, Html(pages::dashboard_page(flash.as_ref(), &user.name))).into_response()
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    session: SessionUser,
) -> Response {
    if let Err(e) = Session::delete(&state.db, session.session_id).await {
        warn!(error = %e, session_id = %session.session_id, "session delete failed");
    }
    info!(user_id = %session.user_id, "user logged out");
    let jar = jar.remove(clear_session_cookie());
    redirect_with_flash(jar, Flash::success("You have been logged out"), "/login")
}

#[instrument(skip(jar, _session))]
pub async fn change_password_form(jar: CookieJar, _session: SessionUser) -> Response {
    let (jar, flash) = flash::take(jar);
    (jar, Html(pages::change_password_page(flash.as_ref()))).into_response()
}

#[instrument(skip(state, jar, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    jar: CookieJar,
    session: SessionUser,
    Form(payload): Form<ChangePasswordForm>,
) -> Response {
    if payload.password != payload.confirm_password {
        return redirect_with_flash(
            jar,
            Flash::error(AuthError::CredentialMismatch.user_message()),
            "/password/change",
        );
    }

    if !is_acceptable_password(&payload.password) {
        return redirect_with_flash(
            jar,
            Flash::error(AuthError::WeakPassword.user_message()),
            "/password/change",
        );
    }

    let user = match User::find_by_id(&state.db, session.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(user_id = %session.user_id, "session for deleted user");
            let jar = jar.remove(clear_session_cookie());
            return redirect_with_flash(
                jar,
                Flash::error("Please log in first to access this page"),
                "/login",
            );
        }
        Err(e) => {
            error!(error = %e, user_id = %session.user_id, "find_by_id failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Persistence(e).user_message()),
                "/password/change",
            );
        }
    };

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return redirect_with_flash(
                jar,
                Flash::error(AuthError::Internal(e).user_message()),
                "/password/change",
            );
        }
    };

    if let Err(e) = User::update_password(&state.db, user.id, &hash).await {
        error!(error = %e, user_id = %user.id, "update_password failed");
        return redirect_with_flash(
            jar,
            Flash::error(AuthError::Persistence(e).user_message()),
            "/password/change",
        );
    }

    info!(user_id = %user.id, "password changed");
    let body = mailer::password_changed_body(&user.name, &user.email);
    if let Err(e) = state
        .mailer
        .send(&user.email, PASSWORD_CHANGED_SUBJECT, &body)
        .await
    {
        warn!(error = %e, user_id = %user.id, "password changed mail failed");
    }

    redirect_with_flash(
        jar,
        Flash::success("Success! Your password has been changed"),
        "/dashboard",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap()
    }

    #[tokio::test]
    async fn signup_rejects_invalid_email_without_touching_storage() {
        let state = AppState::fake();
        let form = SignupForm {
            name: "Ada".into(),
            email: "not-an-email".into(),
            password: "long-enough-password".into(),
        };
        let response = signup(State(state), CookieJar::new(), Form(form)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/signup");
    }

    #[tokio::test]
    async fn signup_rejects_short_password_without_touching_storage() {
        let state = AppState::fake();
        let form = SignupForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "short".into(),
        };
        let response = signup(State(state), CookieJar::new(), Form(form)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/signup");
    }

    #[tokio::test]
    async fn reset_with_mismatched_confirmation_returns_to_the_form() {
        let state = AppState::fake();
        let form = ResetPasswordForm {
            password: "new-password".into(),
            confirm_password: "other-password".into(),
        };
        let response = reset(
            State(state),
            CookieJar::new(),
            Path("abc123".to_string()),
            Form(form),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/reset/abc123");
    }

    #[tokio::test]
    async fn login_page_renders_without_a_flash() {
        let response = login_form(CookieJar::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

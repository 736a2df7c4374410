use serde::Deserialize;

/// Body of `POST /signup`.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Body of `POST /forgot`.
#[derive(Debug, Deserialize)]
pub struct ForgotForm {
    pub email: String,
}

/// Body of `POST /reset/:token`. Both fields must agree before the
/// token is even looked up.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

/// Body of `POST /password/change` for a logged-in user.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    pub password: String,
    pub confirm_password: String,
}

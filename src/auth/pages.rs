use crate::flash::{Flash, FlashKind};

/// Minimal HTML-escape for values interpolated into pages.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn flash_banner(flash: Option<&Flash>) -> String {
    match flash {
        Some(flash) => {
            let class = match flash.kind {
                FlashKind::Success => "flash flash-success",
                FlashKind::Error => "flash flash-error",
            };
            format!(
                r#"<p class="{}">{}</p>"#,
                class,
                escape(&flash.message)
            )
        }
        None => String::new(),
    }
}

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
{banner}
{body}
</body>
</html>"#,
        title = escape(title),
        banner = flash_banner(flash),
        body = body,
    )
}

pub fn login_page(flash: Option<&Flash>) -> String {
    layout(
        "Log in",
        flash,
        r#"<h1>Log in</h1>
<form method="post" action="/login">
  <label>Email <input type="email" name="email" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Log in</button>
</form>
<p><a href="/signup">Create an account</a> | <a href="/forgot">Forgot password?</a></p>"#,
    )
}

pub fn signup_page(flash: Option<&Flash>) -> String {
    layout(
        "Sign up",
        flash,
        r#"<h1>Sign up</h1>
<form method="post" action="/signup">
  <label>Name <input type="text" name="name" required></label>
  <label>Email <input type="email" name="email" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Sign up</button>
</form>
<p><a href="/login">Already have an account?</a></p>"#,
    )
}

pub fn forgot_page(flash: Option<&Flash>) -> String {
    layout(
        "Forgot password",
        flash,
        r#"<h1>Forgot password</h1>
<form method="post" action="/forgot">
  <label>Email <input type="email" name="email" required></label>
  <button type="submit">Send recovery link</button>
</form>
<p><a href="/login">Back to login</a></p>"#,
    )
}

pub fn reset_page(flash: Option<&Flash>, token: &str) -> String {
    let body = format!(
        r#"<h1>Choose a new password</h1>
<form method="post" action="/reset/{token}">
  <label>New password <input type="password" name="password" required></label>
  <label>Confirm password <input type="password" name="confirm_password" required></label>
  <button type="submit">Reset password</button>
</form>"#,
        token = escape(token),
    );
    layout("Reset password", flash, &body)
}

pub fn dashboard_page(flash: Option<&Flash>, name: &str) -> String {
    let body = format!(
        r#"<h1>Welcome, {name}</h1>
<p><a href="/password/change">Change password</a> | <a href="/logout">Log out</a></p>"#,
        name = escape(name),
    );
    layout("Dashboard", flash, &body)
}

pub fn change_password_page(flash: Option<&Flash>) -> String {
    layout(
        "Change password",
        flash,
        r#"<h1>Change password</h1>
<form method="post" action="/password/change">
  <label>New password <input type="password" name="password" required></label>
  <label>Confirm password <input type="password" name="confirm_password" required></label>
  <button type="submit">Change password</button>
</form>
<p><a href="/dashboard">Back to dashboard</a></p>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_posts_to_login() {
        let html = login_page(None);
        assert!(html.contains(r#"action="/login""#));
        assert!(html.contains(r#"name="email""#));
        assert!(html.contains(r#"name="password""#));
    }

    #[test]
    fn reset_page_carries_the_token_in_the_action() {
        let html = reset_page(None, "abc123");
        assert!(html.contains(r#"action="/reset/abc123""#));
        assert!(html.contains(r#"name="confirm_password""#));
    }

    #[test]
    fn flash_banner_is_rendered_once_present() {
        let flash = Flash::error("Invalid email or password. Please try again");
        let html = login_page(Some(&flash));
        assert!(html.contains("flash-error"));
        assert!(html.contains("Invalid email or password"));
        assert!(!login_page(None).contains("flash-error"));
    }

    #[test]
    fn user_supplied_values_are_escaped() {
        let html = dashboard_page(None, "<script>alert(1)</script>");
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn hostile_token_cannot_break_out_of_the_action() {
        let html = reset_page(None, r#""><script>x</script>"#);
        assert!(!html.contains("<script>x"));
    }
}

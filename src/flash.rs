use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One-shot notification carried to the next rendered page in a cookie.
/// Set on redirect, consumed (and cleared) by the page that renders it.
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

fn encode(flash: &Flash) -> String {
    let payload = serde_json::to_string(flash).expect("flash serializes");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload)
}

fn decode(value: &str) -> Option<Flash> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(value)
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn set(jar: CookieJar, flash: Flash) -> CookieJar {
    let mut cookie = Cookie::new(FLASH_COOKIE, encode(&flash));
    cookie.set_path("/");
    cookie.set_http_only(true);
    jar.add(cookie)
}

/// Pop the pending flash, clearing the cookie so it is shown exactly once.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = jar.get(FLASH_COOKIE).and_then(|c| decode(c.value()));
    let mut removal = Cookie::new(FLASH_COOKIE, "");
    removal.set_path("/");
    (jar.remove(removal), flash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_take_roundtrip() {
        let jar = set(CookieJar::new(), Flash::success("Account created successfully"));
        let (jar, flash) = take(jar);
        let flash = flash.expect("flash should be present");
        assert_eq!(flash.kind, FlashKind::Success);
        assert_eq!(flash.message, "Account created successfully");
        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn take_on_empty_jar_is_none() {
        let (_, flash) = take(CookieJar::new());
        assert!(flash.is_none());
    }

    #[test]
    fn garbage_cookie_value_is_ignored() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "not base64 json!"));
        let (_, flash) = take(jar);
        assert!(flash.is_none());
    }

    #[test]
    fn error_flash_keeps_its_kind() {
        let jar = set(CookieJar::new(), Flash::error("Invalid email or password"));
        let (_, flash) = take(jar);
        assert_eq!(flash.unwrap().kind, FlashKind::Error);
    }
}

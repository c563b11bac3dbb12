use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_VALUE: &str = "authenticated";
pub const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// Login settings, resolved from the config once at startup.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub password: Option<String>,
    pub secure_cookie: bool,
}

impl AuthSettings {
    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self {
            password: cfg.password().map(str::to_string),
            secure_cookie: cfg.production,
        }
    }

    /// Whether `candidate` is the console password, compared in constant
    /// time. Always false when no password is configured.
    pub fn accepts(&self, candidate: &str) -> bool {
        self.password
            .as_deref()
            .is_some_and(|secret| candidate.as_bytes().ct_eq(secret.as_bytes()).into())
    }
}

/// A request carries a session when any `session` cookie in any `Cookie`
/// header holds exactly the session marker.
pub fn is_authenticated(headers: &HeaderMap) -> bool {
    session_markers(headers).any(|value| value == SESSION_VALUE)
}

fn session_markers(headers: &HeaderMap) -> impl Iterator<Item = &str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

pub fn session_cookie(secure: bool) -> String {
    build_cookie(SESSION_VALUE, SESSION_MAX_AGE_SECS, secure)
}

pub fn cleared_session_cookie(secure: bool) -> String {
    build_cookie("", 0, secure)
}

fn build_cookie(value: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

//! Access gate run in front of every route.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::session;

pub const LOGIN_PATH: &str = "/login";
pub const AUTH_API_PREFIX: &str = "/api/auth";
pub const ASSETS_PREFIX: &str = "/assets/";

const PUBLIC_IMAGE_EXTENSIONS: &[&str] =
    &["webp", "png", "jpg", "jpeg", "gif", "svg", "ico", "webmanifest"];

/// Paths reachable without a session: the login page, the auth API, bundled
/// assets, the favicon, and root-level image files.
pub fn is_public_path(path: &str) -> bool {
    path.starts_with(LOGIN_PATH)
        || path.starts_with(AUTH_API_PREFIX)
        || path.starts_with(ASSETS_PREFIX)
        || path.starts_with("/favicon.ico")
        || is_root_image(path)
}

/// A single root-level file name with an image (or manifest) extension.
pub fn is_root_image(path: &str) -> bool {
    let Some(name) = path.strip_prefix('/') else {
        return false;
    };
    if name.contains('/') {
        return false;
    }
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && PUBLIC_IMAGE_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

pub async fn access_gate(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if is_public_path(path) || session::is_authenticated(request.headers()) {
        return next.run(request).await;
    }
    tracing::debug!(path, "no session, redirecting to login");
    Redirect::temporary(LOGIN_PATH).into_response()
}

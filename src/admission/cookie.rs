use axum::http::{header, HeaderMap};

/// Name of the membership cookie
pub const AUTH_COOKIE: &str = "x-auth-token";

/// Builds the `Set-Cookie` value carrying a membership token
///
/// The cookie is unreadable from scripts and never sent cross-site.
pub fn membership_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extracts the membership token from the request's `Cookie` headers
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

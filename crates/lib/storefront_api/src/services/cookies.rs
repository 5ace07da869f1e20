//! Cookie service: set/clear httpOnly auth cookies.
//!
//! Cookie names: `accessToken`, `refreshToken`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use storefront_core::models::auth::SessionTokens;
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

fn auth_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Build a httpOnly cookie for the access token.
pub fn access_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    auth_cookie(
        ACCESS_COOKIE,
        token.to_string(),
        Duration::seconds(max_age_secs),
        secure,
    )
}

/// Build a httpOnly cookie for the refresh token.
pub fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    auth_cookie(
        REFRESH_COOKIE,
        token.to_string(),
        Duration::seconds(max_age_secs),
        secure,
    )
}

/// Build an expired cookie to clear the access token.
pub fn clear_access_cookie(secure: bool) -> Cookie<'static> {
    auth_cookie(ACCESS_COOKIE, String::new(), Duration::ZERO, secure)
}

/// Build an expired cookie to clear the refresh token.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    auth_cookie(REFRESH_COOKIE, String::new(), Duration::ZERO, secure)
}

/// Add both session cookies for `tokens`.
pub fn with_session(jar: CookieJar, tokens: &SessionTokens, secure: bool) -> CookieJar {
    jar.add(access_cookie(
        &tokens.access_token,
        tokens.access_expires_in,
        secure,
    ))
    .add(refresh_cookie(
        &tokens.refresh_token,
        tokens.refresh_expires_in,
        secure,
    ))
}

/// Expire both session cookies.
pub fn cleared(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_cookies_are_http_only_and_scoped_to_root() {
        let cookie = access_cookie("tok", 900, true);
        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(900)));
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        let cookie = clear_refresh_cookie(false);
        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn session_jar_holds_both_cookies() {
        let tokens = SessionTokens {
            access_token: "a".into(),
            refresh_token: "r".into(),
            access_expires_in: 900,
            refresh_expires_in: 604_800,
        };
        let jar = with_session(CookieJar::new(), &tokens, false);
        assert_eq!(jar.get(ACCESS_COOKIE).map(|c| c.value()), Some("a"));
        assert_eq!(jar.get(REFRESH_COOKIE).map(|c| c.value()), Some("r"));
    }
}

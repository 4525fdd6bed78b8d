//! `Set-Cookie` values for the session and OAuth state cookies

use crate::config::{OAUTH_STATE_COOKIE, OAUTH_STATE_MAX_AGE_SECS, SESSION_COOKIE, SESSION_MAX_AGE_SECS};

fn build(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn session(token: &str, secure: bool) -> String {
    build(SESSION_COOKIE, token, SESSION_MAX_AGE_SECS, secure)
}

pub fn clear_session(secure: bool) -> String {
    build(SESSION_COOKIE, "", 0, secure)
}

pub fn oauth_state(state: &str, secure: bool) -> String {
    build(OAUTH_STATE_COOKIE, state, OAUTH_STATE_MAX_AGE_SECS, secure)
}

pub fn clear_oauth_state(secure: bool) -> String {
    build(OAUTH_STATE_COOKIE, "", 0, secure)
}

//! Session identifiers and the cookies that carry them.

use axum_extra::extract::cookie::Cookie;

use crate::config::SESSION_DURATION_HOURS;

pub const SESSION_COOKIE_NAME: &str = "hifz_session";

/// Generate a new session ID
pub fn generate_session_id() -> String {
  use rand::Rng;
  let mut rng = rand::rng();
  (0..32)
    .map(|_| {
      let idx = rng.random_range(0..36);
      if idx < 10 {
        (b'0' + idx) as char
      } else {
        (b'a' + idx - 10) as char
      }
    })
    .collect()
}

/// HttpOnly cookie holding a fresh session id
pub fn session_cookie(session_id: String) -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE_NAME, session_id))
    .path("/")
    .http_only(true)
    .same_site(axum_extra::extract::cookie::SameSite::Lax)
    .max_age(time::Duration::hours(SESSION_DURATION_HOURS))
    .build()
}

/// Cookie that clears the session on the client
pub fn expired_session_cookie() -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE_NAME, ""))
    .path("/")
    .max_age(time::Duration::seconds(0))
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_session_ids_are_unique_lowercase_alnum() {
    let a = generate_session_id();
    let b = generate_session_id();
    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    assert_ne!(a, b);
  }

  #[test]
  fn test_session_cookie_flags() {
    let cookie = session_cookie("abc".into());
    assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
  }
}

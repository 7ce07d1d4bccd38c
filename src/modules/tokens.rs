use anyhow::Context;
use axum::http::StatusCode;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "session";

pub const SESSION_DURATION: Duration = Duration::days(7);

/// Signs and checks the cookie binding a browser to its session.
#[derive(Clone)]
pub struct SessionTokens {
    secret: Secret<String>,
    secure: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub jti: Uuid,
    pub sid: String,
    pub exp: u64,
}

impl Claims {
    pub fn new(sid: String, duration: Duration) -> Self {
        Self {
            jti: Uuid::new_v4(),
            sid,
            exp: jsonwebtoken::get_current_timestamp() + duration.whole_seconds().unsigned_abs(),
        }
    }
}

impl SessionTokens {
    /// Cookies are only marked secure when the site is served over https.
    pub fn new(secret: Secret<String>, origin: &str) -> Self {
        Self {
            secret,
            secure: origin.starts_with("https://"),
        }
    }

    pub fn create_cookie<'a>(&self, sid: &str) -> Result<Cookie<'a>, AppError> {
        let claims = Claims::new(sid.to_string(), SESSION_DURATION);

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .context("Failed to encode the session JWT")?;

        let cookie = Cookie::build(String::from(SESSION_COOKIE), token)
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .finish();

        Ok(cookie)
    }

    pub fn validate(&self, cookie: &Cookie<'_>) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 5;

        let decoding_key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());

        let claims: Claims = decode(cookie.value(), &decoding_key, &validation)
            .map_err(|_| AppError::exp(StatusCode::UNAUTHORIZED, "Invalid or expired session"))?
            .claims;

        Ok(claims)
    }

    pub fn removal_cookie<'a>() -> Cookie<'a> {
        Cookie::build(String::from(SESSION_COOKIE), "")
            .path("/")
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn issued_cookie_validates() {
        let tokens = SessionTokens::new(Secret::new("secret".into()), "http://localhost");
        let cookie = tokens.create_cookie("sid-1").unwrap();
        assert!(!cookie.secure().unwrap_or(false));
        assert_eq!(tokens.validate(&cookie).unwrap().sid, "sid-1");
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let ours = SessionTokens::new(Secret::new("secret".into()), "https://chat.app");
        let theirs = SessionTokens::new(Secret::new("other".into()), "https://chat.app");
        let cookie = theirs.create_cookie("sid-1").unwrap();
        assert!(cookie.secure().unwrap_or(false));
        assert!(ours.validate(&cookie).is_err());
    }
}

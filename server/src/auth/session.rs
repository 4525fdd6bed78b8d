//! Signed session tokens
//!
//! The session cookie and the MCP API key carry the same HS256 token. It
//! holds the GitHub access token, so it is only ever sent over HttpOnly
//! cookies or explicit API-key headers.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SESSION_MAX_AGE_SECS;
use crate::error::Result;

/// The signed-in user as seen by request handlers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    uid: i64,
    username: String,
    access_token: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a session valid for [`SESSION_MAX_AGE_SECS`]
    pub fn issue(&self, user: &SessionUser) -> Result<String> {
        let now = Utc::now().timestamp();
        self.issue_with_expiry(user, now, now + SESSION_MAX_AGE_SECS)
    }

    fn issue_with_expiry(&self, user: &SessionUser, iat: i64, exp: i64) -> Result<String> {
        let claims = SessionClaims {
            uid: user.id,
            username: user.username.clone(),
            access_token: user.access_token.clone(),
            iat,
            exp,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature and expiry and return the session user
    pub fn verify(&self, token: &str) -> Result<SessionUser> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(SessionUser {
            id: data.claims.uid,
            username: data.claims.username,
            access_token: data.claims.access_token,
        })
    }
}

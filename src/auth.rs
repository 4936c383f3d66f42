use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domains::ids::now_ms;
use crate::error::{Result, TideChatError};

pub const SESSION_COOKIE: &str = "jwt";
pub const SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies HS256 session tokens. The demo login flow only ever
/// issues tokens; verification exists so clients and tests can check what
/// they were handed.
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    pub fn issue(&self, user_id: &str) -> Result<String> {
        let iat = now_ms() / 1000;
        self.sign(&SessionClaims {
            sub: user_id.to_string(),
            iat,
            exp: iat + SESSION_TTL_SECONDS,
        })
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String> {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = serde_json::to_vec(claims)
            .map_err(|e| TideChatError::Serialization(e.to_string()))?;
        let signing_input = format!("{header}.{}", URL_SAFE_NO_PAD.encode(payload));
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let tag = mac.finalize().into_bytes();
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(tag)))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TideChatError::Runtime("malformed session token".to_string()));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TideChatError::Runtime(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(format!("{header}.{payload}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TideChatError::Runtime("session token signature mismatch".to_string()))?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TideChatError::Runtime(e.to_string()))?;
        let claims: SessionClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|e| TideChatError::Serialization(e.to_string()))?;
        if claims.exp <= now_ms() / 1000 {
            return Err(TideChatError::Runtime("session token expired".to_string()));
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TideChatError::Runtime(e.to_string()))
    }
}

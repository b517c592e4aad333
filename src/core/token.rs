//! Signed, time-limited access tokens.
//!
//! A token is `base64url(claims) "." base64url(hmac_sha256(secret, base64url(claims)))`.
//! Nothing is stored server side; the signature and the `exp` claim are the
//! whole of the validation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::models::TokenClaims;

type HmacSha256 = Hmac<Sha256>;

fn signature(secret: &str, payload: &str) -> anyhow::Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid token secret: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

pub fn issue_token(
    user_id: &str,
    secret: &str,
    issued_at: DateTime<Utc>,
    ttl: Duration,
) -> anyhow::Result<String> {
    let claims = TokenClaims {
        id: user_id.to_string(),
        iat: issued_at.timestamp(),
        exp: (issued_at + ttl).timestamp(),
    };
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
    let sig = signature(secret, &payload)?.finalize().into_bytes();
    Ok(format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(sig)))
}

/// Returns the claims when the signature matches and the token has not expired.
pub fn verify_token(token: &str, secret: &str, now: DateTime<Utc>) -> Option<TokenClaims> {
    let (payload, sig) = token.split_once('.')?;
    let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;
    signature(secret, payload).ok()?.verify_slice(&sig).ok()?;

    let claims: TokenClaims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
    if claims.exp <= now.timestamp() {
        return None;
    }
    Some(claims)
}

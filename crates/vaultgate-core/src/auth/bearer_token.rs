use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{AccountId, DeviceId, SessionId, error::UnauthorizedError};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

/// The identity a bearer token is bound to.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub account_id: AccountId,
    pub device_id: DeviceId,
    pub session_id: SessionId,
    /// Mirrors the bound session's expiry.
    pub expires_at: DateTime<Utc>,
}

/// An opaque signed credential binding (account, device, session).
///
/// Treat like a password: the wire form is available through
/// [`as_str`](Self::as_str) and `Display`, but `Debug` stays redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wraps a token received from a client.
    pub fn new(token: String) -> Self {
        Self(token)
    }

    /// The wire form, e.g. for an `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken").finish()
    }
}

impl std::fmt::Display for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints and verifies bearer tokens.
///
/// Tokens are `v1.<claims>.<tag>` with base64url segments: the claims as
/// JSON and an HMAC-SHA256 tag over the version and claims. Minting is
/// deterministic so a retried finalization hands back the identical token.
pub(crate) struct TokenSigner {
    key: Zeroizing<Vec<u8>>,
}

impl TokenSigner {
    pub(crate) fn new(key: Vec<u8>) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    fn mac(&self, message: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(message.as_bytes());
        mac
    }

    pub(crate) fn mint(&self, claims: &TokenClaims) -> Result<BearerToken, serde_json::Error> {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let message = format!("{TOKEN_VERSION}.{body}");
        let tag = self.mac(&message).finalize().into_bytes();

        Ok(BearerToken(format!(
            "{message}.{}",
            URL_SAFE_NO_PAD.encode(tag)
        )))
    }

    /// Checks the signature and decodes the claims.
    ///
    /// Expiry is not checked here; the guard owns that decision. The tag
    /// comparison is constant-time.
    pub(crate) fn verify(&self, token: &BearerToken) -> Result<TokenClaims, UnauthorizedError> {
        let mut segments = token.0.splitn(3, '.');
        let (version, body, tag) = match (segments.next(), segments.next(), segments.next()) {
            (Some(version), Some(body), Some(tag)) => (version, body, tag),
            _ => return Err(UnauthorizedError::InvalidToken),
        };
        if version != TOKEN_VERSION {
            return Err(UnauthorizedError::InvalidToken);
        }

        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| UnauthorizedError::InvalidToken)?;
        self.mac(&format!("{version}.{body}"))
            .verify_slice(&tag)
            .map_err(|_| UnauthorizedError::InvalidToken)?;

        let body = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| UnauthorizedError::InvalidToken)?;
        serde_json::from_slice(&body).map_err(|_| UnauthorizedError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn claims() -> TokenClaims {
        TokenClaims {
            account_id: AccountId::new_v4(),
            device_id: DeviceId::new_v4(),
            session_id: SessionId::new_v4(),
            expires_at: Utc::now() + Duration::minutes(10),
        }
    }

    #[test]
    fn test_mint_verify_round_trip() {
        let signer = TokenSigner::new(b"signing-key".to_vec());
        let claims = claims();

        let token = signer.mint(&claims).unwrap();

        assert_eq!(signer.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_minting_is_deterministic() {
        let signer = TokenSigner::new(b"signing-key".to_vec());
        let claims = claims();

        assert_eq!(signer.mint(&claims).unwrap(), signer.mint(&claims).unwrap());
    }

    #[test]
    fn test_tampered_claims_are_rejected() {
        let signer = TokenSigner::new(b"signing-key".to_vec());
        let token = signer.mint(&claims()).unwrap();

        let mut parts: Vec<&str> = token.as_str().split('.').collect();
        let forged_body = format!("x{}", parts[1]);
        parts[1] = &forged_body;
        let forged = BearerToken::new(parts.join("."));

        assert_eq!(
            signer.verify(&forged),
            Err(UnauthorizedError::InvalidToken)
        );
    }

    #[test]
    fn test_foreign_key_is_rejected() {
        let signer = TokenSigner::new(b"signing-key".to_vec());
        let other = TokenSigner::new(b"other-key".to_vec());

        let token = signer.mint(&claims()).unwrap();

        assert_eq!(other.verify(&token), Err(UnauthorizedError::InvalidToken));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let signer = TokenSigner::new(b"signing-key".to_vec());

        for raw in ["", "v1", "v1.only-two", "not b64.at.all"] {
            assert_eq!(
                signer.verify(&BearerToken::new(raw.to_owned())),
                Err(UnauthorizedError::InvalidToken),
                "accepted: {raw}"
            );
        }
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let signer = TokenSigner::new(b"signing-key".to_vec());
        let token = signer.mint(&claims()).unwrap();

        let forged = BearerToken::new(token.as_str().replacen("v1.", "v2.", 1));

        assert_eq!(signer.verify(&forged), Err(UnauthorizedError::InvalidToken));
    }

    #[test]
    fn test_debug_is_redacted() {
        let signer = TokenSigner::new(b"signing-key".to_vec());
        let token = signer.mint(&claims()).unwrap();

        assert_eq!(format!("{token:?}"), "BearerToken");
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and encrypted auth tokens.
//!
//! Auth tokens are `{email, authorizedAt}` JSON sealed with AES-256-GCM under
//! a key derived from the server secret. The random nonce is prepended to the
//! ciphertext and the whole thing is hex encoded for the cookie value.

use chrono::{DateTime, Duration, Utc};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use regex::Regex;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use std::sync::LazyLock;
use subtle::ConstantTimeEq;

/// Name of the cookie carrying the auth token.
pub const AUTH_COOKIE: &str = "IgetbackAuth";

/// How long a token stays valid after login.
pub const TOKEN_LIFETIME_HOURS: i64 = 1;

const HKDF_SALT: &[u8] = b"igetback-auth-token";
const HKDF_INFO: &[u8] = b"aes-256-gcm";

static AUTH_COOKIE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"IgetbackAuth=([a-f0-9]+)").expect("static regex is valid")
});

type HmacSha512 = Hmac<Sha512>;

/// Decrypted auth cookie contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub email: String,
    pub authorized_at: DateTime<Utc>,
}

/// Token validity window check.
pub fn validate_auth_token(token: &AuthToken, now: DateTime<Utc>) -> bool {
    now < token.authorized_at + Duration::hours(TOKEN_LIFETIME_HOURS)
}

/// Server-side secrets: the token key and a random source.
pub struct Credentials {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl Credentials {
    /// Derive the token key from the server secret.
    pub fn new(secret: &str) -> Result<Self, CredentialError> {
        if secret.is_empty() {
            return Err(CredentialError::EmptySecret);
        }

        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret.as_bytes());
        let mut okm = [0u8; 32];
        hk.expand(HKDF_INFO, &mut okm)
            .map_err(|_| CredentialError::KeyDerivation)?;

        let unbound =
            UnboundKey::new(&AES_256_GCM, &okm).map_err(|_| CredentialError::KeyDerivation)?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    // ─── Passwords ───────────────────────────────────────────────

    /// HMAC-SHA512 of the password keyed by the normalized email, as hex.
    ///
    /// The email is a predictable salt. Existing hashes depend on this scheme.
    pub fn hash_password(&self, salt_email: &str, password: &str) -> Result<String, CredentialError> {
        let mut mac = HmacSha512::new_from_slice(salt_email.as_bytes())
            .map_err(|_| CredentialError::Crypto("hmac key"))?;
        mac.update(password.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time comparison against a stored hash.
    pub fn verify_password(&self, salt_email: &str, password: &str, stored_hash: &str) -> bool {
        match self.hash_password(salt_email, password) {
            Ok(computed) => computed.as_bytes().ct_eq(stored_hash.as_bytes()).into(),
            Err(_) => false,
        }
    }

    // ─── Auth Tokens ─────────────────────────────────────────────

    /// Build a token for `email` authorized at `now`.
    pub fn build_auth_token(&self, email: &str, now: DateTime<Utc>) -> Result<String, CredentialError> {
        let token = AuthToken {
            email: email.to_string(),
            authorized_at: now,
        };
        let json = serde_json::to_vec(&token).map_err(|_| CredentialError::Crypto("serialize"))?;
        self.encrypt(&json)
    }

    /// Extract the auth token from a raw `Cookie` header.
    ///
    /// When the cookie appears more than once the last occurrence wins. Any
    /// failure yields `None`.
    pub fn parse_cookie(&self, header: &str) -> Option<AuthToken> {
        let value = AUTH_COOKIE_RE
            .captures_iter(header)
            .last()
            .and_then(|c| c.get(1))?
            .as_str();
        self.decode_token(value)
    }

    /// Decrypt a hex token value.
    pub fn decode_token(&self, value: &str) -> Option<AuthToken> {
        let plaintext = match self.decrypt(value) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "Auth token did not decrypt");
                return None;
            }
        };

        let token: AuthToken = match serde_json::from_slice(&plaintext) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(error = %e, "Auth token payload is malformed");
                return None;
            }
        };

        if token.email.is_empty() {
            tracing::debug!("Auth token has no email");
            return None;
        }
        Some(token)
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CredentialError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CredentialError::Crypto("rng"))?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CredentialError::Crypto("seal"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(hex::encode(sealed))
    }

    fn decrypt(&self, value: &str) -> Result<Vec<u8>, CredentialError> {
        let bytes = hex::decode(value).map_err(|_| CredentialError::Crypto("hex"))?;
        if bytes.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CredentialError::Crypto("truncated"));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce).map_err(|_| CredentialError::Crypto("nonce"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CredentialError::Crypto("open"))?;
        Ok(plaintext.to_vec())
    }
}

/// Errors from credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("CRYPT_PASS must not be empty")]
    EmptySecret,

    #[error("Failed to derive token key")]
    KeyDerivation,

    #[error("Crypto failure: {0}")]
    Crypto(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("unit-test-secret").unwrap()
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            Credentials::new(""),
            Err(CredentialError::EmptySecret)
        ));
    }

    #[test]
    fn test_password_hash_is_keyed_by_email() {
        let creds = credentials();
        let a = creds.hash_password("A@TUFTS.EDU", "pw").unwrap();
        let b = creds.hash_password("B@TUFTS.EDU", "pw").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 128);
        assert!(creds.verify_password("A@TUFTS.EDU", "pw", &a));
        assert!(!creds.verify_password("A@TUFTS.EDU", "wrong", &a));
        assert!(!creds.verify_password("B@TUFTS.EDU", "pw", &a));
    }

    #[test]
    fn test_token_is_lowercase_hex() {
        let token = credentials()
            .build_auth_token("A@TUFTS.EDU", Utc::now())
            .unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_cookie_roundtrip() {
        let creds = credentials();
        let now = Utc::now();
        let value = creds.build_auth_token("A@TUFTS.EDU", now).unwrap();

        let header = format!("theme=dark; {}={}; other=1", AUTH_COOKIE, value);
        let token = creds.parse_cookie(&header).unwrap();
        assert_eq!(token.email, "A@TUFTS.EDU");
        assert_eq!(token.authorized_at, now);
    }

    #[test]
    fn test_last_cookie_wins() {
        let creds = credentials();
        let first = creds.build_auth_token("FIRST@TUFTS.EDU", Utc::now()).unwrap();
        let second = creds.build_auth_token("SECOND@TUFTS.EDU", Utc::now()).unwrap();

        let header = format!("{AUTH_COOKIE}={first}; {AUTH_COOKIE}={second}");
        assert_eq!(creds.parse_cookie(&header).unwrap().email, "SECOND@TUFTS.EDU");
    }

    #[test]
    fn test_tampered_or_foreign_tokens_rejected() {
        let creds = credentials();
        let value = creds.build_auth_token("A@TUFTS.EDU", Utc::now()).unwrap();

        let mut tampered = value.clone().into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(creds.decode_token(&tampered).is_none());

        let other = Credentials::new("another-secret").unwrap();
        assert!(other.decode_token(&value).is_none());

        assert!(creds.parse_cookie("IgetbackAuth=zz").is_none());
        assert!(creds.parse_cookie("IgetbackAuth=abcd").is_none());
        assert!(creds.parse_cookie("").is_none());
    }

    #[test]
    fn test_token_expires_after_an_hour() {
        let now = Utc::now();
        let token = AuthToken {
            email: "A@TUFTS.EDU".to_string(),
            authorized_at: now,
        };
        assert!(validate_auth_token(&token, now));
        assert!(validate_auth_token(&token, now + Duration::minutes(59)));
        assert!(validate_auth_token(
            &token,
            now + Duration::hours(1) - Duration::milliseconds(1)
        ));
        assert!(!validate_auth_token(&token, now + Duration::hours(1)));
        assert!(!validate_auth_token(
            &token,
            now + Duration::hours(1) + Duration::milliseconds(1)
        ));
    }
}

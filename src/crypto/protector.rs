use base64::{Engine as _, engine::general_purpose};
use uuid::Uuid;

use crate::crypto::aes::{self, SecureKey, NONCE_SIZE, TAG_SIZE};
use crate::error::{AppError, Result};

/// Associated data bound into every protected session token, so ciphertexts
/// minted for another purpose under the same key never verify here.
pub const SESSION_TOKEN_PURPOSE: &[u8] = b"access-token-protector";

/// Reversible, tamper-evident wrapping of opaque byte strings.
pub trait TokenProtector: Send + Sync {
    /// Wraps `plaintext` into a value the caller cannot read or forge.
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Inverts [`TokenProtector::protect`].
    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>>;
}

/// AES-256-GCM token protector with a single versioned key.
///
/// Layout: `[version (1)] || [nonce (12)] || [ciphertext || tag (16)]`.
#[derive(Clone)]
pub struct AesTokenProtector {
    key: SecureKey,
    version: u8,
}

impl AesTokenProtector {
    /// Creates a protector from raw key bytes.
    pub fn new(key: &[u8], version: u8) -> Result<Self> {
        Ok(Self {
            key: SecureKey::from_slice(key)?,
            version,
        })
    }
}

impl TokenProtector for AesTokenProtector {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let (ciphertext, nonce) = aes::encrypt(&self.key, plaintext, SESSION_TOKEN_PURPOSE)?;

        let mut protected = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        protected.push(self.version);
        protected.extend_from_slice(&nonce);
        protected.extend_from_slice(&ciphertext);
        Ok(protected)
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>> {
        let (version, rest) = protected
            .split_first()
            .ok_or(AppError::InvalidSessionToken)?;

        if *version != self.version {
            tracing::debug!("Session token key version {} does not match {}", version, self.version);
            return Err(AppError::InvalidSessionToken);
        }

        if rest.len() < NONCE_SIZE + TAG_SIZE {
            return Err(AppError::InvalidSessionToken);
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
        let nonce: [u8; NONCE_SIZE] = nonce
            .try_into()
            .map_err(|_| AppError::InvalidSessionToken)?;

        aes::decrypt(&self.key, ciphertext, &nonce, SESSION_TOKEN_PURPOSE)
            .map_err(|_| AppError::InvalidSessionToken)
    }
}

/// Turns an account id into the URL-safe session token handed to callers.
pub fn protect_id(protector: &dyn TokenProtector, id: Uuid) -> Result<String> {
    let protected = protector.protect(id.to_string().as_bytes())?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(protected))
}

/// Resolves a session token back to the account id it was minted from.
pub fn unprotect_id(protector: &dyn TokenProtector, token: &str) -> Result<Uuid> {
    let protected = general_purpose::URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| AppError::InvalidSessionToken)?;

    let plaintext = protector.unprotect(&protected)?;

    std::str::from_utf8(&plaintext)
        .ok()
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or(AppError::InvalidSessionToken)
}

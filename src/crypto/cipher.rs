// ABOUTME: AES-256-GCM encryption for third-party tokens stored in the database
// ABOUTME: Ciphertext is nonce || ciphertext, base64 encoded for a TEXT column
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

use crate::errors::{AppError, AppResult};

const NONCE_LEN: usize = 12;

/// Symmetric cipher for OAuth access and refresh tokens at rest
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    /// Create a cipher from a 256-bit key
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(GenericArray::from_slice(key)),
        }
    }

    /// Encrypt a token with a fresh random nonce
    ///
    /// # Errors
    ///
    /// Returns an internal error if encryption fails
    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(GenericArray::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::internal(format!("Token encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a value produced by [`TokenCipher::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns an internal error if the value is malformed, was produced with
    /// another key, or was tampered with
    pub fn decrypt(&self, encoded: &str) -> AppResult<String> {
        let data = STANDARD
            .decode(encoded)
            .map_err(|e| AppError::internal(format!("Stored token is not base64: {e}")))?;
        if data.len() <= NONCE_LEN {
            return Err(AppError::internal("Stored token is too short"));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::internal("Stored token failed authentication"))?;
        String::from_utf8(plaintext)
            .map_err(|e| AppError::internal(format!("Stored token is not UTF-8: {e}")))
    }
}

//! Envelope encryption: one fresh AES-256-GCM key and IV per object.
//!
//! The cipher works on a single contiguous buffer, so [`EnvelopeCipher::encrypt`]
//! drains the whole input stream before sealing. This is not streaming
//! encryption; memory use is proportional to the file size.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// GCM IV length in bytes (96 bits).
pub const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes, appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// A one-time symmetric key and IV.
///
/// Never persisted by the client and wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricEnvelope {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl SymmetricEnvelope {
    pub fn from_parts(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

impl fmt::Debug for SymmetricEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricEnvelope(<redacted>)")
    }
}

/// Stateless AES-256-GCM adapter.
///
/// Holds nothing between calls, so one instance can be shared process-wide.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvelopeCipher;

impl EnvelopeCipher {
    pub fn new() -> Self {
        Self
    }

    /// Draw a fresh key and IV from the OS CSPRNG.
    pub fn generate_envelope(&self) -> Result<SymmetricEnvelope> {
        let mut envelope = SymmetricEnvelope {
            key: [0u8; KEY_LEN],
            iv: [0u8; IV_LEN],
        };
        OsRng
            .try_fill_bytes(&mut envelope.key)
            .map_err(|e| CoreError::EntropySourceUnavailable(e.to_string()))?;
        OsRng
            .try_fill_bytes(&mut envelope.iv)
            .map_err(|e| CoreError::EntropySourceUnavailable(e.to_string()))?;
        Ok(envelope)
    }

    /// Drain `plaintext`, then seal it under a fresh envelope.
    ///
    /// Returns the envelope and `ciphertext || tag`.
    pub async fn encrypt<R>(&self, mut plaintext: R) -> Result<(SymmetricEnvelope, Bytes)>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        plaintext
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CoreError::CipherBackendError(format!("reading plaintext: {}", e)))?;

        let envelope = self.generate_envelope()?;
        let sealed = self.seal(&envelope, &buf);
        buf.zeroize();
        Ok((envelope, sealed?))
    }

    /// Drain `ciphertext`, then open it with `envelope`.
    pub async fn decrypt<R>(&self, mut ciphertext: R, envelope: &SymmetricEnvelope) -> Result<Bytes>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        ciphertext
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CoreError::CipherBackendError(format!("reading ciphertext: {}", e)))?;
        self.open(envelope, &buf)
    }

    /// Seal an in-memory buffer.
    pub fn seal(&self, envelope: &SymmetricEnvelope, plaintext: &[u8]) -> Result<Bytes> {
        let cipher = Aes256Gcm::new_from_slice(&envelope.key)
            .map_err(|e| CoreError::CipherBackendError(e.to_string()))?;
        let nonce = Nonce::from_slice(&envelope.iv);
        cipher
            .encrypt(nonce, plaintext)
            .map(Bytes::from)
            .map_err(|_| CoreError::CipherBackendError("encryption failed".into()))
    }

    /// Open an in-memory buffer.
    ///
    /// A failed tag check (tampering, wrong key, wrong IV, or input shorter
    /// than the tag) is [`CoreError::AuthenticationTagMismatch`].
    pub fn open(&self, envelope: &SymmetricEnvelope, ciphertext: &[u8]) -> Result<Bytes> {
        let cipher = Aes256Gcm::new_from_slice(&envelope.key)
            .map_err(|e| CoreError::CipherBackendError(e.to_string()))?;
        let nonce = Nonce::from_slice(&envelope.iv);
        cipher
            .decrypt(nonce, ciphertext)
            .map(Bytes::from)
            .map_err(|_| CoreError::AuthenticationTagMismatch)
    }
}

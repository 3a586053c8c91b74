//! ECDSA P-256 key and signature types.
//!
//! Signing hashes the message with SHA3-256 and signs the digest, which is
//! the pairing account keys register as `ECDSA_P256` / `SHA3_256`.

use crate::error::{LoadError, LoadResult};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// P-256 private key length in bytes.
pub const PRIVATE_KEY_LENGTH: usize = 32;
/// P-256 public key length in bytes: the uncompressed point without its
/// SEC1 tag byte.
pub const PUBLIC_KEY_LENGTH: usize = 64;
/// P-256 signature length in bytes (`r || s`).
pub const SIGNATURE_LENGTH: usize = 64;

const UNCOMPRESSED_TAG: u8 = 0x04;

fn sha3_digest(message: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(message);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// A P-256 private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generates a new random private key.
    pub fn generate() -> Self {
        Self {
            inner: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Creates a private key from a 32-byte scalar.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidPrivateKey`] if the length is wrong or the
    /// scalar is out of range.
    pub fn from_bytes(bytes: &[u8]) -> LoadResult<Self> {
        if bytes.len() != PRIVATE_KEY_LENGTH {
            return Err(LoadError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LENGTH,
                bytes.len()
            )));
        }
        let inner =
            SigningKey::from_slice(bytes).map_err(|e| LoadError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Creates a private key from a hex string (optional `0x` prefix).
    pub fn from_hex(hex_str: &str) -> LoadResult<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Returns the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: *self.inner.verifying_key(),
        }
    }

    /// Hashes the message with SHA3-256 and signs the digest.
    pub fn sign(&self, message: &[u8]) -> LoadResult<Signature> {
        let inner = self
            .inner
            .sign_prehash(&sha3_digest(message))
            .map_err(|e| LoadError::Signing(e.to_string()))?;
        Ok(Signature { inner })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

/// A P-256 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Creates a public key from its 64 raw coordinate bytes.
    pub fn from_bytes(bytes: &[u8]) -> LoadResult<Self> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(LoadError::Signing(format!(
                "public key: expected {} bytes, got {}",
                PUBLIC_KEY_LENGTH,
                bytes.len()
            )));
        }
        let mut sec1 = Vec::with_capacity(PUBLIC_KEY_LENGTH + 1);
        sec1.push(UNCOMPRESSED_TAG);
        sec1.extend_from_slice(bytes);
        let inner =
            VerifyingKey::from_sec1_bytes(&sec1).map_err(|e| LoadError::Signing(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Returns the raw `x || y` coordinates.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        #[allow(unused_imports)]
        use p256::elliptic_curve::sec1::ToEncodedPoint;
        let point = self.inner.to_encoded_point(false);
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        bytes.copy_from_slice(&point.as_bytes()[1..]);
        bytes
    }

    /// Returns the public key as hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Verifies a signature over a message, hashing it the way
    /// [`PrivateKey::sign`] does.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> LoadResult<()> {
        self.inner
            .verify_prehash(&sha3_digest(message), &signature.inner)
            .map_err(|e| LoadError::Signing(e.to_string()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// A P-256 ECDSA signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    inner: p256::ecdsa::Signature,
}

impl Signature {
    /// Creates a signature from `r || s`.
    pub fn from_bytes(bytes: &[u8]) -> LoadResult<Self> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(LoadError::Signing(format!(
                "signature: expected {} bytes, got {}",
                SIGNATURE_LENGTH,
                bytes.len()
            )));
        }
        let inner = p256::ecdsa::Signature::from_slice(bytes)
            .map_err(|e| LoadError::Signing(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Returns `r || s`.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes.copy_from_slice(&self.inner.to_bytes());
        bytes
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.to_bytes()))
    }
}

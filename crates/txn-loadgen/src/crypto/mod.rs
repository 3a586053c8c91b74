//! Keys, signers and key generation.
//!
//! The submission engine only sees the [`Signer`] trait and account creation
//! only sees [`KeyProvider`]; the ECDSA P-256 types here are the in-process
//! implementations.

mod ecdsa_p256;

pub use ecdsa_p256::{
    PrivateKey, PublicKey, Signature, PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};

use crate::error::LoadResult;
use rlp::RlpStream;

/// Weight at which a single key can authorize a transaction alone.
pub const KEY_WEIGHT_THRESHOLD: u32 = 1000;

/// A capability to sign envelope messages for one account key.
pub trait Signer: Send + Sync {
    /// Signs a message.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Signing`](crate::error::LoadError::Signing) if
    /// no signature can be produced, as remote or hardware-backed signers may.
    fn sign(&self, message: &[u8]) -> LoadResult<Signature>;

    /// Returns the public key matching this signer.
    fn public_key(&self) -> PublicKey;
}

/// Generates fresh key material for new accounts.
pub trait KeyProvider: Send + Sync {
    /// Generates a new private key. The public key is derived from it.
    fn generate_private_key(&self) -> LoadResult<PrivateKey>;
}

/// Signs with a private key held in process memory.
#[derive(Debug)]
pub struct InMemorySigner {
    private_key: PrivateKey,
}

impl InMemorySigner {
    /// Creates a signer that owns the given key.
    pub fn new(private_key: PrivateKey) -> Self {
        Self { private_key }
    }
}

impl Signer for InMemorySigner {
    fn sign(&self, message: &[u8]) -> LoadResult<Signature> {
        self.private_key.sign(message)
    }

    fn public_key(&self) -> PublicKey {
        self.private_key.public_key()
    }
}

/// Generates P-256 keys from the operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct P256KeyProvider;

impl KeyProvider for P256KeyProvider {
    fn generate_private_key(&self) -> LoadResult<PrivateKey> {
        Ok(PrivateKey::generate())
    }
}

/// Signature algorithm of an account key, by its on-chain code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SignatureAlgorithm {
    /// ECDSA over NIST P-256
    EcdsaP256 = 2,
}

/// Hash algorithm applied before signing, by its on-chain code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum HashAlgorithm {
    /// SHA3-256
    Sha3_256 = 3,
}

/// A public key as registered on an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountKey {
    public_key: Vec<u8>,
    signature_algorithm: SignatureAlgorithm,
    hash_algorithm: HashAlgorithm,
    weight: u32,
}

impl AccountKey {
    /// A full-weight key for the given public key.
    pub fn new(public_key: &PublicKey) -> Self {
        Self {
            public_key: public_key.to_bytes().to_vec(),
            signature_algorithm: SignatureAlgorithm::EcdsaP256,
            hash_algorithm: HashAlgorithm::Sha3_256,
            weight: KEY_WEIGHT_THRESHOLD,
        }
    }

    /// Sets the key weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Returns the key weight.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// RLP-encodes the key as `[public_key, signature_algorithm,
    /// hash_algorithm, weight]`, the form `addPublicKey` accepts.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        stream.append(&self.public_key);
        stream.append(&(self.signature_algorithm as u8));
        stream.append(&(self.hash_algorithm as u8));
        stream.append(&self.weight);
        stream.out().to_vec()
    }
}

//! Passphrase encryption
//!
//! Implements the [`EncryptionService`] contract with Argon2id key
//! derivation and AES-256-GCM or ChaCha20-Poly1305 sealing.
//!
//! Blob layout (base64, standard alphabet):
//!
//! ```text
//! [version(1)][algorithm(1)][m_cost(4 LE)][t_cost(4 LE)][p_cost(4 LE)][salt(16)][nonce(12)][ciphertext+tag]
//! ```
//!
//! The KDF parameters travel with each blob so a blob sealed on a
//! low-power host opens anywhere.

use crate::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Argon2, ParamsBuilder, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use teller_core::EncryptionService;
use zeroize::Zeroizing;

const BLOB_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + 1 + 12 + SALT_LEN + NONCE_LEN;

// Refuse to run a KDF a hostile blob asks for beyond these.
const MAX_MEMORY_KIB: u32 = 1 << 20;
const MAX_ITERATIONS: u32 = 64;
const MAX_PARALLELISM: u32 = 64;

/// Encryption algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    /// AES-256-GCM
    #[serde(rename = "aes-256-gcm")]
    AesGcm,
    /// ChaCha20-Poly1305
    #[default]
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl EncryptionAlgorithm {
    fn id(&self) -> u8 {
        match self {
            Self::AesGcm => 0,
            Self::ChaCha20Poly1305 => 1,
        }
    }

    fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::AesGcm),
            1 => Ok(Self::ChaCha20Poly1305),
            other => Err(Error::Decryption(format!(
                "Unknown encryption algorithm: {}",
                other
            ))),
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Iterations
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 iterations, 4 lanes
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests and constrained hosts
    pub const fn light() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn within_limits(&self) -> bool {
        self.memory_kib <= MAX_MEMORY_KIB
            && (1..=MAX_ITERATIONS).contains(&self.iterations)
            && (1..=MAX_PARALLELISM).contains(&self.parallelism)
    }
}

/// Symmetric key derived from a passphrase
pub struct MasterKey {
    key: Zeroizing<[u8; 32]>,
    algorithm: EncryptionAlgorithm,
}

impl MasterKey {
    /// Derive from passphrase and salt with Argon2id
    pub fn derive(
        passphrase: &str,
        salt: &[u8],
        params: KdfParams,
        algorithm: EncryptionAlgorithm,
    ) -> Result<Self> {
        Ok(Self {
            key: derive_key_bytes(passphrase, salt, params)?,
            algorithm,
        })
    }

    /// Encrypt under `nonce`
    pub fn encrypt(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = match self.algorithm {
            EncryptionAlgorithm::AesGcm => Aes256Gcm::new(self.key.as_ref().into())
                .encrypt(Nonce::from_slice(nonce), plaintext),
            EncryptionAlgorithm::ChaCha20Poly1305 => {
                ChaCha20Poly1305::new(self.key.as_ref().into())
                    .encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext)
            }
        };
        sealed.map_err(|e| Error::Encryption(e.to_string()))
    }

    /// Decrypt and authenticate
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let opened = match self.algorithm {
            EncryptionAlgorithm::AesGcm => Aes256Gcm::new(self.key.as_ref().into())
                .decrypt(Nonce::from_slice(nonce), ciphertext),
            EncryptionAlgorithm::ChaCha20Poly1305 => {
                ChaCha20Poly1305::new(self.key.as_ref().into())
                    .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
            }
        };
        opened
            .map(Zeroizing::new)
            .map_err(|_| Error::Decryption("Authentication failed".to_string()))
    }
}

/// Derive raw key bytes from passphrase using Argon2id.
pub fn derive_key_bytes(
    passphrase: &str,
    salt: &[u8],
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>> {
    if salt.len() < SALT_LEN {
        return Err(Error::Encryption("Salt too short".to_string()));
    }

    let argon_params = ParamsBuilder::new()
        .m_cost(params.memory_kib)
        .t_cost(params.iterations)
        .p_cost(params.parallelism)
        .output_len(32)
        .build()
        .map_err(|e| Error::Encryption(e.to_string()))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut *key)
        .map_err(|e| Error::Encryption(e.to_string()))?;
    Ok(key)
}

/// Generate a random salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Argon2id + AEAD implementation of [`EncryptionService`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PassphraseEncryption {
    algorithm: EncryptionAlgorithm,
    kdf: KdfParams,
}

impl PassphraseEncryption {
    /// Create with explicit algorithm and KDF cost
    pub fn new(algorithm: EncryptionAlgorithm, kdf: KdfParams) -> Self {
        Self { algorithm, kdf }
    }

    /// ChaCha20-Poly1305 with [`KdfParams::light`]
    pub fn light() -> Self {
        Self::new(EncryptionAlgorithm::ChaCha20Poly1305, KdfParams::light())
    }

    /// Algorithm used for new blobs
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// KDF cost used for new blobs
    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Seal into the binary blob layout
    pub fn seal(&self, passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let salt = generate_salt();
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = MasterKey::derive(passphrase, &salt, self.kdf, self.algorithm)?;
        let ciphertext = key.encrypt(&nonce, plaintext)?;

        let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        blob.push(BLOB_VERSION);
        blob.push(self.algorithm.id());
        blob.extend_from_slice(&self.kdf.memory_kib.to_le_bytes());
        blob.extend_from_slice(&self.kdf.iterations.to_le_bytes());
        blob.extend_from_slice(&self.kdf.parallelism.to_le_bytes());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Open a binary blob; algorithm and KDF cost come from its header
    pub fn open(&self, passphrase: &str, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if blob.len() < HEADER_LEN + TAG_LEN {
            return Err(Error::Decryption("Invalid ciphertext length".to_string()));
        }
        if blob[0] != BLOB_VERSION {
            return Err(Error::Decryption(format!(
                "Unsupported encryption version: {}",
                blob[0]
            )));
        }
        let algorithm = EncryptionAlgorithm::from_id(blob[1])?;
        let kdf = KdfParams {
            memory_kib: read_u32(&blob[2..6]),
            iterations: read_u32(&blob[6..10]),
            parallelism: read_u32(&blob[10..14]),
        };
        if !kdf.within_limits() {
            return Err(Error::Decryption("KDF parameters out of range".to_string()));
        }

        let salt = &blob[14..14 + SALT_LEN];
        let nonce = &blob[14 + SALT_LEN..HEADER_LEN];
        let ciphertext = &blob[HEADER_LEN..];

        // A bad passphrase can only ever surface as an authentication failure.
        let key = MasterKey::derive(passphrase, salt, kdf, algorithm)
            .map_err(|e| Error::Decryption(e.to_string()))?;
        key.decrypt(nonce, ciphertext)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

impl EncryptionService for PassphraseEncryption {
    fn encrypt(&self, passphrase: &str, plaintext: &[u8]) -> teller_core::Result<String> {
        let blob = self.seal(passphrase, plaintext)?;
        Ok(BASE64.encode(blob))
    }

    fn decrypt(&self, passphrase: &str, ciphertext: &str) -> teller_core::Result<Zeroizing<Vec<u8>>> {
        let blob = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| Error::Decryption(format!("Invalid base64: {}", e)))?;
        Ok(self.open(passphrase, &blob)?)
    }
}

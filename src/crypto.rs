use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

const FORMAT_VERSION: u8 = 2;
const SALT_LEN: usize = 32;
const PARAMS_LEN: usize = 12;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 1 + SALT_LEN + PARAMS_LEN + NONCE_LEN;
const KEY_LEN: usize = 32;
/// Upper bound on a header's memory cost (4 GiB); anything larger is corruption.
const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;
/// Prefix of every plaintext; a wrong passphrase cannot reproduce it.
const MAGIC: &[u8] = b"FEMCYCLE_V1";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed: wrong passphrase or corrupted store")]
    Decryption,
    #[error("invalid store format")]
    InvalidFormat,
    #[error("unsupported store format version {0}")]
    UnsupportedVersion(u8),
}

/// Argon2id cost parameters for deriving the store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    fn derive_key(
        &self,
        passphrase: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|_| CryptoError::KeyDerivation)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
            .map_err(|_| CryptoError::KeyDerivation)?;
        Ok(key)
    }

    fn to_bytes(self) -> [u8; PARAMS_LEN] {
        let mut out = [0u8; PARAMS_LEN];
        out[0..4].copy_from_slice(&self.memory_kib.to_le_bytes());
        out[4..8].copy_from_slice(&self.iterations.to_le_bytes());
        out[8..12].copy_from_slice(&self.parallelism.to_le_bytes());
        out
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let word = |i: usize| -> Result<u32, CryptoError> {
            bytes
                .get(i..i + 4)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_le_bytes)
                .ok_or(CryptoError::InvalidFormat)
        };
        let params = Self {
            memory_kib: word(0)?,
            iterations: word(4)?,
            parallelism: word(8)?,
        };
        if params.memory_kib > MAX_MEMORY_KIB || params.iterations == 0 || params.parallelism == 0 {
            return Err(CryptoError::InvalidFormat);
        }
        Ok(params)
    }
}

/// Seal `plaintext` under a key derived from `passphrase` with cost `kdf`.
///
/// Layout: version (1) || salt (32) || kdf params (12, LE u32 m/t/p) || nonce (12)
/// || AES-256-GCM ciphertext of MAGIC || plaintext. The header is authenticated
/// as associated data, so its cost parameters cannot be altered unnoticed.
pub fn seal(kdf: &KdfParams, passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce_bytes);

    let key = kdf.derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::Encryption)?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.push(FORMAT_VERSION);
    header.extend_from_slice(&salt);
    header.extend_from_slice(&kdf.to_bytes());
    header.extend_from_slice(&nonce_bytes);

    let mut payload = Zeroizing::new(Vec::with_capacity(MAGIC.len() + plaintext.len()));
    payload.extend_from_slice(MAGIC);
    payload.extend_from_slice(plaintext);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: payload.as_slice(),
                aad: &header,
            },
        )
        .map_err(|_| CryptoError::Encryption)?;

    let mut sealed = header;
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Cost parameters recorded in a sealed header.
pub fn sealed_params(sealed: &[u8]) -> Result<KdfParams, CryptoError> {
    if sealed.len() < HEADER_LEN + MAGIC.len() {
        return Err(CryptoError::InvalidFormat);
    }
    if sealed[0] != FORMAT_VERSION {
        return Err(CryptoError::UnsupportedVersion(sealed[0]));
    }
    KdfParams::from_bytes(&sealed[1 + SALT_LEN..1 + SALT_LEN + PARAMS_LEN])
}

/// Open bytes produced by [`seal`], using the cost parameters stored in them.
pub fn open(passphrase: &str, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let kdf = sealed_params(sealed)?;
    let (header, ciphertext) = sealed.split_at(HEADER_LEN);
    let salt = &header[1..1 + SALT_LEN];
    let nonce_bytes = &header[1 + SALT_LEN + PARAMS_LEN..];

    let key = kdf.derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::Decryption)?;

    let mut decrypted = cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| CryptoError::Decryption)?;

    if !decrypted.starts_with(MAGIC) {
        decrypted.zeroize();
        return Err(CryptoError::Decryption);
    }

    let plaintext = decrypted[MAGIC.len()..].to_vec();
    decrypted.zeroize();
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> KdfParams {
        KdfParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn sealed_store_opens_with_same_passphrase() {
        let sealed = seal(&cheap(), "test-passphrase-123", b"{\"users\":[]}").unwrap();
        let opened = open("test-passphrase-123", &sealed).unwrap();
        assert_eq!(opened, b"{\"users\":[]}");
    }

    #[test]
    fn wrong_passphrase_fails() {
        let sealed = seal(&cheap(), "correct", b"secret cycles").unwrap();
        assert!(matches!(
            open("wrong", &sealed),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn truncated_store_is_invalid() {
        assert!(matches!(
            open("any", &[FORMAT_VERSION; 10]),
            Err(CryptoError::InvalidFormat)
        ));
    }

    #[test]
    fn each_seal_uses_fresh_salt_and_nonce() {
        let a = seal(&cheap(), "pass", b"same").unwrap();
        let b = seal(&cheap(), "pass", b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn cost_parameters_travel_with_the_ciphertext() {
        let cost = KdfParams {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        };
        let sealed = seal(&cost, "pass", b"cycles").unwrap();

        assert_eq!(sealed_params(&sealed).unwrap(), cost);
        assert_eq!(open("pass", &sealed).unwrap(), b"cycles");
    }

    #[test]
    fn tampered_cost_parameters_are_detected() {
        let mut sealed = seal(&cheap(), "pass", b"cycles").unwrap();
        // Bump the iteration count in the header.
        sealed[1 + SALT_LEN + 4] = 2;
        assert!(matches!(
            open("pass", &sealed),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut sealed = seal(&cheap(), "pass", b"cycles").unwrap();
        sealed[0] = 1;
        assert!(matches!(
            open("pass", &sealed),
            Err(CryptoError::UnsupportedVersion(1))
        ));
    }
}

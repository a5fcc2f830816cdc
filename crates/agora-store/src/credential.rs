use std::fmt;

use rand::RngCore;

/// Salted, one-way digest of a user credential.
///
/// The store only ever keeps this digest; the plaintext is dropped as soon
/// as it has been hashed.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash {
    salt: [u8; 16],
    digest: [u8; 32],
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialHash({}..)", hex::encode(&self.digest[..4]))
    }
}

/// Domain-separated BLAKE3 credential hasher.
///
/// The domain tag and a per-credential random salt are prepended to the
/// secret, so equal passwords never share a digest.
pub struct CredentialHasher {
    domain: &'static str,
}

impl CredentialHasher {
    /// Hasher for user passwords.
    pub const PASSWORD: Self = Self::new("agora-password-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash `secret` under a fresh random salt.
    pub fn hash(&self, secret: &str) -> CredentialHash {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        self.hash_with_salt(secret, salt)
    }

    /// Hash `secret` under a caller-chosen salt.
    pub fn hash_with_salt(&self, secret: &str, salt: [u8; 16]) -> CredentialHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&salt);
        hasher.update(b":");
        hasher.update(secret.as_bytes());
        CredentialHash {
            salt,
            digest: *hasher.finalize().as_bytes(),
        }
    }

    /// Check `secret` against a stored digest.
    pub fn verify(&self, secret: &str, stored: &CredentialHash) -> bool {
        self.hash_with_salt(secret, stored.salt) == *stored
    }
}

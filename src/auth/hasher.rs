use crate::error::AppError;
use crate::Result;

/// Lowest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;
/// Highest work factor bcrypt accepts.
pub const MAX_COST: u32 = 31;
/// bcrypt only reads this many bytes of input; longer plaintexts would be
/// silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// One-way password hashing with a dedicated verify step.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    /// Produces a salted digest of `plaintext`.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Checks `plaintext` against a digest produced by [`hash`](Self::hash).
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::ValidationError(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    // bcrypt::verify compares digests in constant time
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        // Never stored, and its first 72 bytes could match a stored password
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        Ok(bcrypt::verify(plaintext, digest)?)
    }
}

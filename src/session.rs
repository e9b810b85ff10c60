/// Digest of the built-in admin password. The password itself is never
/// stored; equality of digests is the only success criterion.
const ADMIN_PASSWORD_HASH: &str =
    "92b4a2f3b3bfb0538c9a9a88aa65e5eb9e92891c1b1e55fcef70b712cb9aa43b";

/// Admin-mode gate. The flag lives only in memory; every run starts
/// unauthenticated regardless of what state is on disk.
#[derive(Clone, Debug)]
pub struct Session {
    stored_hash: String,
    is_admin: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_hash(ADMIN_PASSWORD_HASH.to_string())
    }
}

impl Session {
    pub fn with_hash(stored_hash: String) -> Self {
        Self {
            stored_hash,
            is_admin: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Compares the digest of the supplied password against the stored
    /// digest. No rate limiting, no lockout; a failed attempt is
    /// indistinguishable from any other rejection.
    pub fn authenticate(&mut self, password: &str) -> bool {
        if hash_password(password) == self.stored_hash {
            self.is_admin = true;
        }
        self.is_admin
    }

    pub fn logout(&mut self) {
        self.is_admin = false;
    }
}

pub fn hash_password(password: &str) -> String {
    blake3::hash(password.as_bytes()).to_hex().to_string()
}

// file: src/stages/secrets.rs
// version: 1.0.1
// guid: 8e52a1f7-c609-4db8-b3e4-76f09d2c185a

//! Secret generation stage
//!
//! Credentials are produced once per run from a cryptographically secure
//! source and held in memory only; the datastore stage and the summary
//! reporter persist what they need. Regenerating after the datastore stage
//! has consumed a secret would desynchronize external state, so secrets are
//! generated exactly once, up front.

use rand::distributions::{Alphanumeric, DistString};

/// Generated credential length
pub const SECRET_LENGTH: usize = 24;

/// Credentials generated for a single run
#[derive(Debug, Clone)]
pub struct Secrets {
    /// Password for the panel's datastore account
    pub db_password: String,
}

impl Secrets {
    /// Generate the run's credentials
    pub fn generate() -> Self {
        Self {
            db_password: generate_secret(SECRET_LENGTH),
        }
    }
}

/// Generate a random alphanumeric secret
///
/// Alphanumeric only: generated values are spliced into SQL statements and
/// configuration files, so shell- and quote-significant characters are
/// excluded by construction. `thread_rng` is a CSPRNG.
pub fn generate_secret(length: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), length)
}

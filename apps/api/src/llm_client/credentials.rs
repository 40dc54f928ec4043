//! Credential Pool: the ordered set of Gemini API keys and the active index.
//!
//! The pool is process-wide: one instance is built at startup and shared by
//! every request through `Arc`. A rotation triggered by one request's failure
//! changes the key the next, unrelated request starts on. The index is atomic
//! so handlers on the multi-threaded runtime can share it without a lock.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No usable API credential configured (set GEMINI_API_KEY or GEMINI_API_KEYS)")]
    NoCredentials,
}

/// An opaque API secret. Identified only by its position in the pool.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

pub struct CredentialPool {
    credentials: Vec<Credential>,
    active: AtomicUsize,
}

impl CredentialPool {
    /// Builds a pool from raw key strings, dropping blank entries but keeping order.
    pub fn new<I, S>(keys: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials: Vec<Credential> = keys
            .into_iter()
            .map(Into::into)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(Credential)
            .collect();

        if credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }

        Ok(Self {
            credentials,
            active: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns the active credential together with its index.
    pub fn active_credential(&self) -> (usize, Credential) {
        let index = self.active_index();
        (index, self.credentials[index].clone())
    }

    /// Advances the active index cyclically.
    ///
    /// Returns `false` when the pool holds a single credential, signalling that
    /// further rotation cannot reach a different key.
    pub fn rotate(&self) -> bool {
        let size = self.credentials.len();
        let previous = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1) % size))
            .unwrap_or_else(|i| i);
        let next = (previous + 1) % size;

        if size > 1 {
            warn!("Switching API credential: index {previous} -> {next}");
        }
        size > 1
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.len())
            .field("active", &self.active_index())
            .finish()
    }
}

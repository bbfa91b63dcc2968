//! Key persistence.
//!
//! A [`KeyStore`] is an owned value handed to whatever needs the local key
//! pair. It loads the pair from its backend at most once and then serves
//! the cached copy; it never regenerates a pair it already holds.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::cipher::CryptoError;
use crate::keys::KeyPair;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("no key pair stored")]
    NotFound,
    #[error("refusing to overwrite existing key at {0}")]
    AlreadyExists(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Where a key pair lives between runs.
pub trait KeyBackend: Send + Sync {
    /// Fetch the stored pair, or [`KeyStoreError::NotFound`].
    fn load(&self) -> Result<KeyPair, KeyStoreError>;

    /// Persist a pair. Backends may refuse to replace an existing one.
    fn store(&self, pair: &KeyPair) -> Result<(), KeyStoreError>;
}

/// Keeps the pair in process memory only.
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<KeyPair>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: KeyPair) -> Self {
        Self {
            slot: Mutex::new(Some(pair)),
        }
    }
}

impl KeyBackend for MemoryBackend {
    fn load(&self) -> Result<KeyPair, KeyStoreError> {
        self.slot.lock().clone().ok_or(KeyStoreError::NotFound)
    }

    fn store(&self, pair: &KeyPair) -> Result<(), KeyStoreError> {
        *self.slot.lock() = Some(pair.clone());
        Ok(())
    }
}

/// PKCS#1 PEM private key on disk, with the public key written next to it
/// as `<path>.pub`.
pub struct PemFileBackend {
    path: PathBuf,
}

impl PemFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn public_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".pub");
        PathBuf::from(name)
    }
}

fn create_new(path: &Path) -> io::Result<fs::File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

impl KeyBackend for PemFileBackend {
    fn load(&self) -> Result<KeyPair, KeyStoreError> {
        let pem = match fs::read_to_string(&self.path) {
            Ok(pem) => pem,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(KeyStoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(KeyPair::from_pem(&pem)?)
    }

    fn store(&self, pair: &KeyPair) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let private_pem = pair.to_pem()?;
        let mut file = match create_new(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(KeyStoreError::AlreadyExists(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(private_pem.as_bytes())?;
        file.sync_all()?;

        fs::write(self.public_path(), pair.verifying().to_pem()?)?;
        Ok(())
    }
}

/// Owned handle to the local key pair.
pub struct KeyStore {
    backend: Box<dyn KeyBackend>,
    cache: OnceLock<Arc<KeyPair>>,
}

impl KeyStore {
    pub fn new(backend: impl KeyBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            cache: OnceLock::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn pem_file(path: impl Into<PathBuf>) -> Self {
        Self::new(PemFileBackend::new(path))
    }

    /// Read the pair from the backend, bypassing the cache.
    pub fn load(&self) -> Result<KeyPair, KeyStoreError> {
        self.backend.load()
    }

    /// Generate a fresh pair. Nothing is stored or cached.
    pub fn generate(&self, bits: usize) -> Result<KeyPair, KeyStoreError> {
        Ok(KeyPair::generate(bits)?)
    }

    /// The pair for this process: loaded on first use, then reused.
    pub fn cached(&self) -> Result<Arc<KeyPair>, KeyStoreError> {
        if let Some(pair) = self.cache.get() {
            return Ok(Arc::clone(pair));
        }
        let loaded = Arc::new(self.backend.load()?);
        Ok(Arc::clone(self.cache.get_or_init(|| loaded)))
    }

    /// Like [`cached`](Self::cached), but generates and persists a pair of
    /// `bits` bits when the backend has none.
    pub fn load_or_generate(&self, bits: usize) -> Result<Arc<KeyPair>, KeyStoreError> {
        match self.cached() {
            Ok(pair) => Ok(pair),
            Err(KeyStoreError::NotFound) => {
                let pair = self.generate(bits)?;
                self.backend.store(&pair)?;
                Ok(Arc::clone(self.cache.get_or_init(|| Arc::new(pair))))
            }
            Err(e) => Err(e),
        }
    }
}

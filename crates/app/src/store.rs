//! Persisted cart store
//!
//! A single slot holding the last known cart lines. Every write replaces the
//! whole slot; there are no partial writes.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use storefront::CartLine;
use thiserror::Error;

/// Storage key of the cart slot.
pub const CART_SLOT: &str = "cart";

/// Errors raised by a cart store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the slot failed.
    #[error("cart storage i/o error")]
    Io(#[from] io::Error),

    /// The slot holds something that is not a cart.
    #[error("stored cart is not valid json")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable slot for the cart snapshot.
pub trait CartStore: Send + Sync {
    /// Reads the stored lines; an empty slot yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot cannot be read or decoded.
    fn load(&self) -> Result<Vec<CartLine>, StoreError>;

    /// Overwrites the slot with the given lines.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot cannot be written.
    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError>;
}

/// Process-local store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    slot: Mutex<Option<String>>,
}

impl MemoryCartStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with raw slot contents.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    /// Raw slot contents.
    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CartStore for MemoryCartStore {
    fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        match slot.as_deref() {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(lines)?;

        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);

        Ok(())
    }
}

/// Store backed by a JSON file per slot inside a data directory.
#[derive(Debug, Clone)]
pub struct FileCartStore {
    path: PathBuf,
}

impl FileCartStore {
    /// Store writing the cart slot inside `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{CART_SLOT}.json")),
        }
    }

    /// Location of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStore for FileCartStore {
    fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let raw = serde_json::to_vec(lines)?;
        let staging = self.path.with_extension("json.tmp");

        fs::write(&staging, raw)?;
        fs::rename(&staging, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use storefront::ProductId;
    use testresult::TestResult;

    use super::*;

    fn line(id: &str, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: id.to_uppercase(),
            slug: id.to_string(),
            image_url: None,
            unit_price: 1_000,
            discount_price: None,
            discount_percent: None,
            quantity,
            available_stock: 10,
            in_stock: true,
        }
    }

    #[test]
    fn memory_store_starts_empty() -> TestResult {
        let store = MemoryCartStore::new();

        assert!(store.load()?.is_empty(), "new store should be empty");

        Ok(())
    }

    #[test]
    fn memory_store_overwrites_slot() -> TestResult {
        let store = MemoryCartStore::new();

        store.save(&[line("p1", 1), line("p2", 2)])?;
        store.save(&[line("p3", 3)])?;

        let lines = store.load()?;

        assert_eq!(lines, vec![line("p3", 3)]);

        Ok(())
    }

    #[test]
    fn corrupt_slot_is_reported() {
        let store = MemoryCartStore::with_raw("{not json");

        let result = store.load();

        assert!(
            matches!(result, Err(StoreError::Corrupt(_))),
            "expected corrupt slot, got {result:?}"
        );
    }

    #[test]
    fn file_store_missing_file_is_empty() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileCartStore::new(dir.path());

        assert!(store.load()?.is_empty(), "missing file should read as empty");

        Ok(())
    }

    #[test]
    fn file_store_survives_reopen() -> TestResult {
        let dir = tempfile::tempdir()?;

        FileCartStore::new(dir.path()).save(&[line("p1", 2)])?;

        let reopened = FileCartStore::new(dir.path());

        assert_eq!(reopened.load()?, vec![line("p1", 2)]);
        assert!(reopened.path().ends_with("cart.json"), "slot file name");

        Ok(())
    }

    #[test]
    fn file_store_creates_data_dir() -> TestResult {
        let dir = tempfile::tempdir()?;
        let store = FileCartStore::new(dir.path().join("nested").join("state"));

        store.save(&[])?;

        assert!(store.load()?.is_empty(), "saved empty cart should load empty");

        Ok(())
    }
}

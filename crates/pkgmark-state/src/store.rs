use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::fs_utils::remove_file_if_exists;
use crate::receipts::{read_install_receipt, update_receipt_flags};
use crate::{validate_package_name, InstallReceipt, MarkError, PrefixLayout};

/// Load, existence and write-back primitives the mark engine runs against.
pub trait MetadataStore {
    /// Held for the load-compare-write span of one package.
    type Guard;

    fn is_installed(&self, name: &str) -> Result<bool>;

    fn record_exists(&self, name: &str) -> bool;

    fn record_location(&self, name: &str) -> PathBuf;

    fn load_record(&self, name: &str) -> Result<InstallReceipt>;

    /// Persists the provenance flags of `receipt`, leaving other fields untouched.
    fn write_record(&self, receipt: &InstallReceipt) -> Result<()>;

    fn lock_package(&self, name: &str) -> Result<Self::Guard, MarkError>;
}

#[derive(Debug, Clone)]
pub struct ReceiptStore {
    layout: PrefixLayout,
}

impl ReceiptStore {
    pub fn new(layout: PrefixLayout) -> Self {
        Self { layout }
    }
}

impl MetadataStore for ReceiptStore {
    type Guard = PackageLock;

    fn is_installed(&self, name: &str) -> Result<bool> {
        if validate_package_name(name).is_err() {
            return Ok(false);
        }
        let root = self.layout.package_root(name);
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read package dir: {}", root.display()));
            }
        };

        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read package dir: {}", root.display()))?;
            if entry.file_type()?.is_dir() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn record_exists(&self, name: &str) -> bool {
        self.layout.receipt_path(name).is_file()
    }

    fn record_location(&self, name: &str) -> PathBuf {
        self.layout.receipt_path(name)
    }

    fn load_record(&self, name: &str) -> Result<InstallReceipt> {
        read_install_receipt(&self.layout, name)
    }

    fn write_record(&self, receipt: &InstallReceipt) -> Result<()> {
        update_receipt_flags(&self.layout, receipt)?;
        Ok(())
    }

    fn lock_package(&self, name: &str) -> Result<PackageLock, MarkError> {
        PackageLock::acquire(&self.layout, name)
    }
}

/// Lock file claimed with `create_new`; removed when dropped.
#[derive(Debug)]
pub struct PackageLock {
    path: PathBuf,
}

impl PackageLock {
    pub fn acquire(layout: &PrefixLayout, name: &str) -> Result<Self, MarkError> {
        let path = layout.lock_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(MarkError::Locked {
                    name: name.to_string(),
                    path,
                });
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("failed to claim package lock: {}", path.display()))
                    .into());
            }
        };

        let lock = Self { path };
        file.write_all(format!("{}\n", std::process::id()).as_bytes())
            .with_context(|| format!("failed to write package lock: {}", lock.path.display()))?;
        debug!(package = name, path = %lock.path.display(), "acquired package lock");
        Ok(lock)
    }
}

impl Drop for PackageLock {
    fn drop(&mut self) {
        match remove_file_if_exists(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "released package lock"),
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "failed to release package lock"
            ),
        }
    }
}

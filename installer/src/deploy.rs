// src/deploy.rs

//! Copying the driver binary into the system drivers directory and back out.

use log::Level;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use crate::error::{InstallerError, Result};
use crate::installer_log;

#[derive(Debug, Clone)]
pub struct DriverDeployer {
    source_dir: PathBuf,
    drivers_dir: PathBuf,
}

impl DriverDeployer {
    /// `source_dir` holds the package, `drivers_dir` is
    /// `%windir%\System32\Drivers`.
    pub fn new(source_dir: impl Into<PathBuf>, drivers_dir: impl Into<PathBuf>) -> Self {
        Self { source_dir: source_dir.into(), drivers_dir: drivers_dir.into() }
    }

    pub fn destination(&self, file_name: &str) -> PathBuf {
        self.drivers_dir.join(file_name)
    }

    /// Copy `file_name` into the drivers directory. An existing destination is
    /// never overwritten.
    pub fn deploy(&self, file_name: &str) -> Result<PathBuf> {
        let from = self.source_dir.join(file_name);
        let to = self.destination(file_name);

        copy_no_clobber(&from, &to).map_err(|source| InstallerError::FileCopy {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        installer_log!(Level::Info, "deploy", "Copied {} to {}", from.display(), to.display());
        Ok(to)
    }

    /// Delete a deployed file; one that is already gone counts as deleted.
    pub fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                installer_log!(Level::Info, "deploy", "Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                installer_log!(Level::Debug, "deploy", "{} already absent", path.display());
                Ok(())
            }
            Err(source) => Err(InstallerError::FileDelete { path: path.to_owned(), source }),
        }
    }
}

/// `CopyFile(.., bFailIfExists = TRUE)`: the destination is created
/// exclusively, and a partial copy is removed again.
fn copy_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    let mut src = File::open(from)?;
    let mut dst = OpenOptions::new().write(true).create_new(true).open(to)?;
    if let Err(e) = io::copy(&mut src, &mut dst).and_then(|_| dst.sync_all()) {
        drop(dst);
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

//! Virtual filesystem jail.
//!
//! All synthetic filesystem operations resolve against a fixed backing
//! root and are confined to it. The jail owns no in-memory tree — it
//! delegates to the backing directory structure, which is shared across
//! all sessions. Concurrent sessions can race on shared directories;
//! that mirrors a real multi-user filesystem and is accepted semantics.
//!
//! All I/O uses `tokio::fs` so a slow disk never stalls the runtime.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, OpenOptions};

#[derive(Debug, Error)]
pub enum JailError {
    #[error("not found")]
    NotFound,
    #[error("is a directory")]
    IsDirectory,
    #[error("{0}")]
    Io(std::io::Error),
}

fn map_io(e: std::io::Error) -> JailError {
    match e.kind() {
        std::io::ErrorKind::NotFound => JailError::NotFound,
        _ => JailError::Io(e),
    }
}

pub struct Jail {
    root: PathBuf,
    home: PathBuf,
}

impl Jail {
    /// `home` is relative to the root (e.g. `home/admin`).
    pub fn new(root: impl Into<PathBuf>, home: impl AsRef<Path>) -> Self {
        let root = root.into();
        let home = root.join(home);
        Self { root, home }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Resolves a command argument against `base` (the session's
    /// current directory).
    ///
    /// - `/` is the visible root marker and resolves to the sandbox root
    /// - an empty argument resolves to the synthetic home directory
    /// - a bare `..` resolves to the parent of `base`, except at the
    ///   root, where it is a no-op: the root has no parent
    /// - anything else is path-joined onto `base` and confinement-checked
    pub fn resolve(&self, base: &Path, arg: &str) -> Result<PathBuf, JailError> {
        if arg == "/" {
            return Ok(self.root.clone());
        }
        if arg.is_empty() {
            return Ok(self.home.clone());
        }
        if arg == ".." {
            if base == self.root.as_path() {
                return Ok(self.root.clone());
            }
            return Ok(base.parent().unwrap_or(&self.root).to_path_buf());
        }
        self.confine(base.join(arg))
    }

    /// Lexically verifies that `path` cannot climb above the sandbox
    /// root: `..` segments are counted against the depth below the
    /// root, and climbing past it is reported as `NotFound` — the same
    /// answer a missing path gets, so the boundary is never revealed.
    ///
    /// Beyond this check the path is kept as joined, without `..`
    /// collapsing; the backing filesystem resolves it.
    fn confine(&self, path: PathBuf) -> Result<PathBuf, JailError> {
        let rel = path.strip_prefix(&self.root).map_err(|_| JailError::NotFound)?;
        let mut depth: usize = 0;
        for component in rel.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::ParentDir => {
                    depth = depth.checked_sub(1).ok_or(JailError::NotFound)?;
                }
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => return Err(JailError::NotFound),
            }
        }
        Ok(path)
    }

    /// Renders a jailed path the way the client sees it: rooted at `/`,
    /// with the backing-store prefix stripped.
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => "/".to_string(),
            Ok(rel) => format!("/{}", rel.display()),
            Err(_) => "/".to_string(),
        }
    }

    pub async fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Entry names of a directory, sorted for stable output.
    pub async fn list(&self, path: &Path) -> Result<Vec<String>, JailError> {
        let mut entries = fs::read_dir(path).await.map_err(map_io)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(map_io)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    pub async fn read_file(&self, path: &Path) -> Result<Vec<u8>, JailError> {
        let meta = fs::metadata(path).await.map_err(map_io)?;
        if meta.is_dir() {
            return Err(JailError::IsDirectory);
        }
        fs::read(path).await.map_err(map_io)
    }

    /// Idempotent: an existing directory is not an error.
    pub async fn create_dir(&self, path: &Path) -> Result<(), JailError> {
        fs::create_dir_all(path).await.map_err(map_io)
    }

    /// Idempotent touch: creates the file if absent, leaves existing
    /// content untouched.
    pub async fn touch(&self, path: &Path) -> Result<(), JailError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(map_io)?;
        Ok(())
    }

    pub async fn remove_file(&self, path: &Path) -> Result<(), JailError> {
        fs::remove_file(path).await.map_err(map_io)
    }

    /// Truncates and overwrites.
    pub async fn write_text(&self, path: &Path, content: &str) -> Result<(), JailError> {
        fs::write(path, content).await.map_err(map_io)
    }

    pub async fn copy(&self, src: &Path, dest: &Path) -> Result<(), JailError> {
        fs::copy(src, dest).await.map_err(map_io)?;
        Ok(())
    }

    pub async fn rename(&self, src: &Path, dest: &Path) -> Result<(), JailError> {
        fs::rename(src, dest).await.map_err(map_io)
    }
}

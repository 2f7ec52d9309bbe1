//! TOML documents replaced atomically on save.
//!
//! Used for `config.toml`, which both the CLI and a running application may
//! write.

use chatsync_core::error::{ChatsyncError, Result};
use fs2::FileExt;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A TOML file holding one `T`.
///
/// Saves write a hidden sibling, fsync it and rename it over the target, so
/// readers see either the old or the new document. Read-modify-write cycles
/// go through [`AtomicTomlFile::locked`], which serialises writers across
/// processes with an advisory lock on `<name>.lock`.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file is missing or blank.
    pub fn load(&self) -> Result<Option<T>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(toml::from_str(&content)?))
    }

    pub fn save(&self, value: &T) -> Result<()> {
        let rendered = toml::to_string_pretty(value)?;
        replace_file(&self.path, rendered.as_bytes())
    }

    /// Runs `f` on the current contents while holding the writer lock.
    ///
    /// `f` decides whether anything is written by returning `Some(new_value)`.
    /// Nothing is written when it returns `None` or an error.
    pub fn locked<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Option<T>) -> Result<(Option<T>, R)>,
    {
        let _guard = WriterLock::acquire(&self.path)?;
        let (replacement, result) = f(self.load()?)?;
        if let Some(value) = replacement {
            self.save(&value)?;
        }
        Ok(result)
    }
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(ChatsyncError::io(format!(
            "Not a file path: {}",
            path.display()
        )));
    };
    fs::create_dir_all(dir)?;

    let staging = dir.join(format!(".{}.tmp", name.to_string_lossy()));
    {
        let mut file = File::create(&staging)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&staging, path)?;
    Ok(())
}

/// Advisory lock on `<file>.lock`, released when the handle drops.
struct WriterLock {
    _file: File,
}

impl WriterLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        if let Some(dir) = lock_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive().map_err(|e| {
            ChatsyncError::io(format!("Failed to lock {}: {}", lock_path.display(), e))
        })?;
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_core::config::{ChatsyncConfig, RemoteConfig};
    use tempfile::TempDir;

    fn config_file(dir: &TempDir) -> AtomicTomlFile<ChatsyncConfig> {
        AtomicTomlFile::new(dir.path().join("nested").join("config.toml"))
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_staging_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = config_file(&temp_dir);

        let mut config = ChatsyncConfig::default();
        config.remote = Some(RemoteConfig::new("https://db.example.com/rest/v1", "anon"));
        file.save(&config).unwrap();

        assert_eq!(file.load().unwrap(), Some(config));
        assert!(!temp_dir.path().join("nested/.config.toml.tmp").exists());
    }

    #[test]
    fn test_load_missing_or_blank_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = config_file(&temp_dir);
        assert!(file.load().unwrap().is_none());

        fs::create_dir_all(temp_dir.path().join("nested")).unwrap();
        fs::write(file.path(), "   \n").unwrap();
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_locked_writes_only_on_request() {
        let temp_dir = TempDir::new().unwrap();
        let file = config_file(&temp_dir);

        let created = file
            .locked(|current| {
                let mut config = current.unwrap_or_default();
                config.session.default_title = "Untitled".to_string();
                Ok((Some(config), true))
            })
            .unwrap();
        assert!(created);

        let seen = file
            .locked(|current| Ok((None, current.map(|c| c.session.default_title))))
            .unwrap();
        assert_eq!(seen.as_deref(), Some("Untitled"));
    }

    #[test]
    fn test_failed_closure_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let file = config_file(&temp_dir);
        file.save(&ChatsyncConfig::default()).unwrap();

        let result: Result<()> = file.locked(|_| Err(ChatsyncError::validation("rejected")));

        assert!(result.is_err());
        assert_eq!(file.load().unwrap().unwrap().session.default_title, "New Chat");
    }
}

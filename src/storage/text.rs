use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::internal_error::{InternalError, InternalResult};

use super::traits::FallbackStore;

/// Fallback tier: one `<key>.json` file per key inside `dir`.
///
/// Writes go to a temp file that is synced and renamed over the target, so a
/// crash mid-write leaves the previous value in place.
pub struct TextFileStore {
    dir: PathBuf,
}

impl TextFileStore {
    pub fn open(dir: &Path) -> InternalResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> InternalResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(InternalError::Storage(format!("invalid key {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl FallbackStore for TextFileStore {
    fn get_item(&self, key: &str) -> InternalResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> InternalResult<()> {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> InternalResult<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = TextFileStore::open(dir.path()).unwrap();

        assert_eq!(store.get_item("tasks").unwrap(), None);
        store.set_item("tasks", "[]").unwrap();
        assert_eq!(store.get_item("tasks").unwrap().as_deref(), Some("[]"));
        assert!(!dir.path().join("tasks.json.tmp").exists());

        store.remove_item("tasks").unwrap();
        store.remove_item("tasks").unwrap();
        assert_eq!(store.get_item("tasks").unwrap(), None);
    }

    #[test]
    fn path_like_keys_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = TextFileStore::open(dir.path()).unwrap();
        assert!(store.set_item("../escape", "x").is_err());
        assert!(store.get_item("").is_err());
    }
}

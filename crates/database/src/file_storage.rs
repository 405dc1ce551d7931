use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage name: {0:?}")]
    InvalidName(String),

    #[error("{0} does not exist in storage")]
    NotFound(String),

    #[error("storage I/O failed for {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(name: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::Io { name: name.to_string(), source }
        }
    }
}

/// Where attachments live. Names are storage-relative and `/`-separated.
pub trait FileStorage: Clone + Send + Sync + 'static {

    /// Stores `content` and returns the name it was actually stored under,
    /// which differs from `name` when that one is already taken.
    fn save(&self, name: &str, content: &[u8]) -> Result<String, StorageError>;

    fn open(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Deleting a missing file is not an error.
    fn delete(&self, name: &str) -> Result<(), StorageError>;

    fn exists(&self, name: &str) -> bool;

    fn url(&self, name: &str) -> Result<String, StorageError>;
}

#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self { root: root.into(), base_url }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));

        if name.is_empty() || escapes {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

impl FileStorage for LocalFileStorage {

    fn save(&self, name: &str, content: &[u8]) -> Result<String, StorageError> {
        let mut candidate = name.to_string();

        loop {
            let path = self.path(&candidate)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(&candidate, e))?;
            }

            // create_new so two writers racing for a name never clobber each other
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(content).map_err(|e| StorageError::io(&candidate, e))?;
                    tracing::debug!(name = %candidate, bytes = content.len(), "stored file");
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    candidate = with_suffix(name, &random_suffix());
                }
                Err(e) => return Err(StorageError::io(&candidate, e)),
            }
        }
    }

    fn open(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(name)?;
        fs::read(path).map_err(|e| StorageError::io(name, e))
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path(name)?;
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(name, "deleted file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).map(|path| path.is_file()).unwrap_or(false)
    }

    fn url(&self, name: &str) -> Result<String, StorageError> {
        if !self.path(name)?.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }

        Ok(format!("{}{}", self.base_url, name))
    }
}

/// Reduces a client supplied file name to something safe to store.
pub fn get_valid_name(filename: &str) -> String {
    let basename = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = basename
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn with_suffix(name: &str, suffix: &str) -> String {
    let (dir, file) = match name.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, name),
    };

    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{file}_{suffix}"),
    };

    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

fn random_suffix() -> String {
    let mut suffix = uuid::Uuid::new_v4().simple().to_string();
    suffix.truncate(7);
    suffix
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_open_and_url() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let storage = LocalFileStorage::new(temp_dir.path(), "/media");

        let name = storage.save("profiles/7/avatar.png", b"png bytes")?;

        assert_eq!(name, "profiles/7/avatar.png");
        assert_eq!(storage.open(&name)?, b"png bytes");
        assert_eq!(storage.url(&name)?, "/media/profiles/7/avatar.png");
        assert!(storage.exists(&name));
        Ok(())
    }

    #[test]
    fn test_save_never_overwrites() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let storage = LocalFileStorage::new(temp_dir.path(), "/media/");

        let first = storage.save("profiles/7/avatar.png", b"first")?;
        let second = storage.save("profiles/7/avatar.png", b"second")?;

        assert_ne!(first, second);
        assert!(second.starts_with("profiles/7/avatar_"));
        assert!(second.ends_with(".png"));
        assert_eq!(storage.open(&first)?, b"first");
        assert_eq!(storage.open(&second)?, b"second");
        Ok(())
    }

    #[test]
    fn test_url_of_missing_file_fails() {
        let temp_dir = tempdir().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path(), "/media/");

        assert!(matches!(storage.url("profiles/1/gone.png"), Err(StorageError::NotFound(_))));
        assert!(matches!(storage.open("profiles/1/gone.png"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_names_cannot_escape_root() {
        let temp_dir = tempdir().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path(), "/media/");

        for name in ["../secret", "/etc/passwd", "profiles/../../x", ""] {
            assert!(
                matches!(storage.save(name, b"x"), Err(StorageError::InvalidName(_))),
                "{name} should be rejected"
            );
        }
        assert!(!storage.exists("../secret"));
    }

    #[test]
    fn test_delete_missing_is_ok() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let storage = LocalFileStorage::new(temp_dir.path(), "/media/");

        let name = storage.save("a.txt", b"a")?;
        storage.delete(&name)?;
        storage.delete(&name)?;
        assert!(!storage.exists(&name));
        Ok(())
    }

    #[test]
    fn test_get_valid_name() {
        assert_eq!(get_valid_name("C:\\Users\\me\\my photo.JPG"), "my_photo.JPG");
        assert_eq!(get_valid_name("../../etc/passwd"), "passwd");
        assert_eq!(get_valid_name("..."), "upload");
        assert_eq!(get_valid_name("ça va?.png"), "a_va.png");
        assert_eq!(get_valid_name(""), "upload");
    }

    #[test]
    fn test_with_suffix_keeps_extension() {
        assert_eq!(with_suffix("profiles/1/a.tar.gz", "abc"), "profiles/1/a.tar_abc.gz");
        assert_eq!(with_suffix("noext", "abc"), "noext_abc");
        assert_eq!(with_suffix(".hidden", "abc"), ".hidden_abc");
    }
}

use libmdbx::{Database, DatabaseOptions, TableFlags, WriteFlags, WriteMap};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct InnerDatabase {
    db: Arc<Mutex<Database<WriteMap>>>,
}

/// Key/value record store. Every call runs in its own transaction.
pub trait SafeDatabase: Clone + Send + Sync + 'static {

    fn open<P: AsRef<Path>>(path: P) -> Result<Self, libmdbx::Error> where Self: Sized;

    fn write(&self, key: &str, value: &str, table: &str) -> Result<(), libmdbx::Error>;

    fn read(&self, key: &str, table: &str) -> Result<Option<Vec<u8>>, libmdbx::Error>;

    fn read_all(&self, table: &str) -> Result<HashMap<Vec<u8>, Vec<u8>>, libmdbx::Error>;

    /// Returns `false` when there was nothing to delete.
    fn delete(&self, key: &str, table: &str) -> Result<bool, libmdbx::Error>;

    fn batch_write<K, V>(&self, items: &[(K, V)], table: &str) -> Result<(), libmdbx::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>;
}

impl InnerDatabase {
    // transactions abort on drop, so a poisoned lock still guards a consistent env
    fn lock(&self) -> MutexGuard<'_, Database<WriteMap>> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}


impl SafeDatabase for InnerDatabase {

    fn open<P: AsRef<Path>>(path: P) -> Result<Self, libmdbx::Error> {
        let mut options = DatabaseOptions::default();
        options.max_tables = Some(16);
        let db = Database::<WriteMap>::open_with_options(path, options)?;

        tracing::debug!("opened record store");

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }


    fn write(&self, key: &str, value: &str, table: &str) -> Result<(), libmdbx::Error> {
        let db = self.lock();
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        transaction.put(&table, key, value, WriteFlags::default())?;
        transaction.commit()?;
        Ok(())
    }


    fn read(&self, key: &str, table: &str) -> Result<Option<Vec<u8>>, libmdbx::Error> {
        let db = self.lock();
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let result = transaction.get(&table, key.as_bytes())?;
            return Ok(result);
        }

        Ok(None)
    }

    fn read_all(&self, table: &str) -> Result<HashMap<Vec<u8>, Vec<u8>>, libmdbx::Error> {
        let mut map = HashMap::new();
        let db = self.lock();
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let mut cursor = transaction.cursor(&table)?;

            for item in cursor.iter_start::<Vec<u8>, Vec<u8>>() {
                let (key, value): (Vec<u8>, Vec<u8>) = item?;
                map.insert(key, value);
            }
        }

        Ok(map)
    }

    fn delete(&self, key: &str, table: &str) -> Result<bool, libmdbx::Error> {
        let db = self.lock();
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        let deleted = transaction.del(&table, key.as_bytes(), None)?;
        transaction.commit()?;
        Ok(deleted)
    }


    fn batch_write<K, V>(&self, items: &[(K, V)], table: &str) -> Result<(), libmdbx::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let db = self.lock();
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        for (key, value) in items {
            transaction.put(&table, key, value, WriteFlags::default())?;
        }

        transaction.commit()?;
        Ok(())
    }
}


//NOTE: values are copied out of the cursor on purpose. libmdbx hands back
// borrowed pages, and holding them past the transaction dangles.


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::open(temp_dir.path().join("test_db"))?;

        db.write("7", "{\"user\":7}", "user_profiles")?;

        assert_eq!(db.read("7", "user_profiles")?, Some(b"{\"user\":7}".to_vec()));
        assert_eq!(db.read("8", "user_profiles")?, None);
        Ok(())
    }

    #[test]
    fn test_missing_table_reads_empty() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::open(temp_dir.path().join("test_db"))?;

        assert_eq!(db.read("1", "nothing_here")?, None);
        assert!(db.read_all("nothing_here")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_delete_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::open(temp_dir.path().join("test_db"))?;

        db.batch_write(&[("1", "a"), ("2", "b")], "user_profiles")?;

        assert!(db.delete("1", "user_profiles")?);
        assert!(!db.delete("1", "user_profiles")?);

        let remaining = db.read_all("user_profiles")?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.get(b"2".as_slice()), Some(&b"b".to_vec()));
        Ok(())
    }
}

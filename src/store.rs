//! Durable storage of the single authorized contact.
//!
//! The engine persists exactly one phone number, overwritten only by the
//! ACTIVATE command. Storage is external to the protocol core, hence the
//! trait; the production implementation is a plain file.

use crate::error::Error;
use std::fs;
use std::path::PathBuf;

pub trait ContactStore {
    fn load(&self) -> Result<Option<String>, Error>;
    fn store(&mut self, msisdn: &str) -> Result<(), Error>;
}

/// File-backed contact store.
pub struct FileContactStore {
    path: PathBuf,
}

impl FileContactStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileContactStore { path: path.into() }
    }
}

impl ContactStore for FileContactStore {
    fn load(&self) -> Result<Option<String>, Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let msisdn = contents.trim();
        if msisdn.is_empty() {
            Ok(None)
        } else {
            Ok(Some(msisdn.to_string()))
        }
    }

    fn store(&mut self, msisdn: &str) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, msisdn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_number_through_the_file() {
        let dir = std::env::temp_dir().join("sim7k-tracker-store-test");
        let path = dir.join("contact");
        let _ = fs::remove_file(&path);
        let mut store = FileContactStore::new(&path);
        assert!(store.load().unwrap().is_none());
        store.store("+15550001").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("+15550001"));
        let _ = fs::remove_file(&path);
    }
}

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::normalize_mac;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub mac: String,
    #[serde(default)]
    pub name: String,
}

impl Device {
    pub fn key(&self) -> String {
        normalize_mac(&self.mac)
    }
}

/// Persistence for the list of registered devices.
pub trait AddressBook {
    fn load(&self) -> Result<Vec<Device>, StoreError>;
    fn save(&self, devices: &[Device]) -> Result<(), StoreError>;
}

/// A JSON array of devices in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AddressBook for JsonFileStore {
    fn load(&self) -> Result<Vec<Device>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() { return Ok(Vec::new()); }

        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, devices: &[Device]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(devices)?)?;
        log::debug!("saved {} device(s) to {}", devices.len(), self.path.display());
        Ok(())
    }
}

pub fn add_device(book: &dyn AddressBook, mac: &str, name: &str) -> Result<(), StoreError> {
    let key = normalize_mac(mac);
    if key.len() != 12 {
        return Err(StoreError::InvalidMac(mac.to_string()));
    }

    let mut devices = book.load()?;
    if devices.iter().any(|d| d.key() == key) {
        return Err(StoreError::Exists(mac.to_string()));
    }
    devices.push(Device { mac: mac.to_string(), name: name.to_string() });
    book.save(&devices)
}

pub fn remove_device(book: &dyn AddressBook, mac: &str) -> Result<Device, StoreError> {
    let key = normalize_mac(mac);
    let mut devices = book.load()?;
    let Some(pos) = devices.iter().position(|d| d.key() == key) else {
        return Err(StoreError::NotFound(mac.to_string()));
    };
    let removed = devices.remove(pos);
    book.save(&devices)?;
    Ok(removed)
}

pub fn rename_device(book: &dyn AddressBook, mac: &str, name: &str) -> Result<(), StoreError> {
    let key = normalize_mac(mac);
    let mut devices = book.load()?;
    let Some(device) = devices.iter_mut().find(|d| d.key() == key) else {
        return Err(StoreError::NotFound(mac.to_string()));
    };
    device.name = name.to_string();
    book.save(&devices)
}

/// Looks a device up by exact name first, then by normalized MAC.
pub fn find_device(book: &dyn AddressBook, key: &str) -> Result<Option<Device>, StoreError> {
    let devices = book.load()?;
    if let Some(d) = devices.iter().find(|d| !d.name.is_empty() && d.name == key) {
        return Ok(Some(d.clone()));
    }

    let mac = normalize_mac(key);
    if mac.is_empty() { return Ok(None); }
    Ok(devices.into_iter().find(|d| d.key() == mac))
}

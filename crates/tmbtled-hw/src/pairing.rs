//! Pairing metadata written by the setup tool.
//!
//! Each paired cluster has a `<device-id>.json` file in the pairing
//! directory describing its address and GATT layout. Only devices with a
//! metadata file are connected to automatically.

use crate::protocol::{HID_REPORT_UUID, HID_SERVICE_UUID, STATE_HANDLE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension of metadata files.
pub const METADATA_EXTENSION: &str = "json";

/// Identifier of a peripheral: its address as lowercase hex without separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Normalises an address such as `AA:BB:CC:00:11:22`.
    pub fn new(address: &str) -> Self {
        Self(
            address
                .chars()
                .filter(|c| c.is_ascii_hexdigit())
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        )
    }

    /// Returns the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<btleplug::api::BDAddr> for DeviceId {
    fn from(address: btleplug::api::BDAddr) -> Self {
        Self::new(&address.to_string())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A GATT service descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub start_handle: u16,
    pub end_handle: u16,
    pub uuid: String,
}

/// A GATT characteristic descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicDescriptor {
    pub uuid: String,
    #[serde(default)]
    pub start_handle: u16,
    #[serde(default)]
    pub end_handle: u16,
    #[serde(default)]
    pub value_handle: u16,
    #[serde(default)]
    pub properties: u8,
    #[serde(default)]
    pub props_decoded: Vec<String>,
}

impl CharacteristicDescriptor {
    /// Returns true if the characteristic supports notifications.
    pub fn notifies(&self) -> bool {
        self.props_decoded.iter().any(|p| p == "notify")
    }

    /// Returns true if the UUID is the given 16-bit UUID, in short or
    /// full Bluetooth base form.
    pub fn is_uuid(&self, short: u16) -> bool {
        let uuid = self.uuid.to_ascii_lowercase();
        uuid == format!("{:04x}", short) || uuid.starts_with(&format!("0000{:04x}-", short))
    }
}

/// Persisted metadata for one paired device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub uuid: String,
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
    /// Characteristics keyed by service UUID.
    #[serde(default)]
    pub characteristics: HashMap<String, Vec<CharacteristicDescriptor>>,
}

impl DeviceMetadata {
    /// Returns the characteristics recorded for a service.
    pub fn characteristics_of(&self, service_uuid: &str) -> &[CharacteristicDescriptor] {
        self.characteristics
            .get(&service_uuid.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn reports(&self) -> impl Iterator<Item = &CharacteristicDescriptor> {
        self.characteristics_of(&format!("{:04x}", HID_SERVICE_UUID))
            .iter()
            .filter(|c| c.is_uuid(HID_REPORT_UUID))
    }

    /// The HID report accepting frame writes, found by its value handle.
    pub fn state_characteristic(&self) -> Option<&CharacteristicDescriptor> {
        self.reports().find(|c| c.value_handle == STATE_HANDLE)
    }

    /// The HID report delivering button reports.
    pub fn events_characteristic(&self) -> Option<&CharacteristicDescriptor> {
        self.reports().find(|c| c.notifies())
    }
}

/// Read-only view of the pairing directory.
#[derive(Debug, Clone)]
pub struct PairingStore {
    dir: PathBuf,
}

impl PairingStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the pairing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &DeviceId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", id.as_str(), METADATA_EXTENSION))
    }

    /// Returns true if metadata exists for the device.
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.path_for(id).is_file()
    }

    /// Loads the metadata of a device.
    pub fn load(&self, id: &DeviceId) -> Result<DeviceMetadata> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(Error::MetadataNotFound(id.to_string()));
        }

        debug!("Loading pairing metadata from {:?}", path);
        let content = std::fs::read_to_string(&path)?;
        let metadata = serde_json::from_str(&content)?;
        Ok(metadata)
    }
}

//! Request metadata views: typed accessors over the serialized blobs the
//! host runtime attaches to each search or preview call.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::Result;

/// Internet connectivity as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

/// Geolocation attached to a search request.
///
/// Serializes as a flat field-named document. The floating-point fields
/// keep their decimal point even when integral (`1.0`, not `1`), so numeric
/// type fidelity survives the boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub area_code: String,
    pub city: String,
    pub country_code: String,
    pub country_name: String,
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: f64,
    pub region_code: String,
    pub region_name: String,
    pub zip_postal_code: String,
}

/// Metadata for a search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    locale: String,
    form_factor: String,
    cardinality: usize,
    #[serde(default)]
    internet_connectivity: ConnectivityStatus,
    #[serde(default)]
    location: Option<Location>,
}

impl SearchMetadata {
    pub fn new(cardinality: usize, locale: &str, form_factor: &str) -> Self {
        Self {
            locale: locale.to_string(),
            form_factor: form_factor.to_string(),
            cardinality,
            internet_connectivity: ConnectivityStatus::Unknown,
            location: None,
        }
    }

    /// Expected locale for the request, e.g. `en_US`.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Form factor of the requesting device, e.g. `phone` or `desktop`.
    pub fn form_factor(&self) -> &str {
        &self.form_factor
    }

    /// Desired number of results; 0 means no limit.
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn internet_connectivity(&self) -> ConnectivityStatus {
        self.internet_connectivity
    }

    pub fn set_internet_connectivity(&mut self, status: ConnectivityStatus) {
        self.internet_connectivity = status;
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }
}

/// Metadata for a preview request or result activation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    locale: String,
    form_factor: String,
    #[serde(default)]
    internet_connectivity: ConnectivityStatus,
    #[serde(default)]
    scope_data: Value,
    #[serde(default)]
    hints: HashMap<String, Value>,
}

impl ActionMetadata {
    pub fn new(locale: &str, form_factor: &str) -> Self {
        Self {
            locale: locale.to_string(),
            form_factor: form_factor.to_string(),
            internet_connectivity: ConnectivityStatus::Unknown,
            scope_data: Value::Null,
            hints: HashMap::new(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn form_factor(&self) -> &str {
        &self.form_factor
    }

    pub fn internet_connectivity(&self) -> ConnectivityStatus {
        self.internet_connectivity
    }

    pub fn set_internet_connectivity(&mut self, status: ConnectivityStatus) {
        self.internet_connectivity = status;
    }

    /// Decode the stored scope data, set either by the shell when invoking
    /// a preview action or by the scope itself.
    pub fn scope_data<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.scope_data.clone())?)
    }

    /// Attach arbitrary data to this metadata.
    pub fn set_scope_data<T: Serialize>(&mut self, value: T) -> Result<()> {
        self.scope_data = JsonCodec::to_value(&value)?;
        Ok(())
    }

    /// Decode a single hint; `Ok(None)` if the hint is absent.
    pub fn hint<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.hints.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Set a hint.
    pub fn set_hint<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.hints.insert(key.to_string(), JsonCodec::to_value(&value)?);
        Ok(())
    }

    /// All hints as a raw map.
    pub fn hints(&self) -> &HashMap<String, Value> {
        &self.hints
    }
}

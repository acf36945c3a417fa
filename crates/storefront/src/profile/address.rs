//! City/district reference data and single-line address parsing.
//!
//! The backend stores a profile address as one line: city, district and
//! street detail concatenated without separators. Splitting it back needs
//! the directory of known cities and districts.

use std::future::Future;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to read address directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid address directory JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub name: String,
    #[serde(default)]
    pub zip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    #[serde(default)]
    pub districts: Vec<District>,
}

/// Known cities and their districts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressDirectory {
    cities: Vec<City>,
}

impl AddressDirectory {
    #[must_use]
    pub const fn new(cities: Vec<City>) -> Self {
        Self { cities }
    }

    /// Parse `[{"name": ..., "districts": [{"name": ..., "zip": ...}]}]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match that shape.
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    #[must_use]
    pub fn city(&self, name: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Split a stored address line into city, district and detail.
    ///
    /// City and district are matched by longest prefix; whatever is not
    /// matched stays in `detail`.
    #[must_use]
    pub fn parse(&self, line: &str) -> PostalAddress {
        let line = line.trim();

        let Some(city) = longest_prefix(self.cities.iter(), |c| &c.name, line) else {
            return PostalAddress {
                detail: line.to_string(),
                ..PostalAddress::default()
            };
        };
        let rest = line[city.name.len()..].trim_start();

        let district = longest_prefix(city.districts.iter(), |d| &d.name, rest);
        let rest = district.map_or(rest, |d| &rest[d.name.len()..]);

        PostalAddress {
            city: Some(city.name.clone()),
            district: district.map(|d| d.name.clone()),
            detail: rest.trim().to_string(),
        }
    }
}

fn longest_prefix<'a, T>(
    candidates: impl Iterator<Item = &'a T>,
    name: impl Fn(&T) -> &String,
    text: &str,
) -> Option<&'a T> {
    candidates
        .filter(|c| !name(*c).is_empty() && text.starts_with(name(*c).as_str()))
        .max_by_key(|c| name(*c).len())
}

/// A structured address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub city: Option<String>,
    pub district: Option<String>,
    pub detail: String,
}

impl PostalAddress {
    /// Single-line form stored by the backend.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = String::new();
        if let Some(city) = &self.city {
            line.push_str(city);
        }
        if let Some(district) = &self.district {
            line.push_str(district);
        }
        line.push_str(self.detail.trim());
        line
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.district.is_none() && self.detail.trim().is_empty()
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Where the address directory comes from.
pub trait AddressDirectorySource: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<AddressDirectory, DirectoryError>> + Send;
}

/// A directory held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory(pub AddressDirectory);

impl AddressDirectorySource for StaticDirectory {
    async fn load(&self) -> Result<AddressDirectory, DirectoryError> {
        Ok(self.0.clone())
    }
}

/// A directory read from a JSON file on every load.
#[derive(Debug, Clone)]
pub struct JsonFileDirectory {
    path: PathBuf,
}

impl JsonFileDirectory {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AddressDirectorySource for JsonFileDirectory {
    async fn load(&self) -> Result<AddressDirectory, DirectoryError> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| DirectoryError::Io {
                path: self.path.clone(),
                source,
            })?;
        AddressDirectory::from_json(&json)
    }
}

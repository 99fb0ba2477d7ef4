use std::collections::{BTreeMap, BTreeSet};

use foundation::{EntryId, GeoPoint};
use serde::{Deserialize, Serialize};

/// Coordinate as stored in catalog JSON (`{"lat": .., "lng": ..}`).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for GeoPoint {
    fn from(c: Coordinates) -> Self {
        GeoPoint::new(c.lat, c.lng)
    }
}

/// One travel-log entry.
///
/// The sync engine only reads `id` and `coordinates`; the remaining fields are
/// display data carried through for the views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CatalogEntry {
    pub fn entry_id(&self) -> EntryId {
        EntryId::new(self.id.clone())
    }

    pub fn point(&self) -> GeoPoint {
        self.coordinates.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Malformed(String),
    DuplicateId(String),
    InvalidCoordinates(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Malformed(msg) => write!(f, "catalog is malformed: {msg}"),
            CatalogError::DuplicateId(id) => write!(f, "duplicate catalog entry id: {id}"),
            CatalogError::InvalidCoordinates(id) => {
                write!(f, "catalog entry {id} has out-of-range coordinates")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Read-only access to the ordered entries presented to the sync engine.
pub trait CatalogProvider {
    /// Entries in presentation order.
    fn entries(&self) -> &[CatalogEntry];
    fn get(&self, id: &EntryId) -> Option<&CatalogEntry>;

    fn point_of(&self, id: &EntryId) -> Option<GeoPoint> {
        self.get(id).map(CatalogEntry::point)
    }

    /// Entries matching the active filters, in presentation order.
    ///
    /// - A non-empty `tags` set keeps entries carrying at least one of the tags.
    /// - `country` narrows the result to one country.
    fn filtered(&self, tags: &BTreeSet<String>, country: Option<&str>) -> Vec<&CatalogEntry> {
        self.entries()
            .iter()
            .filter(|e| tags.is_empty() || e.tags.iter().any(|t| tags.contains(t)))
            .filter(|e| country.is_none_or(|c| e.country == c))
            .collect()
    }
}

/// Ordered, id-indexed catalog.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_id: BTreeMap<String, usize>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut by_id = BTreeMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            if !entry.point().is_valid() {
                return Err(CatalogError::InvalidCoordinates(entry.id.clone()));
            }
            if by_id.insert(entry.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(entry.id.clone()));
            }
        }
        Ok(Self { entries, by_id })
    }

    /// Parses a JSON array of entries.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(json).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogProvider for Catalog {
    fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    fn get(&self, id: &EntryId) -> Option<&CatalogEntry> {
        self.by_id.get(id.as_str()).map(|&idx| &self.entries[idx])
    }
}

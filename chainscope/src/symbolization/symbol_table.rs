use crate::domain::TraceError;
use anyhow::{Context as _, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Longest graph label shown in full; longer names are shortened.
const MAX_LABEL_CHARS: usize = 20;

/// Characters kept from a shortened label before the ellipsis.
const TRUNCATED_LABEL_CHARS: usize = 17;

/// Function descriptor from the tracer's function table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkage: Option<String>,
}

impl FuncInfo {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: None, type_id: None, linkage: None }
    }
}

/// Address → symbol lookup for traced functions
///
/// Lookups are total: an address without an entry resolves to its hex form,
/// so a partial table never breaks rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    entries: HashMap<u64, FuncInfo>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the function table as served by the tracer
    ///
    /// The payload is a JSON object keyed by decimal addresses. Keys that are
    /// not addresses are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if the payload is not JSON or not an object.
    pub fn from_json_str(json: &str) -> Result<Self, TraceError> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        let object = raw.as_object().ok_or(TraceError::InvalidSymbolTable)?;

        let mut entries = HashMap::with_capacity(object.len());
        for (key, value) in object {
            let Ok(address) = key.trim().parse::<u64>() else {
                warn!("Skipping function table entry with non-numeric key {key:?}");
                continue;
            };
            match serde_json::from_value::<FuncInfo>(value.clone()) {
                Ok(info) => {
                    entries.insert(address, info);
                }
                Err(e) => warn!("Skipping function table entry {address}: {e}"),
            }
        }

        Ok(Self { entries })
    }

    /// Load the function table from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read function table {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse function table {}", path.display()))
    }

    pub fn insert(&mut self, address: u64, info: FuncInfo) {
        self.entries.insert(address, info);
    }

    #[must_use]
    pub fn lookup(&self, address: u64) -> Option<&FuncInfo> {
        self.entries.get(&address)
    }

    /// Human-readable name for an address, falling back to `0x<hex>`
    #[must_use]
    pub fn resolve(&self, address: u64) -> String {
        self.lookup(address).map_or_else(|| fallback_name(address), |info| info.name.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by address (stable iteration for fingerprinting)
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(u64, &FuncInfo)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(&a, i)| (a, i)).collect();
        entries.sort_unstable_by_key(|(a, _)| *a);
        entries
    }
}

impl FromIterator<(u64, FuncInfo)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (u64, FuncInfo)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Name shown for an address missing from the function table
#[must_use]
pub fn fallback_name(address: u64) -> String {
    format!("0x{address:x}")
}

/// Shorten a function name for use as a graph label
#[must_use]
pub fn display_label(name: &str) -> String {
    if name.chars().count() > MAX_LABEL_CHARS {
        let head: String = name.chars().take(TRUNCATED_LABEL_CHARS).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

//! Durable keyed store for per-provider resolution results
//!
//! This module provides the result store for batch resolution runs,
//! allowing interrupted or repeated runs to resume from the last
//! saved state instead of re-querying providers.
//!
//! # Features
//!
//! - Append/merge semantics keyed by record id
//! - Cross-provider discrepancy recomputed on every mutation
//! - Flat CSV serialization, stable across save/load
//! - Atomic checkpoint writes (temp file + rename)
//! - One-time timestamped backup of a pre-existing store file
//!
//! # Durable format
//!
//! ```text
//! id,address,discrepancy,<Tag1>_lat,<Tag1>_lon,...,<TagN>_lat,<TagN>_lon
//! ```
//!
//! Provider tag columns are sorted lexicographically. A provider that
//! has answered with no result (or was never queried for that id)
//! carries the literal `None` marker in both cells of its pair; any
//! other malformed cell shape is a fatal load error.

use chrono::Local;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::{Coordinate, ResolvedLocation};

/// Literal marker for an answered-but-empty (or never-queried) cell pair.
const NO_RESULT: &str = "None";

/// Fixed leading columns of the durable format.
const FIXED_COLUMNS: [&str; 3] = ["id", "address", "discrepancy"];

const LAT_SUFFIX: &str = "_lat";
const LON_SUFFIX: &str = "_lon";

/// One store entry per record id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    id: String,
    address: String,
    discrepancy: f64,
    /// Answered slots: key presence means the provider has answered
    /// for this id, `None` means it answered with no result.
    results: BTreeMap<String, Option<Coordinate>>,
}

impl ResultEntry {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            address: String::new(),
            discrepancy: 0.0,
            results: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Last address string written for this id.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Maximum pairwise distance among present coordinates; 0 with
    /// fewer than two present results.
    pub fn discrepancy(&self) -> f64 {
        self.discrepancy
    }

    /// Present coordinate for a provider, if it answered with one.
    pub fn coordinate(&self, tag: &str) -> Option<Coordinate> {
        self.results.get(tag).copied().flatten()
    }

    /// Whether the provider has answered for this id at all.
    pub fn is_answered(&self, tag: &str) -> bool {
        self.results.contains_key(tag)
    }

    fn present_coordinates(&self) -> Vec<Coordinate> {
        self.results.values().flatten().copied().collect()
    }
}

/// In-memory result store plus the set of provider tags ever observed.
///
/// Owned by the batch resolver for the duration of a run; all
/// mutation goes through [`ResultStore::set_result`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    entries: BTreeMap<String, ResultEntry>,
    providers: BTreeSet<String>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the store for a run rooted at `path`.
    ///
    /// If a store file already exists it is first copied to a
    /// timestamped sibling path (exactly once, here), then preloaded
    /// when `preload` is set. A malformed existing file is a fatal
    /// error when preloading.
    pub fn open(path: &Path, preload: bool) -> Result<Self, StoreError> {
        if path.exists() {
            let backup = Self::backup_existing(path)?;
            tracing::info!(
                store = %path.display(),
                backup = %backup.display(),
                "Backed up existing store file"
            );

            if preload {
                tracing::info!(store = %path.display(), "Preloading results store");
                return Self::load(path);
            }
        }

        Ok(Self::new())
    }

    /// Copy a pre-existing store file to a timestamped sibling path.
    ///
    /// Explicit so the side effect is visible and testable; callers
    /// other than [`ResultStore::open`] should not need it.
    pub fn backup_existing(path: &Path) -> Result<PathBuf, StoreError> {
        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S%.6f").to_string();
        let backup = sibling_with_suffix(path, &stamp);
        fs::copy(path, &backup)?;
        Ok(backup)
    }

    /// Record a provider's answer for a record id.
    ///
    /// Total over any id/tag strings: mints the entry when absent,
    /// records the tag in the known-provider set, marks the slot
    /// answered, and recomputes the discrepancy from scratch (an
    /// overwrite can change which pair of coordinates is maximal).
    pub fn set_result(&mut self, id: &str, tag: &str, result: Option<ResolvedLocation>) {
        self.providers.insert(tag.to_string());

        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| ResultEntry::new(id));

        match result {
            Some(location) => {
                entry.address = location.address;
                entry.results.insert(tag.to_string(), Some(location.coordinate));
            }
            None => {
                entry.results.insert(tag.to_string(), None);
            }
        }

        entry.discrepancy = max_pairwise_distance(&entry.present_coordinates());
    }

    /// A provider's present result for an id, paired with the stored
    /// address. Absent id, unknown tag and answered-no-result all
    /// yield `None`.
    pub fn get_result(&self, id: &str, tag: &str) -> Option<ResolvedLocation> {
        let entry = self.entries.get(id)?;
        let coordinate = entry.coordinate(tag)?;
        Some(ResolvedLocation {
            address: entry.address.clone(),
            coordinate,
        })
    }

    /// All present results for an id; empty for an unknown id.
    pub fn get_results(&self, id: &str) -> Vec<ResolvedLocation> {
        self.entries
            .get(id)
            .map(|entry| {
                entry
                    .present_coordinates()
                    .into_iter()
                    .map(|coordinate| ResolvedLocation {
                        address: entry.address.clone(),
                        coordinate,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a provider has answered for this id (with or without
    /// a result). The resolver skips provider calls for answered
    /// slots, which is what makes repeated runs idempotent.
    pub fn is_resolved(&self, id: &str, tag: &str) -> bool {
        self.entries
            .get(id)
            .is_some_and(|entry| entry.is_answered(tag))
    }

    pub fn get_entry(&self, id: &str) -> Option<&ResultEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.values()
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the durable CSV format.
    ///
    /// Provider columns are ordered lexicographically and every row
    /// carries every known provider's cell pair; rows are ordered by
    /// id. The address field is quoted by the writer (it contains
    /// commas by construction).
    pub fn to_csv(&self) -> Result<String, StoreError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        for tag in &self.providers {
            header.push(format!("{tag}{LAT_SUFFIX}"));
            header.push(format!("{tag}{LON_SUFFIX}"));
        }
        writer.write_record(&header)?;

        for entry in self.entries.values() {
            let mut row = vec![
                entry.id.clone(),
                entry.address.clone(),
                entry.discrepancy.to_string(),
            ];
            for tag in &self.providers {
                match entry.results.get(tag) {
                    Some(Some(coordinate)) => {
                        row.push(coordinate.latitude.to_string());
                        row.push(coordinate.longitude.to_string());
                    }
                    _ => {
                        row.push(NO_RESULT.to_string());
                        row.push(NO_RESULT.to_string());
                    }
                }
            }
            writer.write_record(&row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reconstruct a store from the durable CSV format.
    ///
    /// Strict about shape: a header that is not the documented
    /// column layout, a half-marked `None` pair or an unparsable
    /// float is a fatal error, never a guessed-at row. Discrepancy
    /// values are recomputed rather than trusted.
    pub fn from_csv(text: &str) -> Result<Self, StoreError> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let tags = provider_columns(reader.headers()?)?;

        let mut store = Self::new();
        // Providers listed in the header are known even when every
        // row carries the no-result marker for them.
        for tag in &tags {
            store.providers.insert(tag.clone());
        }

        for (index, record) in reader.records().enumerate() {
            let row = index + 2; // header is line 1
            let record = record?;
            let id = &record[0];
            let address = &record[1];

            record[2]
                .parse::<f64>()
                .map_err(|_| StoreError::MalformedRow {
                    row,
                    reason: format!("invalid discrepancy '{}'", &record[2]),
                })?;

            for (slot, tag) in tags.iter().enumerate() {
                let lat = &record[FIXED_COLUMNS.len() + 2 * slot];
                let lon = &record[FIXED_COLUMNS.len() + 2 * slot + 1];

                let result = match (lat == NO_RESULT, lon == NO_RESULT) {
                    (true, true) => None,
                    (false, false) => {
                        let coordinate = Coordinate::new(
                            parse_degree(lat, "latitude", tag, row)?,
                            parse_degree(lon, "longitude", tag, row)?,
                        );
                        Some(ResolvedLocation {
                            address: address.to_string(),
                            coordinate,
                        })
                    }
                    _ => {
                        return Err(StoreError::MalformedRow {
                            row,
                            reason: format!(
                                "provider '{tag}' has a half-marked no-result pair ('{lat}', '{lon}')"
                            ),
                        })
                    }
                };

                store.set_result(id, tag, result);
            }
        }

        Ok(store)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path)?;
        Self::from_csv(&text)
    }

    /// Write the store to `path` atomically (temp file + rename), so
    /// an interrupted checkpoint never clobbers the previous one.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let text = self.to_csv()?;
        let temp = sibling_with_suffix(path, "tmp");

        fs::write(&temp, text)?;
        fs::rename(&temp, path)?;

        tracing::debug!(store = %path.display(), entries = self.len(), "Store saved");
        Ok(())
    }
}

/// `results.csv` + `suffix` -> `results.csv.suffix` (same directory).
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}

fn max_pairwise_distance(coordinates: &[Coordinate]) -> f64 {
    let mut max = 0.0f64;
    for (i, a) in coordinates.iter().enumerate() {
        for b in &coordinates[i + 1..] {
            max = max.max(a.distance(b));
        }
    }
    max
}

fn parse_degree(raw: &str, axis: &str, tag: &str, row: usize) -> Result<f64, StoreError> {
    raw.parse::<f64>().map_err(|_| StoreError::MalformedRow {
        row,
        reason: format!("invalid {axis} '{raw}' for provider '{tag}'"),
    })
}

/// Validate the header shape and extract provider tags in column order.
fn provider_columns(headers: &csv::StringRecord) -> Result<Vec<String>, StoreError> {
    let fields: Vec<&str> = headers.iter().collect();

    if fields.len() < FIXED_COLUMNS.len() || fields[..FIXED_COLUMNS.len()] != FIXED_COLUMNS {
        return Err(StoreError::MalformedHeader(format!(
            "expected leading columns {FIXED_COLUMNS:?}, got {:?}",
            &fields[..fields.len().min(FIXED_COLUMNS.len())]
        )));
    }

    let pairs = &fields[FIXED_COLUMNS.len()..];
    if pairs.len() % 2 != 0 {
        return Err(StoreError::MalformedHeader(format!(
            "provider columns must come in lat/lon pairs, got {} of them",
            pairs.len()
        )));
    }

    let mut tags = Vec::with_capacity(pairs.len() / 2);
    for pair in pairs.chunks(2) {
        let lat_tag = pair[0].strip_suffix(LAT_SUFFIX).unwrap_or_default();
        let lon_tag = pair[1].strip_suffix(LON_SUFFIX).unwrap_or_default();

        if lat_tag.is_empty() || lat_tag != lon_tag {
            return Err(StoreError::MalformedHeader(format!(
                "expected '<tag>{LAT_SUFFIX},<tag>{LON_SUFFIX}' pair, got '{},{}'",
                pair[0], pair[1]
            )));
        }
        tags.push(lat_tag.to_string());
    }

    Ok(tags)
}

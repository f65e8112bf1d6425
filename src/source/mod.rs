//! Input record source and address normalization
//!
//! The record source reads the input CSV sequentially, one
//! field-mapping record per row, keyed by a mandatory `id` column.
//! The address mapper turns a raw record into the canonical postal
//! address string sent to every provider; it is pure and stateless.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::error::SourceError;
use crate::models::Address;

/// Column holding the stable record identifier.
const ID_FIELD: &str = "id";

/// One raw input row: a stable id plus its named fields.
#[derive(Debug, Clone)]
pub struct AddressRecord {
    id: String,
    fields: HashMap<String, String>,
}

impl AddressRecord {
    /// Build a record from a row's field map; a missing or empty
    /// `id` field is a fatal input-shape error.
    pub fn from_fields(fields: HashMap<String, String>, row: usize) -> Result<Self, SourceError> {
        let id = fields
            .get(ID_FIELD)
            .filter(|id| !id.is_empty())
            .cloned()
            .ok_or(SourceError::MissingId {
                row,
                field: ID_FIELD,
            })?;

        Ok(Self { id, fields })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Field value by column name; empty for an absent column.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Sequential reader over the input CSV.
pub struct RecordSource {
    records: csv::DeserializeRecordsIntoIter<File, HashMap<String, String>>,
    row: usize,
}

impl RecordSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = csv::Reader::from_reader(file);

        Ok(Self {
            records: reader.into_deserialize(),
            row: 1, // header
        })
    }

    /// Next record in file order; `None` once the source is exhausted.
    pub fn next_record(&mut self) -> Result<Option<AddressRecord>, SourceError> {
        match self.records.next() {
            None => Ok(None),
            Some(Err(e)) => Err(SourceError::Csv(e)),
            Some(Ok(fields)) => {
                self.row += 1;
                AddressRecord::from_fields(fields, self.row).map(Some)
            }
        }
    }
}

/// Column names an input record maps address components from.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub number: String,
    pub quadrant: String,
    pub street: String,
    pub street_class: String,
    pub city: String,
    pub state: String,
    pub postal: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            number: String::from("Location No"),
            quadrant: String::from("Quadrant"),
            street: String::from("Street Number/Street Name"),
            street_class: String::from("Street Id"),
            city: String::from("Locality"),
            state: String::from("State"),
            postal: String::from("Zip Code"),
        }
    }
}

/// Maps raw records into canonical [`Address`] values.
#[derive(Debug, Clone, Default)]
pub struct AddressMapper {
    mapping: FieldMapping,
}

impl AddressMapper {
    pub fn new(mapping: FieldMapping) -> Self {
        Self { mapping }
    }

    /// Normalize a record into an address.
    ///
    /// Total over any record: unmapped columns become empty
    /// components. A house number of `0` means "no number", and an
    /// all-digit street name gets its English ordinal suffix
    /// (`282` becomes `282nd`), matching how the source data spells
    /// numbered streets.
    pub fn normalize(&self, record: &AddressRecord) -> Address {
        let number = record.field(&self.mapping.number);
        let number = if number == "0" { "" } else { number };

        let street = record.field(&self.mapping.street);
        let street = if !street.is_empty() && street.bytes().all(|b| b.is_ascii_digit()) {
            format!("{street}{}", ordinal_suffix(street))
        } else {
            street.to_string()
        };

        Address {
            number: number.to_string(),
            quadrant: record.field(&self.mapping.quadrant).to_string(),
            street,
            street_class: record.field(&self.mapping.street_class).to_string(),
            city: record.field(&self.mapping.city).to_string(),
            state: record.field(&self.mapping.state).to_string(),
            postal: record.field(&self.mapping.postal).to_string(),
            ..Default::default()
        }
    }
}

/// English ordinal suffix for a string of digits.
fn ordinal_suffix(digits: &str) -> &'static str {
    if digits.ends_with("11") || digits.ends_with("12") || digits.ends_with("13") {
        return "th";
    }
    match digits.as_bytes()[digits.len() - 1] {
        b'1' => "st",
        b'2' => "nd",
        b'3' => "rd",
        _ => "th",
    }
}

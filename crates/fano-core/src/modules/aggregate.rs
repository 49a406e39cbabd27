use crate::domain::{FitResult, Polarization, SampleIdentifier};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

pub const NO_BACKGROUND: &str = "No Background";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundSummary {
    pub file_name: String,
    pub file_path: String,
    pub integration_time_ms: u32,
    pub polarization: Polarization,
    pub extra_tokens: Vec<String>,
}

/// Serializes as the summary object, or as the `"No Background"` string.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundEntry {
    Matched(BackgroundSummary),
    Missing,
}

impl Serialize for BackgroundEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Matched(summary) => summary.serialize(serializer),
            Self::Missing => serializer.serialize_str(NO_BACKGROUND),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResultEntry {
    pub file_name: String,
    pub file_path: String,
    #[serde(flatten)]
    pub identifier: SampleIdentifier,
    pub background: BackgroundEntry,
    #[serde(flatten)]
    pub fit: FitResult,
    /// The trimmed window handed to the fitter.
    pub region_wavelength: Vec<f64>,
    pub region_intensity: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultSlot {
    Single(SampleResultEntry),
    Series(Vec<SampleResultEntry>),
}

impl ResultSlot {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Series(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> &[SampleResultEntry] {
        match self {
            Self::Single(entry) => std::slice::from_ref(entry),
            Self::Series(entries) => entries,
        }
    }

    /// Appends, turning a single entry into a series on the first collision.
    pub fn push(&mut self, entry: SampleResultEntry) {
        let entries = match std::mem::replace(self, Self::Series(Vec::new())) {
            Self::Single(first) => vec![first, entry],
            Self::Series(mut entries) => {
                entries.push(entry);
                entries
            }
        };
        *self = Self::Series(entries);
    }
}

impl Serialize for ResultSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(entry) => entry.serialize(serializer),
            Self::Series(entries) => transpose(entries)
                .map_err(S::Error::custom)?
                .serialize(serializer),
        }
    }
}

/// One array per field; positions follow insertion order.
fn transpose(entries: &[SampleResultEntry]) -> serde_json::Result<BTreeMap<String, Vec<Value>>> {
    let mut columns: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for entry in entries {
        if let Value::Object(fields) = serde_json::to_value(entry)? {
            for (name, value) in fields {
                columns.entry(name).or_default().push(value);
            }
        }
    }
    Ok(columns)
}

/// primary → secondary → slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct BatchResults {
    groups: BTreeMap<String, BTreeMap<String, ResultSlot>>,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: SampleResultEntry) {
        let group = self
            .groups
            .entry(entry.identifier.primary.clone())
            .or_default();
        match group.entry(entry.identifier.secondary.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(ResultSlot::Single(entry));
            }
            Entry::Occupied(mut slot) => slot.get_mut().push(entry),
        }
    }

    pub fn len_at(&self, primary: &str, secondary: &str) -> usize {
        self.groups
            .get(primary)
            .and_then(|group| group.get(secondary))
            .map_or(0, ResultSlot::len)
    }

    pub fn group(&self, primary: &str) -> Option<&BTreeMap<String, ResultSlot>> {
        self.groups.get(primary)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, ResultSlot>)> {
        self.groups
            .iter()
            .map(|(primary, group)| (primary.as_str(), group))
    }

    pub fn entry_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(BTreeMap::values)
            .map(ResultSlot::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

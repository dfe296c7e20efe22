use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::types::{LookupResult, MemberRecord};
use super::validate::validate_identifier;

pub type SharedMemberStore = Arc<MemberStore>;

/// Immutable, id-indexed member table built once at startup.
///
/// Records keep file order; that order is the tie-break for name matches.
#[derive(Debug, Default, Clone)]
pub struct MemberStore {
    records: Vec<MemberRecord>,
    by_id: HashMap<String, usize>,
}

impl MemberStore {
    pub const DEFAULT_PATH: &'static str = "data/members.json";
    const COLLECTION_KEY: &'static str = "members";

    pub fn empty() -> Self {
        Self::default()
    }

    /// Read and index a members document. Fails on IO or JSON errors.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read member file {}", path.display()))?;
        let store = Self::from_json_str(&raw)
            .with_context(|| format!("Failed to parse member file {}", path.display()))?;

        info!(path = %path.display(), members = store.len(), "Member store loaded");
        Ok(store)
    }

    /// Like [`Self::from_path`] but never fails: a broken or missing file
    /// yields an empty store so every lookup resolves to `NotFound`.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_path(path) {
            Ok(store) => store,
            Err(err) => {
                warn!(?err, path = %path.display(), "Member store unavailable; starting empty");
                Self::empty()
            }
        }
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let document: Value = serde_json::from_str(raw).context("Invalid JSON")?;
        let Some(object) = document.as_object() else {
            bail!("Member document must be a JSON object");
        };

        let entries = match object.get(Self::COLLECTION_KEY) {
            None => return Ok(Self::empty()),
            Some(Value::Array(entries)) => entries,
            Some(_) => bail!("`{}` must be an array", Self::COLLECTION_KEY),
        };

        let mut records = Vec::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            let record: MemberRecord = match serde_json::from_value(entry.clone()) {
                Ok(record) => record,
                Err(err) => {
                    warn!(position, %err, "Skipping malformed member entry");
                    continue;
                }
            };
            if record.id.is_empty() {
                warn!(position, "Skipping member entry with an empty id");
                continue;
            }
            records.push(record);
        }

        Ok(Self::from_records(records))
    }

    /// Index records in order. A repeated id replaces the earlier record in
    /// place, so iteration order stays that of first appearance.
    pub fn from_records(records: impl IntoIterator<Item = MemberRecord>) -> Self {
        let mut store = Self::empty();
        for record in records {
            let existing = store.by_id.get(&record.id).copied();
            match existing {
                Some(slot) => {
                    warn!(id = %record.id, "Duplicate member id; later entry wins");
                    store.records[slot] = record;
                }
                None => {
                    store.by_id.insert(record.id.clone(), store.records.len());
                    store.records.push(record);
                }
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[allow(dead_code)]
    pub fn iter(&self) -> impl Iterator<Item = &MemberRecord> {
        self.records.iter()
    }

    /// Resolve an identifier: exact (case-sensitive) id first, then the
    /// first record whose name matches case-insensitively.
    #[instrument(level = "debug", skip(self))]
    pub fn lookup(&self, identifier: &str) -> LookupResult {
        let identifier = match validate_identifier(identifier) {
            Ok(identifier) => identifier,
            Err(err) => return LookupResult::Invalid(format!("Validation error: {err}")),
        };

        if let Some(&slot) = self.by_id.get(identifier) {
            debug!("Matched member by id");
            return Self::checked(&self.records[slot]);
        }

        let needle = identifier.to_lowercase();
        if let Some(record) = self
            .records
            .iter()
            .find(|record| record.name.to_lowercase() == needle)
        {
            debug!(id = %record.id, "Matched member by name");
            return Self::checked(record);
        }

        LookupResult::NotFound(format!("Member '{identifier}' not found in the database"))
    }

    /// Field bounds are enforced on the matched record, so a malformed
    /// entry still shadows later ones and reports why it cannot be served.
    fn checked(record: &MemberRecord) -> LookupResult {
        match record.validate() {
            Ok(()) => LookupResult::Found(record.clone()),
            Err(reason) => {
                warn!(id = %record.id, %reason, "Matched member record is malformed");
                LookupResult::Invalid(format!("Validation error: {reason}"))
            }
        }
    }
}

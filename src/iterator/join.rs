//! Join iterator: files that share a key across every input

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{check_index, Cursor, Datum, DatumIterator};
use crate::error::{Error, Result};
use crate::filesystem::FileInfo;
use crate::path::{capture_key, GlobPattern, KeyTemplate};

/// The files of one join input, indexed by their key.
#[derive(Debug, Clone)]
pub struct KeyedFiles {
    name: String,
    files: BTreeMap<String, Arc<FileInfo>>,
}

impl KeyedFiles {
    /// Key every file of a listing.
    ///
    /// Each file must match `pattern` and keys must be unique within the
    /// input, otherwise the join is misconfigured.
    pub fn new(
        name: &str,
        pattern: &GlobPattern,
        template: &KeyTemplate,
        listing: Vec<Arc<FileInfo>>,
    ) -> Result<Self> {
        let mut files = BTreeMap::new();
        for file in listing {
            let key = capture_key(pattern, &file.path, template)?;
            match files.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(file);
                }
                Entry::Occupied(existing) => {
                    return Err(Error::DuplicateJoinKey {
                        input: name.to_string(),
                        key: existing.key().clone(),
                        first: existing.get().path.clone(),
                        second: file.path.clone(),
                    });
                }
            }
        }
        Ok(Self {
            name: name.to_string(),
            files,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Arc<FileInfo>> {
        self.files.get(key)
    }
}

/// Equi-join of its inputs on their keys, sorted ascending by key.
///
/// Only keys present in every input produce a datum; the datum holds each
/// input's file for that key, in input order.
#[derive(Debug, Clone)]
pub struct JoinIterator {
    keys: Vec<String>,
    rows: Vec<Datum>,
    cursor: Cursor,
}

impl JoinIterator {
    pub fn new(inputs: Vec<KeyedFiles>) -> Result<Self> {
        if inputs.len() < 2 {
            return Err(Error::config(format!(
                "join requires at least two inputs, found {}",
                inputs.len()
            )));
        }

        // Walk the smallest input; its keys are already sorted.
        let smallest = inputs
            .iter()
            .min_by_key(|input| input.len())
            .map(|input| &input.files)
            .ok_or_else(|| Error::config("join has no inputs"))?;

        let mut keys = Vec::new();
        let mut rows = Vec::new();
        for key in smallest.keys() {
            let row: Option<Datum> = inputs
                .iter()
                .map(|input| input.get(key).cloned())
                .collect();
            if let Some(row) = row {
                keys.push(key.clone());
                rows.push(row);
            }
        }

        Ok(Self {
            keys,
            rows,
            cursor: Cursor::default(),
        })
    }

    /// The shared keys, in datum order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl DatumIterator for JoinIterator {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn next(&mut self) -> bool {
        self.cursor.advance(self.rows.len())
    }

    fn datum(&self) -> Datum {
        self.rows[self.cursor.position()].clone()
    }

    fn datum_n(&self, index: usize) -> Datum {
        check_index(index, self.rows.len());
        self.rows[index].clone()
    }

    fn reset(&mut self) {
        self.cursor = Cursor::default();
    }
}

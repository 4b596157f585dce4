//! Leaf iterator: one datum per matched file

use std::sync::Arc;

use log::warn;

use super::{check_index, Cursor, Datum, DatumIterator};
use crate::filesystem::FileInfo;

/// Iterates the files matched by one glob, in path order.
#[derive(Debug, Clone)]
pub struct PfsIterator {
    files: Vec<Arc<FileInfo>>,
    cursor: Cursor,
}

impl PfsIterator {
    /// Wrap a file listing. Listings not sorted by path are sorted here.
    pub fn new(mut files: Vec<Arc<FileInfo>>) -> Self {
        if !files.windows(2).all(|pair| pair[0].path <= pair[1].path) {
            warn!("file listing of {} files was not sorted by path", files.len());
            files.sort_by(|a, b| a.path.cmp(&b.path));
        }
        Self {
            files,
            cursor: Cursor::default(),
        }
    }

    /// The matched files
    pub fn files(&self) -> &[Arc<FileInfo>] {
        &self.files
    }
}

impl DatumIterator for PfsIterator {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn next(&mut self) -> bool {
        self.cursor.advance(self.files.len())
    }

    fn datum(&self) -> Datum {
        vec![Arc::clone(&self.files[self.cursor.position()])]
    }

    fn datum_n(&self, index: usize) -> Datum {
        check_index(index, self.files.len());
        vec![Arc::clone(&self.files[index])]
    }

    fn reset(&mut self) {
        self.cursor = Cursor::default();
    }
}

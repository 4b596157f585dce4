//! Union iterator: children's datums one after the other

use super::{check_index, Cursor, Datum, DatumIterator};
use crate::error::{Error, Result};

/// Concatenation of its children in declaration order.
///
/// Child `k` owns the global indices `[starts[k], starts[k] + len_k)`.
#[derive(Debug)]
pub struct UnionIterator {
    children: Vec<Box<dyn DatumIterator>>,
    starts: Vec<usize>,
    len: usize,
    cursor: Cursor,
    child: usize,
    local: usize,
}

impl UnionIterator {
    pub fn new(children: Vec<Box<dyn DatumIterator>>) -> Result<Self> {
        let mut starts = Vec::with_capacity(children.len());
        let mut len = 0usize;
        for child in &children {
            starts.push(len);
            len = len
                .checked_add(child.len())
                .ok_or_else(|| Error::config("union has more datums than fit in usize"))?;
        }

        Ok(Self {
            children,
            starts,
            len,
            cursor: Cursor::default(),
            child: 0,
            local: 0,
        })
    }

    /// Child owning global `index`, with the child-local index.
    fn locate(&self, index: usize) -> (usize, usize) {
        // Empty children share their start with the next child, so the last
        // start not after `index` always belongs to a non-empty child.
        let child = self.starts.partition_point(|&start| start <= index) - 1;
        (child, index - self.starts[child])
    }
}

impl DatumIterator for UnionIterator {
    fn len(&self) -> usize {
        self.len
    }

    fn next(&mut self) -> bool {
        let started = self.cursor.is_started();
        if !self.cursor.advance(self.len) {
            return false;
        }
        if started {
            self.local += 1;
        } else {
            self.child = 0;
            self.local = 0;
        }
        while self.local >= self.children[self.child].len() {
            self.child += 1;
            self.local = 0;
        }
        true
    }

    fn datum(&self) -> Datum {
        self.cursor.position();
        self.children[self.child].datum_n(self.local)
    }

    fn datum_n(&self, index: usize) -> Datum {
        check_index(index, self.len);
        let (child, local) = self.locate(index);
        self.children[child].datum_n(local)
    }

    fn reset(&mut self) {
        self.cursor = Cursor::default();
        self.child = 0;
        self.local = 0;
    }
}

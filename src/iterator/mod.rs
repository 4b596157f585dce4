//! # Datum Iterators
//!
//! Every input kind resolves to a [`DatumIterator`]: a cursor over a fixed,
//! finite, ordered collection of datums that also supports random access by
//! index. Combinators hold their children as `Box<dyn DatumIterator>` and
//! only ever use this trait, so any input can be nested in any other.
//!
//! ## Contract
//!
//! ```text
//! unstarted --next()=true--> positioned --next()=false--> exhausted
//! ```
//!
//! - `len()` is fixed at construction.
//! - `next()` advances the forward cursor; once it returns `false` it keeps
//!   returning `false` until `reset()`.
//! - `datum()` is the datum under the cursor. Calling it while unstarted or
//!   exhausted is a programming error and panics.
//! - `datum_n(i)` is the `i`-th datum, for `0 <= i < len()`, and never touches
//!   the cursor. Out-of-range indices panic.
//!
//! For every index, `datum_n(i)` equals the datum observed at position `i`
//! when iterating with `next()` from an unstarted cursor.
//!
//! ## Implementations
//!
//! - [`PfsIterator`]: one datum per matched file.
//! - [`UnionIterator`]: children concatenated in declaration order.
//! - [`CrossIterator`]: Cartesian product, first child varying fastest.
//! - [`JoinIterator`]: files sharing a key across all children, by key.

use std::fmt;
use std::sync::Arc;

use crate::filesystem::FileInfo;

mod cross;
mod join;
mod pfs;
mod union;

pub use cross::CrossIterator;
pub use join::{JoinIterator, KeyedFiles};
pub use pfs::PfsIterator;
pub use union::UnionIterator;

/// One unit of work: a file per leaf input, in leaf order
pub type Datum = Vec<Arc<FileInfo>>;

/// Shared capability set of all datum iterators
pub trait DatumIterator: Send + Sync + fmt::Debug {
    /// Number of datums
    fn len(&self) -> usize;

    /// Whether there are no datums at all
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance the forward cursor, returning whether a datum is available.
    fn next(&mut self) -> bool;

    /// The datum under the forward cursor.
    ///
    /// # Panics
    ///
    /// If the cursor is not positioned on a datum.
    fn datum(&self) -> Datum;

    /// The datum at `index`, without moving the forward cursor.
    ///
    /// # Panics
    ///
    /// If `index >= self.len()`.
    fn datum_n(&self, index: usize) -> Datum;

    /// Return the forward cursor to its unstarted state.
    fn reset(&mut self);
}

/// Position of a forward cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Cursor {
    #[default]
    Unstarted,
    At(usize),
    Exhausted,
}

impl Cursor {
    /// Step forward within `len` datums; false once past the end.
    pub(crate) fn advance(&mut self, len: usize) -> bool {
        let next = match *self {
            Cursor::Unstarted => 0,
            Cursor::At(position) => position + 1,
            Cursor::Exhausted => return false,
        };
        if next < len {
            *self = Cursor::At(next);
            true
        } else {
            *self = Cursor::Exhausted;
            false
        }
    }

    /// The current position, panicking when there is none.
    pub(crate) fn position(&self) -> usize {
        match *self {
            Cursor::At(position) => position,
            Cursor::Unstarted => panic!("datum() called before a successful next()"),
            Cursor::Exhausted => panic!("datum() called on an exhausted iterator"),
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        !matches!(self, Cursor::Unstarted)
    }
}

pub(crate) fn check_index(index: usize, len: usize) {
    assert!(
        index < len,
        "datum index {} out of range for iterator of length {}",
        index,
        len
    );
}

/// Random-access walk over every datum of an iterator, in order.
///
/// Unlike `next()`, this borrows the iterator immutably and leaves its forward
/// cursor untouched.
pub struct Datums<'a> {
    iter: &'a dyn DatumIterator,
    index: usize,
}

/// Walk every datum of `iter` by index
pub fn datums(iter: &dyn DatumIterator) -> Datums<'_> {
    Datums { iter, index: 0 }
}

impl Iterator for Datums<'_> {
    type Item = Datum;

    fn next(&mut self) -> Option<Datum> {
        if self.index >= self.iter.len() {
            return None;
        }
        let datum = self.iter.datum_n(self.index);
        self.index += 1;
        Some(datum)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.iter.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Datums<'_> {}

/// Concatenate the paths of a datum's files, e.g. `/foo11/foo12`
pub fn concat_paths(datum: &[Arc<FileInfo>]) -> String {
    datum.iter().map(|file| file.path.as_str()).collect()
}

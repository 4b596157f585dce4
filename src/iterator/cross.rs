//! Cross iterator: the Cartesian product of its children

use super::{check_index, Cursor, Datum, DatumIterator};
use crate::error::{Error, Result};

/// Every combination of one datum per child.
///
/// Global indices are mixed-radix numbers whose digit `k` has radix
/// `len(child k)`, with child 0 as the least significant digit:
///
/// ```text
/// i = i0 + len0 * (i1 + len1 * (i2 + ...))
/// ```
///
/// so the first child varies fastest. A datum is the concatenation of each
/// child's local datum in declaration order. If any child is empty the
/// product is empty, whatever the other children hold.
#[derive(Debug)]
pub struct CrossIterator {
    children: Vec<Box<dyn DatumIterator>>,
    lens: Vec<usize>,
    len: usize,
    cursor: Cursor,
    digits: Vec<usize>,
}

impl CrossIterator {
    pub fn new(children: Vec<Box<dyn DatumIterator>>) -> Result<Self> {
        if children.is_empty() {
            return Err(Error::config("cross requires at least one input"));
        }

        let lens: Vec<usize> = children.iter().map(|child| child.len()).collect();
        let len = if lens.contains(&0) {
            0
        } else {
            lens.iter()
                .try_fold(1usize, |product, &len| product.checked_mul(len))
                .ok_or_else(|| {
                    Error::config_with_hint(
                        format!("cross of {:?} datums overflows usize", lens),
                        "use a coarser glob on one of the crossed inputs",
                    )
                })?
        };

        Ok(Self {
            digits: vec![0; children.len()],
            children,
            lens,
            len,
            cursor: Cursor::default(),
        })
    }

    fn assemble(&self, digits: impl Iterator<Item = usize>) -> Datum {
        self.children
            .iter()
            .zip(digits)
            .flat_map(|(child, digit)| child.datum_n(digit))
            .collect()
    }
}

impl DatumIterator for CrossIterator {
    fn len(&self) -> usize {
        self.len
    }

    fn next(&mut self) -> bool {
        let started = self.cursor.is_started();
        if !self.cursor.advance(self.len) {
            return false;
        }
        if !started {
            self.digits.iter_mut().for_each(|digit| *digit = 0);
            return true;
        }
        // Odometer step: bump the fastest digit, carrying on overflow.
        for (digit, &radix) in self.digits.iter_mut().zip(&self.lens) {
            *digit += 1;
            if *digit < radix {
                break;
            }
            *digit = 0;
        }
        true
    }

    fn datum(&self) -> Datum {
        self.cursor.position();
        self.assemble(self.digits.iter().copied())
    }

    fn datum_n(&self, index: usize) -> Datum {
        check_index(index, self.len);
        let mut rest = index;
        let digits = self.lens.iter().map(move |&radix| {
            let digit = rest % radix;
            rest /= radix;
            digit
        });
        self.assemble(digits)
    }

    fn reset(&mut self) {
        self.cursor = Cursor::default();
        self.digits.iter_mut().for_each(|digit| *digit = 0);
    }
}

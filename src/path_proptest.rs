//! Property-based tests for glob matching, key templates and iterator
//! indexing.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::filesystem::FileInfo;
    use crate::iterator::{concat_paths, CrossIterator, DatumIterator, PfsIterator, UnionIterator};
    use crate::path::{capture_key, clean_path, glob_match, GlobPattern, KeyTemplate};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn leaf(prefix: &str, len: usize) -> Box<dyn DatumIterator> {
        let files = (0..len)
            .map(|i| {
                let path = format!("/{}{}", prefix, i);
                Arc::new(FileInfo::new("repo", "commit", &path, b""))
            })
            .collect();
        Box::new(PfsIterator::new(files))
    }

    // ============================================================================
    // glob property tests
    // ============================================================================

    proptest! {
        /// Property: a pattern without special characters matches exactly itself
        #[test]
        fn glob_literal_matches_itself(path in "(/[a-zA-Z0-9_.-]{1,8}){1,4}") {
            prop_assert!(glob_match(&path, &path).unwrap());
            let longer = format!("{}x", path);
            prop_assert!(!glob_match(&path, &longer).unwrap());
        }

        /// Property: `!(p)` selects exactly the paths `p` rejects
        #[test]
        fn glob_negation_is_complement(
            pattern in "/[a-c?*]{1,4}",
            path in "(/[a-c]{0,4}){1,3}",
        ) {
            let plain = GlobPattern::new(&pattern).unwrap();
            let negated = GlobPattern::new(&format!("!({})", pattern)).unwrap();
            prop_assert_ne!(plain.matches(&path), negated.matches(&path));
        }

        /// Property: `*` and `?` never cross a `/`
        #[test]
        fn glob_single_star_stays_in_segment(
            first in "[a-z]{1,5}",
            second in "[a-z]{1,5}",
        ) {
            let path = format!("/{}/{}", first, second);
            prop_assert!(!glob_match("/*", &path).unwrap());
            prop_assert!(glob_match("/*/*", &path).unwrap());
            prop_assert!(glob_match("/**", &path).unwrap());
        }

        /// Property: clean_path is idempotent and always rooted
        #[test]
        fn clean_path_is_idempotent(path in "[a-z/]{0,20}") {
            let once = clean_path(&path);
            prop_assert!(once.starts_with('/'));
            prop_assert_eq!(clean_path(&once), once.clone());
        }
    }

    // ============================================================================
    // key template property tests
    // ============================================================================

    proptest! {
        /// Property: swapping groups in the template swaps them in the key
        #[test]
        fn key_template_reorders_groups(a in "[a-z0-9]", b in "[a-z0-9]") {
            let pattern = GlobPattern::new("/foo(?)(?)").unwrap();
            let path = format!("/foo{}{}", a, b);
            let forward = KeyTemplate::parse("$1$2").unwrap();
            let backward = KeyTemplate::parse("$2$1").unwrap();
            prop_assert_eq!(
                capture_key(&pattern, &path, &forward).unwrap(),
                format!("{}{}", a, b)
            );
            prop_assert_eq!(
                capture_key(&pattern, &path, &backward).unwrap(),
                format!("{}{}", b, a)
            );
        }

        /// Property: `$0` is always the whole path
        #[test]
        fn key_template_zero_is_path(path in "(/[a-z]{1,5}){1,3}") {
            let pattern = GlobPattern::new("/**").unwrap();
            let template = KeyTemplate::parse("$0").unwrap();
            prop_assert_eq!(capture_key(&pattern, &path, &template).unwrap(), path);
        }
    }

    // ============================================================================
    // iterator property tests
    // ============================================================================

    proptest! {
        /// Property: sequential iteration of a cross visits `datum_n(0..len)`
        #[test]
        fn cross_sequential_matches_random_access(lens in prop::collection::vec(0usize..5, 1..4)) {
            let prefixes = ["a", "b", "c"];
            let children = lens
                .iter()
                .zip(prefixes)
                .map(|(&len, prefix)| leaf(prefix, len))
                .collect();
            let mut iter = CrossIterator::new(children).unwrap();
            prop_assert_eq!(iter.len(), lens.iter().product::<usize>());

            let mut index = 0;
            while iter.next() {
                prop_assert_eq!(concat_paths(&iter.datum()), concat_paths(&iter.datum_n(index)));
                index += 1;
            }
            prop_assert_eq!(index, iter.len());
        }

        /// Property: a union's length is the sum of its children's and every
        /// index resolves to the child owning it
        #[test]
        fn union_len_is_sum(lens in prop::collection::vec(0usize..6, 1..5)) {
            let prefixes = ["a", "b", "c", "d"];
            let children = lens
                .iter()
                .zip(prefixes)
                .map(|(&len, prefix)| leaf(prefix, len))
                .collect();
            let iter = UnionIterator::new(children).unwrap();
            prop_assert_eq!(iter.len(), lens.iter().sum::<usize>());

            let mut index = 0;
            for (&len, prefix) in lens.iter().zip(prefixes) {
                for local in 0..len {
                    let expected = format!("/{}{}", prefix, local);
                    prop_assert_eq!(concat_paths(&iter.datum_n(index)), expected);
                    index += 1;
                }
            }
        }
    }
}

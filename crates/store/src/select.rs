//! Revision selection
//!
//! Every committed-tier read answers "what did this look like at revision R":
//! among the records sharing a key, keep the one with the highest revision
//! that is `<= R`. Writes never produce two records for the same
//! (key, revision), so there is no tie to break.

use arbor_core::RevisionNumber;
use std::collections::BTreeMap;

/// Per key, the record with the highest revision at or before `at`
///
/// Records may arrive in any order. Keys with no record at or before `at`
/// are absent from the result.
pub fn latest_at_or_before<K, T, I>(records: I, at: RevisionNumber) -> BTreeMap<K, (RevisionNumber, T)>
where
    K: Ord,
    I: IntoIterator<Item = (K, RevisionNumber, T)>,
{
    let mut selected: BTreeMap<K, (RevisionNumber, T)> = BTreeMap::new();
    for (key, revision, record) in records {
        if revision > at {
            continue;
        }
        match selected.get(&key) {
            Some((current, _)) if *current >= revision => {}
            _ => {
                selected.insert(key, (revision, record));
            }
        }
    }
    selected
}

/// Highest revision at or before `at` among one key's revisions, in any order
pub fn latest_revision_at_or_before<I>(revisions: I, at: RevisionNumber) -> Option<RevisionNumber>
where
    I: IntoIterator<Item = RevisionNumber>,
{
    revisions.into_iter().filter(|r| *r <= at).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: u128) -> RevisionNumber {
        RevisionNumber::new(n)
    }

    #[test]
    fn test_picks_highest_not_after_requested() {
        let records = vec![("a", r(1), "a1"), ("a", r(5), "a5"), ("a", r(3), "a3")];
        let selected = latest_at_or_before(records.clone(), r(4));
        assert_eq!(selected["a"], (r(3), "a3"));

        let selected = latest_at_or_before(records, r(9));
        assert_eq!(selected["a"], (r(5), "a5"));
    }

    #[test]
    fn test_key_absent_before_first_record() {
        let records = vec![("a", r(2), 0), ("b", r(1), 1)];
        let selected = latest_at_or_before(records, r(1));
        assert!(!selected.contains_key("a"));
        assert_eq!(selected["b"], (r(1), 1));
    }

    #[test]
    fn test_exact_revision_is_included() {
        let selected = latest_at_or_before(vec![("a", r(7), ())], r(7));
        assert!(selected.contains_key("a"));
    }

    #[test]
    fn test_latest_revision_helper() {
        assert_eq!(latest_revision_at_or_before(vec![r(4), r(1), r(2)], r(3)), Some(r(2)));
        assert_eq!(latest_revision_at_or_before(vec![r(4)], r(3)), None);
    }
}

//! Filtering of collected links against the persisted record set

use std::collections::HashSet;
use tracing::debug;

use crate::domain::listing::ProductLink;

/// Links in `candidates` that are not in `known`.
///
/// `known` is the snapshot loaded once at the start of a run; it is not
/// updated while the run is in progress.
pub fn filter_new(candidates: HashSet<ProductLink>, known: &HashSet<ProductLink>) -> HashSet<ProductLink> {
    let total = candidates.len();
    let fresh: HashSet<ProductLink> = candidates
        .into_iter()
        .filter(|link| !known.contains(link))
        .collect();
    debug!("Dedup: {} of {} links are new", fresh.len(), total);
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn links(urls: &[&str]) -> HashSet<ProductLink> {
        urls.iter().map(|u| ProductLink::new(*u)).collect()
    }

    #[test]
    fn test_known_links_are_removed() {
        let fresh = filter_new(
            links(&["https://shop.test/p/1", "https://shop.test/p/2"]),
            &links(&["https://shop.test/p/1"]),
        );
        assert_eq!(fresh, links(&["https://shop.test/p/2"]));
    }

    #[test]
    fn test_links_compare_verbatim() {
        let fresh = filter_new(links(&["https://shop.test/p/1?color=red"]), &links(&["https://shop.test/p/1"]));
        assert_eq!(fresh.len(), 1);
    }

    fn link_set() -> impl Strategy<Value = HashSet<ProductLink>> {
        prop::collection::hash_set("[a-d]{1,3}", 0..12)
            .prop_map(|paths| paths.into_iter().map(|p| ProductLink::new(format!("https://shop.test/{p}"))).collect())
    }

    proptest! {
        #[test]
        fn prop_result_is_disjoint_from_known(candidates in link_set(), known in link_set()) {
            let fresh = filter_new(candidates.clone(), &known);
            prop_assert!(fresh.is_disjoint(&known));
            prop_assert!(fresh.is_subset(&candidates));
        }

        #[test]
        fn prop_empty_known_is_identity(candidates in link_set()) {
            prop_assert_eq!(filter_new(candidates.clone(), &HashSet::new()), candidates);
        }
    }
}

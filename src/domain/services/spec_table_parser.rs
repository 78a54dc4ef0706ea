//! Specification table parser

use tracing::debug;

use crate::domain::attributes::RawAttributeMap;

/// Map specification table rows to attributes.
///
/// The last row of the widget is always a trailing noise row on the catalogs
/// this crate targets and is dropped, so a single-row table yields an empty
/// map. Labels are kept as written apart from surrounding whitespace; a row
/// with a blank label is ignored and a blank value is recorded as absent.
pub fn parse_spec_table(rows: &[(String, String)]) -> RawAttributeMap {
    let Some((_, kept)) = rows.split_last() else {
        return RawAttributeMap::new();
    };

    let mut attributes = RawAttributeMap::new();
    for (label, value) in kept {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        let value = value.trim();
        attributes.insert(label, (!value.is_empty()).then(|| value.to_string()));
    }

    debug!("Spec table parsed: {} rows kept of {}", attributes.len(), rows.len());
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(l, v)| (l.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_last_row_is_dropped() {
        let map = parse_spec_table(&rows(&[("Color", "Red"), ("Size", "M"), ("Noise", "drop-me")]));
        assert_eq!(map.get("Color"), Some("Red"));
        assert_eq!(map.get("Size"), Some("M"));
        assert!(!map.declares("Noise"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_single_row_yields_empty_map() {
        let map = parse_spec_table(&rows(&[("Color", "Red")]));
        assert!(map.is_empty());
    }

    #[test]
    fn test_empty_table() {
        assert!(parse_spec_table(&[]).is_empty());
    }

    #[test]
    fn test_labels_are_not_case_normalized() {
        let map = parse_spec_table(&rows(&[("Product Category", " Unstitched 3 Piece "), ("season", "Summer"), ("x", "y")]));
        assert_eq!(map.get("Product Category"), Some("Unstitched 3 Piece"));
        assert_eq!(map.get("season"), Some("Summer"));
        assert_eq!(map.get("Season"), None);
    }

    #[test]
    fn test_blank_value_is_absent() {
        let map = parse_spec_table(&rows(&[("Design", "  "), ("x", "y")]));
        assert!(map.declares("Design"));
        assert_eq!(map.get("Design"), None);
    }
}

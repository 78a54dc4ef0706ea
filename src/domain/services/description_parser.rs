//! Free-text product description parser
//!
//! Descriptions are loose `Label: value` lists separated by newlines, commas,
//! hyphens or slashes. Each segment is matched against an ordered list of
//! label markers; the first marker contained in the segment claims it.

use once_cell::sync::Lazy;
use tracing::debug;

use crate::domain::attributes::RawAttributeMap;

/// A description label marker and the attribute it populates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionLabel {
    /// Lowercase marker searched for in a segment, colon included.
    pub marker: &'static str,
    pub attribute: &'static str,
}

const fn label(marker: &'static str, attribute: &'static str) -> DescriptionLabel {
    DescriptionLabel { marker, attribute }
}

/// Labels in match priority order.
///
/// Markers that contain another marker come first: `"shirt length:"` and the
/// other `*length:` markers precede `"length:"`, `"wear type:"` precedes
/// `"type:"`, and `"fabric type:"` precedes both.
pub const DESCRIPTION_LABELS: [DescriptionLabel; 16] = [
    label("fabric type:", "Fabric Type"),
    label("neckline:", "Neckline"),
    label("collection:", "Collection"),
    label("dupatta length:", "Dupatta Length"),
    label("shirt length:", "Shirt Length"),
    label("trouser length:", "Trouser Length"),
    label("sleeve length:", "Sleeve Length"),
    label("wear type:", "Wear Type"),
    label("type:", "Type"),
    label("shirt front:", "Shirt Front"),
    label("shirt back:", "Shirt Back"),
    label("trouser:", "Trouser"),
    label("sleeves:", "Sleeves"),
    label("style cut:", "Style Cut"),
    label("length:", "Length"),
    label("embellishment:", "Embellishment"),
];

const SEGMENT_DELIMITERS: [char; 5] = ['\n', ',', '-', '/', '\t'];

/// Segments containing this character are markup noise.
const NOISE_MARKER: char = '*';

static DEFAULT_PARSER: Lazy<DescriptionParser> = Lazy::new(DescriptionParser::default);

/// Parse a description with the default label table.
pub fn parse_description(text: Option<&str>) -> RawAttributeMap {
    DEFAULT_PARSER.parse(text)
}

#[derive(Debug, Clone)]
pub struct DescriptionParser {
    labels: Vec<DescriptionLabel>,
}

impl Default for DescriptionParser {
    fn default() -> Self {
        Self {
            labels: DESCRIPTION_LABELS.to_vec(),
        }
    }
}

impl DescriptionParser {
    /// Every known label is declared in the result; labels not found in the
    /// text stay absent. A later segment for the same label overwrites an
    /// earlier one.
    pub fn parse(&self, text: Option<&str>) -> RawAttributeMap {
        let mut features = RawAttributeMap::with_absent(self.labels.iter().map(|l| l.attribute));

        let Some(text) = text else {
            return features;
        };

        for segment in text.split(SEGMENT_DELIMITERS) {
            if segment.contains(NOISE_MARKER) {
                continue;
            }
            if let Some((attribute, value)) = self.match_segment(segment) {
                features.insert(attribute, value);
            }
        }

        debug!(
            "Description parsed: {}/{} labels present",
            features.present_count(),
            self.labels.len()
        );
        features
    }

    /// First label in priority order whose marker occurs in the segment, with
    /// the trimmed text after the segment's first colon.
    fn match_segment<'a>(&'a self, segment: &str) -> Option<(&'a str, Option<String>)> {
        let lowered = segment.to_lowercase();
        let label = self.labels.iter().find(|l| lowered.contains(l.marker))?;
        let value = segment
            .split_once(':')
            .map(|(_, rest)| rest.trim())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string);
        Some((label.attribute, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_fabric_type_extracted() {
        let map = parse_description(Some("Fabric Type: Lawn\nNeckline: Round"));
        assert_eq!(map.get("Fabric Type"), Some("Lawn"));
        assert_eq!(map.get("Neckline"), Some("Round"));
    }

    #[test]
    fn test_shirt_length_does_not_populate_length() {
        let map = parse_description(Some("Shirt Length: Long, Trouser: Plain"));
        assert_eq!(map.get("Shirt Length"), Some("Long"));
        assert_eq!(map.get("Length"), None);
        assert_eq!(map.get("Trouser"), Some("Plain"));
    }

    #[test]
    fn test_bare_length_populates_length() {
        let map = parse_description(Some("Length: 40 inches"));
        assert_eq!(map.get("Length"), Some("40 inches"));
        assert_eq!(map.get("Shirt Length"), None);
    }

    #[rstest]
    #[case("Wear Type: Casual", "Wear Type", "Casual")]
    #[case("Type: Unstitched", "Type", "Unstitched")]
    #[case("fabric type: Khaddar", "Fabric Type", "Khaddar")]
    #[case("SLEEVE LENGTH: Full", "Sleeve Length", "Full")]
    #[case("Dupatta Length: 2.5 Meters", "Dupatta Length", "2.5 Meters")]
    #[case("Embellishment: Embroidered", "Embellishment", "Embroidered")]
    fn test_label_priority(#[case] text: &str, #[case] attribute: &str, #[case] value: &str) {
        let map = parse_description(Some(text));
        assert_eq!(map.get(attribute), Some(value));
        assert_eq!(map.present_count(), 1);
    }

    #[test]
    fn test_segments_split_on_all_delimiters() {
        let map = parse_description(Some(
            "Fabric Type: Lawn - Neckline: Round / Collection: Summer, Shirt Front: Printed",
        ));
        assert_eq!(map.get("Fabric Type"), Some("Lawn"));
        assert_eq!(map.get("Neckline"), Some("Round"));
        assert_eq!(map.get("Collection"), Some("Summer"));
        assert_eq!(map.get("Shirt Front"), Some("Printed"));
    }

    #[test]
    fn test_noise_segments_are_skipped() {
        let map = parse_description(Some("*Neckline: Round*\nSleeves: Full"));
        assert_eq!(map.get("Neckline"), None);
        assert_eq!(map.get("Sleeves"), Some("Full"));
    }

    #[test]
    fn test_value_is_text_after_first_colon() {
        let map = parse_description(Some("Style Cut: A: Line"));
        assert_eq!(map.get("Style Cut"), Some("A: Line"));
    }

    #[test]
    fn test_missing_description_declares_every_label_absent() {
        let map = parse_description(None);
        assert_eq!(map.len(), 16);
        assert_eq!(map.present_count(), 0);
    }

    #[test]
    fn test_empty_value_is_absent() {
        let map = parse_description(Some("Neckline:   "));
        assert_eq!(map.get("Neckline"), None);
    }
}

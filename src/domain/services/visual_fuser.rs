//! Visual attribute inference
//!
//! The product category selects a list of natural-language questions; each
//! question is put to the visual question answering model against the
//! product image and the best-ranked answers become one attribute.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::attributes::RawAttributeMap;
use crate::domain::collaborators::{RankedLabel, VisualQa};
use crate::domain::errors::PipelineError;

pub const SHIRT_PATTERN: &str = "describe the shirt pattern";
pub const SHIRT_COLOR: &str = "describe the shirt color";
pub const SHIRT_NECKLINE: &str = "describe the neckline of shirt";
pub const SHIRT_SLEEVES: &str = "describe the sleeves of the shirt";
pub const SHIRT_DAMAN: &str = "describe the daman of shirt";
pub const SHIRT_LENGTH: &str = "Is shirt length short, mid-length or long";
pub const TROUSER_PATTERN: &str = "describe the trouser pattern";
pub const TROUSER_COLOR: &str = "describe the trouser color";
pub const TROUSER_LENGTH: &str = "Is trouser length short, mid-length or long";
pub const DUPATTA_COLOR: &str = "describe the dupatta color";
pub const DUPATTA_PATTERN: &str = "describe the dupatta pattern";
pub const MULTICOLORED: &str = "Is the item multicolored";
pub const TROUSER_STYLE: &str = "describe the trouser style";
pub const DUPATTA_PRINTED: &str = "Is dupatta printed";
pub const SLEEVES_PATTERN: &str = "describe the sleeves pattern";

/// Question tables: which questions each product category gets, and which
/// attribute each question's answer is stored under.
///
/// Category keys are matched after trimming and lowercasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualQuestionCatalog {
    pub categories: BTreeMap<String, Vec<String>>,
    pub attributes: BTreeMap<String, String>,
}

impl Default for VisualQuestionCatalog {
    fn default() -> Self {
        let unstitched_one = vec![SHIRT_PATTERN, SHIRT_COLOR, SHIRT_SLEEVES, SHIRT_DAMAN];
        let kurti = vec![SHIRT_PATTERN, SHIRT_COLOR, SHIRT_NECKLINE, SHIRT_SLEEVES, SHIRT_DAMAN, SHIRT_LENGTH];
        let two_piece_stitched = [kurti.clone(), vec![TROUSER_PATTERN, TROUSER_COLOR, TROUSER_LENGTH]].concat();

        let categories = [
            ("unstitched 1 piece", unstitched_one.clone()),
            (
                "unstitched 2 piece - shirt and dupatta",
                [unstitched_one.clone(), vec![DUPATTA_COLOR, DUPATTA_PATTERN]].concat(),
            ),
            (
                "unstitched 2 piece - shirt and trouser",
                [unstitched_one.clone(), vec![TROUSER_PATTERN, TROUSER_COLOR]].concat(),
            ),
            (
                "unstitched 3 piece",
                [unstitched_one, vec![TROUSER_PATTERN, TROUSER_COLOR, DUPATTA_COLOR, DUPATTA_PATTERN]].concat(),
            ),
            ("ladies kurti", kurti),
            ("2 piece stitched", two_piece_stitched.clone()),
            ("3 piece stitched", [two_piece_stitched, vec![DUPATTA_COLOR, DUPATTA_PATTERN]].concat()),
        ];

        let attributes = [
            (SHIRT_PATTERN, "Shirt Pattern"),
            (SHIRT_COLOR, "Shirt color"),
            (SHIRT_NECKLINE, "Shirt Neckline"),
            (SHIRT_SLEEVES, "Shirt Sleeves"),
            (SHIRT_DAMAN, "Shirt Daman"),
            (SHIRT_LENGTH, "Shirt Length"),
            (TROUSER_PATTERN, "Trouser Pattern"),
            (TROUSER_COLOR, "Trouser Color"),
            (TROUSER_LENGTH, "Trouser Length"),
            (DUPATTA_COLOR, "Dupatta Color"),
            (DUPATTA_PATTERN, "Dupatta Pattern"),
            (MULTICOLORED, "if multicolored"),
            (TROUSER_STYLE, "Trouser Style"),
            (DUPATTA_PRINTED, "Is Dupatta Printed"),
            (SLEEVES_PATTERN, "Sleeves Pattern"),
        ];

        Self {
            categories: categories
                .into_iter()
                .map(|(category, questions)| {
                    (category.to_string(), questions.into_iter().map(str::to_string).collect())
                })
                .collect(),
            attributes: attributes
                .into_iter()
                .map(|(question, attribute)| (question.to_string(), attribute.to_string()))
                .collect(),
        }
    }
}

impl VisualQuestionCatalog {
    /// Questions for a category; unknown categories get none.
    pub fn questions_for(&self, category: &str) -> &[String] {
        self.categories
            .get(&category.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn attribute_for(&self, question: &str) -> Option<&str> {
        self.attributes.get(question).map(String::as_str)
    }
}

/// Attributes inferred for one product plus the questions that failed.
#[derive(Debug, Default)]
pub struct VisualInference {
    pub attributes: RawAttributeMap,
    pub failures: Vec<PipelineError>,
}

/// Space-joined labels of the `top_k` highest scores.
pub fn top_labels(mut labels: Vec<RankedLabel>, top_k: usize) -> String {
    labels.sort_by(|a, b| b.score.total_cmp(&a.score));
    labels
        .iter()
        .take(top_k)
        .map(|l| l.label.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct VisualAttributeFuser {
    catalog: VisualQuestionCatalog,
    top_k: usize,
    inference_wait: Duration,
}

impl VisualAttributeFuser {
    pub fn new(catalog: VisualQuestionCatalog, top_k: usize, inference_wait: Duration) -> Self {
        Self {
            catalog,
            top_k,
            inference_wait,
        }
    }

    /// Ask every question of the category about `image`, one call each.
    ///
    /// A failed or timed-out call leaves its attribute declared but absent and
    /// is reported in `failures`; the other questions are still asked.
    pub async fn infer_visual_attributes(
        &self,
        qa: &dyn VisualQa,
        image: &Path,
        product_category: &str,
    ) -> VisualInference {
        let mut inference = VisualInference::default();
        let questions = self.catalog.questions_for(product_category);
        if questions.is_empty() {
            debug!("No visual questions for category '{}'", product_category.trim());
            return inference;
        }

        for question in questions {
            let Some(attribute) = self.catalog.attribute_for(question) else {
                warn!("⚠️ Visual question '{}' has no attribute mapping, skipped", question);
                continue;
            };

            let answer = match tokio::time::timeout(self.inference_wait, qa.answer(image, question)).await {
                Ok(result) => result,
                Err(_) => Err(PipelineError::inference_failure(
                    question,
                    format!("no answer within {}s", self.inference_wait.as_secs()),
                )),
            };

            match answer {
                Ok(labels) => {
                    let value = top_labels(labels, self.top_k);
                    debug!("Visual answer '{}' -> {}: {}", question, attribute, value);
                    inference.attributes.insert(attribute, (!value.is_empty()).then_some(value));
                }
                Err(e) => {
                    warn!("⚠️ Visual inference failed for '{}': {}", question, e);
                    inference.attributes.insert(attribute, None);
                    inference.failures.push(e);
                }
            }
        }

        inference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeVisualQa;

    fn fuser() -> VisualAttributeFuser {
        VisualAttributeFuser::new(VisualQuestionCatalog::default(), 5, Duration::from_secs(1))
    }

    #[test]
    fn test_default_catalog_shape() {
        let catalog = VisualQuestionCatalog::default();
        assert_eq!(catalog.categories.len(), 7);
        assert_eq!(catalog.attributes.len(), 15);
        assert_eq!(catalog.questions_for("  Ladies Kurti ").len(), 6);
        assert_eq!(catalog.questions_for("3 piece stitched").len(), 11);
        for questions in catalog.categories.values() {
            for question in questions {
                assert!(catalog.attribute_for(question).is_some(), "{question} unmapped");
            }
        }
    }

    #[test]
    fn test_top_labels_keeps_best_five() {
        let labels = (0..7).map(|i| RankedLabel::new(format!("l{i}"), f64::from(i))).collect();
        assert_eq!(top_labels(labels, 5), "l6 l5 l4 l3 l2");
    }

    #[tokio::test]
    async fn test_unknown_category_yields_empty_map() {
        let qa = FakeVisualQa::answering(vec![RankedLabel::new("floral", 0.9)]);
        let inference = fuser().infer_visual_attributes(&qa, Path::new("a.jpg"), "Bedsheet").await;
        assert!(inference.attributes.is_empty());
        assert!(inference.failures.is_empty());
        assert_eq!(qa.calls(), 0);
    }

    #[tokio::test]
    async fn test_one_call_per_question() {
        let qa = FakeVisualQa::answering(vec![RankedLabel::new("plain", 0.2), RankedLabel::new("floral", 0.7)]);
        let inference = fuser()
            .infer_visual_attributes(&qa, Path::new("a.jpg"), "Unstitched 1 Piece")
            .await;
        assert_eq!(qa.calls(), 4);
        assert_eq!(inference.attributes.get("Shirt Pattern"), Some("floral plain"));
        assert_eq!(inference.attributes.get("Shirt Daman"), Some("floral plain"));
    }

    #[tokio::test]
    async fn test_failed_question_does_not_abort_others() {
        let qa = FakeVisualQa::answering(vec![RankedLabel::new("red", 0.9)]).failing_on(SHIRT_COLOR);
        let inference = fuser()
            .infer_visual_attributes(&qa, Path::new("a.jpg"), "unstitched 1 piece")
            .await;
        assert_eq!(inference.failures.len(), 1);
        assert!(inference.attributes.declares("Shirt color"));
        assert_eq!(inference.attributes.get("Shirt color"), None);
        assert_eq!(inference.attributes.get("Shirt Sleeves"), Some("red"));
    }
}

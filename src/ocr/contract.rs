//! Engine Output Contracts
//!
//! The engine answers in one of two shapes depending on its generation:
//!
//! - **Legacy**: `[page, ...]` where each page is `null` or
//!   `[[polygon, [text, confidence]], ...]`
//! - **Current**: `[page_result, ...]` where each page result is an object
//!   (optionally wrapped as `{"res": {...}}`) carrying parallel
//!   `rec_texts` / `rec_scores` / `rec_polys` sequences and an optional
//!   `page_index`
//!
//! The shape is resolved once per call and decoded into a [`Recognition`];
//! nothing past this module sees engine-specific structures.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::{EngineError, Point, RawLine, Recognition};

/// Which contract an engine response follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Legacy,
    Current,
}

/// Engine output, resolved to one contract
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Legacy(Vec<Option<Vec<LegacyLine>>>),
    Current(Vec<PageResult>),
}

/// `[polygon, [text, confidence]]`
pub type LegacyLine = (Vec<Point>, (String, f64));

/// One page result object of the current contract
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    Wrapped { res: PageRecord },
    Bare(PageRecord),
}

/// Objects with a `res` key are wrapped; anything else must itself be a
/// record carrying recognized texts
impl<'de> Deserialize<'de> for PageResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut object = Map::<String, Value>::deserialize(deserializer)?;

        match object.remove("res") {
            Some(res) => PageRecord::deserialize(res)
                .map(|res| Self::Wrapped { res })
                .map_err(de::Error::custom),
            None => PageRecord::deserialize(Value::Object(object))
                .map(Self::Bare)
                .map_err(de::Error::custom),
        }
    }
}

impl PageResult {
    fn record(&self) -> &PageRecord {
        match self {
            Self::Wrapped { res } => res,
            Self::Bare(record) => record,
        }
    }
}

/// Parallel per-line sequences of one page, aligned by index
///
/// `rec_texts` is required. Detection polygons (`dt_polys`) are ignored:
/// recognition drops low-score boxes, so they do not line up with the texts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageRecord {
    #[serde(alias = "recognized_texts")]
    pub rec_texts: Vec<String>,
    #[serde(default, alias = "confidence_scores")]
    pub rec_scores: Vec<f64>,
    #[serde(default, alias = "detected_polygons")]
    pub rec_polys: Vec<Vec<Point>>,
    #[serde(default)]
    pub page_index: Option<i64>,
}

impl EngineOutput {
    /// Inspect the shape of a raw engine value and decode it
    pub fn resolve(value: Value) -> Result<Self, EngineError> {
        match detect(&value)? {
            None => Ok(Self::Legacy(Vec::new())),
            Some(ContractKind::Legacy) => Ok(Self::Legacy(serde_json::from_value(value)?)),
            Some(ContractKind::Current) => Ok(Self::Current(serde_json::from_value(value)?)),
        }
    }

    pub fn kind(&self) -> ContractKind {
        match self {
            Self::Legacy(_) => ContractKind::Legacy,
            Self::Current(_) => ContractKind::Current,
        }
    }

    /// Flatten into lines with 1-based page numbers
    pub fn normalize(self) -> Recognition {
        let mut recognition = Recognition::default();

        match self {
            Self::Legacy(pages) => {
                for (ordinal, page) in pages.into_iter().enumerate() {
                    let page_number = ordinal_page_number(ordinal);
                    recognition.page_numbers.push(page_number);

                    for (polygon, (text, confidence)) in page.into_iter().flatten() {
                        recognition.lines.push(RawLine {
                            text,
                            confidence,
                            polygon,
                            page: page_number,
                        });
                    }
                }
            }
            Self::Current(pages) => {
                for (ordinal, page) in pages.into_iter().enumerate() {
                    let record = page.record();
                    let page_number = record
                        .page_index
                        .and_then(|index| u32::try_from(index).ok())
                        .and_then(|index| index.checked_add(1))
                        .unwrap_or_else(|| ordinal_page_number(ordinal));
                    recognition.page_numbers.push(page_number);

                    for (i, text) in record.rec_texts.iter().enumerate() {
                        recognition.lines.push(RawLine {
                            text: text.clone(),
                            confidence: record.rec_scores.get(i).copied().unwrap_or(0.0),
                            polygon: record.rec_polys.get(i).cloned().unwrap_or_default(),
                            page: page_number,
                        });
                    }
                }
            }
        }

        recognition
    }
}

/// `None` means the engine reported nothing at all
fn detect(value: &Value) -> Result<Option<ContractKind>, EngineError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(pages) if pages.is_empty() => Ok(None),
        Value::Array(pages) if pages.iter().any(Value::is_object) => {
            Ok(Some(ContractKind::Current))
        }
        Value::Array(_) => Ok(Some(ContractKind::Legacy)),
        other => Err(EngineError::UnrecognizedShape(format!(
            "expected a list of pages, got {}",
            json_type_name(other)
        ))),
    }
}

fn ordinal_page_number(ordinal: usize) -> u32 {
    u32::try_from(ordinal).map_or(u32::MAX, |n| n.saturating_add(1))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_two_pages() -> Value {
        json!([
            [
                [[[0, 0], [10, 0], [10, 5], [0, 5]], ["Invoice", 0.95]],
                [[[0, 6], [10, 6], [10, 11], [0, 11]], ["Total 12.00", 0.8]]
            ],
            [
                [[[1.5, 2.5], [3.5, 2.5], [3.5, 4.5], [1.5, 4.5]], ["Thanks", 0.6]]
            ]
        ])
    }

    fn current_two_pages() -> Value {
        json!([
            {
                "res": {
                    "page_index": 0,
                    "rec_texts": ["Invoice", "Total 12.00"],
                    "rec_scores": [0.95, 0.8],
                    "rec_polys": [
                        [[0, 0], [10, 0], [10, 5], [0, 5]],
                        [[0, 6], [10, 6], [10, 11], [0, 11]]
                    ]
                }
            },
            {
                "res": {
                    "page_index": 1,
                    "rec_texts": ["Thanks"],
                    "rec_scores": [0.6],
                    "rec_polys": [[[1.5, 2.5], [3.5, 2.5], [3.5, 4.5], [1.5, 4.5]]]
                }
            }
        ])
    }

    #[test]
    fn test_detects_legacy_shape() {
        let output = EngineOutput::resolve(legacy_two_pages()).unwrap();
        assert_eq!(output.kind(), ContractKind::Legacy);
    }

    #[test]
    fn test_detects_current_shape() {
        let output = EngineOutput::resolve(current_two_pages()).unwrap();
        assert_eq!(output.kind(), ContractKind::Current);
    }

    #[test]
    fn test_equivalent_outputs_normalize_identically() {
        let legacy = EngineOutput::resolve(legacy_two_pages()).unwrap().normalize();
        let current = EngineOutput::resolve(current_two_pages()).unwrap().normalize();

        assert_eq!(legacy, current);
        assert_eq!(legacy.page_numbers, vec![1, 2]);
        assert_eq!(legacy.lines.len(), 3);
        assert_eq!(legacy.lines[2].page, 2);
        assert_eq!(legacy.lines[0].polygon[2], [10.0, 5.0]);
    }

    #[test]
    fn test_legacy_null_page_has_no_lines() {
        let value = json!([
            null,
            [[[[0, 0], [1, 0], [1, 1], [0, 1]], ["only", 0.9]]]
        ]);

        let recognition = EngineOutput::resolve(value).unwrap().normalize();

        assert_eq!(recognition.page_numbers, vec![1, 2]);
        assert_eq!(recognition.lines.len(), 1);
        assert_eq!(recognition.lines[0].page, 2);
    }

    #[test]
    fn test_current_missing_scores_and_polygons_default() {
        let value = json!([
            { "rec_texts": ["a", "b", "c"], "rec_scores": [0.7], "rec_polys": [] }
        ]);

        let recognition = EngineOutput::resolve(value).unwrap().normalize();

        assert_eq!(recognition.lines.len(), 3);
        assert_eq!(recognition.lines[0].confidence, 0.7);
        assert_eq!(recognition.lines[1].confidence, 0.0);
        assert!(recognition.lines[2].polygon.is_empty());
    }

    #[test]
    fn test_current_long_field_names() {
        let value = json!([
            {
                "recognized_texts": ["hello"],
                "confidence_scores": [0.5],
                "detected_polygons": [[[0, 0], [2, 0], [2, 2], [0, 2]]],
                "page_index": 4
            }
        ]);

        let recognition = EngineOutput::resolve(value).unwrap().normalize();

        assert_eq!(recognition.page_numbers, vec![5]);
        assert_eq!(recognition.lines[0].text, "hello");
        assert_eq!(recognition.lines[0].polygon.len(), 4);
    }

    #[test]
    fn test_current_page_index_fallback_to_position() {
        let value = json!([
            { "res": { "rec_texts": ["first"], "page_index": null } },
            { "res": { "rec_texts": ["second"], "page_index": -1 } },
            { "res": { "rec_texts": [] } }
        ]);

        let recognition = EngineOutput::resolve(value).unwrap().normalize();

        assert_eq!(recognition.page_numbers, vec![1, 2, 3]);
        assert_eq!(recognition.lines[1].page, 2);
    }

    #[test]
    fn test_empty_outputs() {
        for value in [Value::Null, json!([])] {
            let recognition = EngineOutput::resolve(value).unwrap().normalize();
            assert_eq!(recognition, Recognition::default());
        }
    }

    #[test]
    fn test_paddle3_record_with_detection_polygons() {
        let value = json!([
            {
                "res": {
                    "input_path": "/tmp/ocr_scan.pdf",
                    "page_index": 0,
                    "model_settings": { "use_textline_orientation": true },
                    "dt_polys": [
                        [[0, 0], [10, 0], [10, 5], [0, 5]],
                        [[0, 6], [10, 6], [10, 11], [0, 11]],
                        [[0, 12], [4, 12], [4, 14], [0, 14]]
                    ],
                    "text_det_params": { "thresh": 0.3, "box_thresh": 0.6 },
                    "rec_texts": ["Invoice", "Total"],
                    "rec_scores": [0.9, 0.8],
                    "rec_polys": [
                        [[0, 0], [10, 0], [10, 5], [0, 5]],
                        [[0, 6], [10, 6], [10, 11], [0, 11]]
                    ],
                    "rec_boxes": [[0, 0, 10, 5], [0, 6, 10, 11]]
                }
            }
        ]);

        let recognition = EngineOutput::resolve(value).unwrap().normalize();

        assert_eq!(recognition.page_numbers, vec![1]);
        assert_eq!(recognition.lines.len(), 2);
        assert_eq!(recognition.lines[1].text, "Total");
        assert_eq!(recognition.lines[1].confidence, 0.8);
        assert_eq!(recognition.lines[1].polygon[2], [10.0, 11.0]);
    }

    #[test]
    fn test_rejects_objects_without_texts() {
        for value in [
            json!([{ "error": "oom" }]),
            json!([{ "res": null }]),
            json!([{ "res": {} }]),
            json!([{ "res": { "rec_scores": [0.9] } }]),
        ] {
            assert!(matches!(
                EngineOutput::resolve(value),
                Err(EngineError::Output(_))
            ));
        }
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert!(matches!(
            EngineOutput::resolve(json!({"text": "x"})),
            Err(EngineError::UnrecognizedShape(_))
        ));
        assert!(matches!(
            EngineOutput::resolve(json!([[["not", "a", "line"]]])),
            Err(EngineError::Output(_))
        ));
    }
}

//! Result Aggregation
//!
//! Folds normalized lines into page summaries and the response document.

use std::collections::HashMap;

use super::types::{OcrResponse, PageSummary, Recognition};

/// Build the response document for one recognition
///
/// Pages appear in first-seen order: the engine's reported pages first,
/// then any page number that only occurs on a line. Lines sharing a page
/// number are grouped under one summary in emission order.
pub fn aggregate(recognition: Recognition, engine: &str) -> OcrResponse {
    let Recognition {
        page_numbers,
        lines,
    } = recognition;

    let mut index: HashMap<u32, usize> = HashMap::new();
    let mut groups: Vec<(u32, Vec<&str>)> = Vec::new();

    for page in page_numbers {
        index.entry(page).or_insert_with(|| {
            groups.push((page, Vec::new()));
            groups.len() - 1
        });
    }

    for line in &lines {
        let slot = *index.entry(line.page).or_insert_with(|| {
            groups.push((line.page, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(line.text.as_str());
    }

    let pages: Vec<PageSummary> = groups
        .into_iter()
        .map(|(page_number, texts)| PageSummary {
            page_number,
            text: texts.join("\n"),
            line_count: texts.len(),
        })
        .collect();

    let text = pages
        .iter()
        .map(|page| page.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    OcrResponse {
        text,
        page_count: pages.len(),
        results: lines,
        pages,
        engine: engine.to_string(),
    }
}

//! Visualization-ready views of the comparison table.
//!
//! Heatmap matrices keep every row and represent missing cells as `null`
//! when serialized, so color scales are never corrupted by a fake number.
//! Distribution vectors follow the statistics exclusion filter.

use crate::table::ComparisonTable;
use serde::Serialize;
use std::collections::BTreeSet;

/// Question-id × document matrix for one score type.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreMatrix {
    pub score_type: String,
    /// Row labels: all question ids, unaffected by exclusion.
    pub question_ids: Vec<String>,
    /// Column labels: document ids.
    pub documents: Vec<String>,
    /// `values[q][d]`; `None` serializes as `null`.
    pub values: Vec<Vec<Option<f64>>>,
}

/// Non-missing values of one score type for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreDistribution {
    pub document: String,
    pub values: Vec<f64>,
}

/// Build one heatmap matrix per score type, in score-type order.
pub fn score_matrices(table: &ComparisonTable) -> Vec<ScoreMatrix> {
    table
        .score_types
        .iter()
        .enumerate()
        .map(|(s, score_type)| {
            let values = table
                .rows
                .iter()
                .map(|row| row.cells.iter().map(|cells| cells.scores[s]).collect())
                .collect();
            ScoreMatrix {
                score_type: score_type.clone(),
                question_ids: table.rows.iter().map(|r| r.question_id.clone()).collect(),
                documents: table.documents.clone(),
                values,
            }
        })
        .collect()
}

/// Per-document distribution of one score type over non-excluded rows.
///
/// A document with zero non-missing values yields an empty series, never
/// an error.
pub fn score_distributions(
    table: &ComparisonTable,
    score_type: &str,
    excluded_question_ids: &BTreeSet<String>,
) -> Vec<ScoreDistribution> {
    let Some(s) = table.score_type_index(score_type) else {
        return Vec::new();
    };

    table
        .documents
        .iter()
        .enumerate()
        .map(|(d, document)| {
            let values = table
                .rows
                .iter()
                .filter(|row| !excluded_question_ids.contains(&row.question_id))
                .filter_map(|row| row.cells[d].scores[s])
                .collect();
            ScoreDistribution {
                document: document.clone(),
                values,
            }
        })
        .collect()
}

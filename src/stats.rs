//! Quartile summaries over the comparison table.

use crate::table::{ComparisonTable, UNKNOWN_EVALUATOR};
use serde::Serialize;
use std::collections::BTreeSet;

/// Quartile summary of one (document, score type) sample.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreStats {
    /// 25th percentile.
    pub q25: f64,
    /// 50th percentile.
    pub median: f64,
    /// 75th percentile.
    pub q75: f64,
    /// Number of non-missing values the quartiles were computed from.
    pub count: usize,
}

/// One document's summary line.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub document: String,
    pub evaluator: String,
    /// One entry per score type (table order); `None` when every value for
    /// that score type is missing ("no data", not an error).
    pub stats: Vec<Option<ScoreStats>>,
}

/// Per-(document, score type) quartile summaries.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryTable {
    /// Score types, sorted ascending (same axis as the comparison table).
    pub score_types: Vec<String>,
    /// One row per document, sorted by document id.
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Summarize the table, leaving out rows whose question id is excluded.
    ///
    /// Missing cells are excluded from the sample, never treated as zero.
    /// Excluded rows affect no statistic; they stay in the table itself.
    pub fn compute(table: &ComparisonTable, excluded_question_ids: &BTreeSet<String>) -> Self {
        let rows = table
            .documents
            .iter()
            .enumerate()
            .map(|(d, document)| {
                let evaluator = table
                    .evaluator(document)
                    .unwrap_or(UNKNOWN_EVALUATOR)
                    .to_string();

                let stats = (0..table.score_types.len())
                    .map(|s| {
                        let mut values: Vec<f64> = table
                            .rows
                            .iter()
                            .filter(|row| !excluded_question_ids.contains(&row.question_id))
                            .filter_map(|row| row.cells[d].scores[s])
                            .collect();
                        values.sort_by(|a, b| a.total_cmp(b));

                        if values.is_empty() {
                            None
                        } else {
                            Some(ScoreStats {
                                q25: quantile(&values, 0.25),
                                median: quantile(&values, 0.5),
                                q75: quantile(&values, 0.75),
                                count: values.len(),
                            })
                        }
                    })
                    .collect();

                SummaryRow {
                    document: document.clone(),
                    evaluator,
                    stats,
                }
            })
            .collect();

        SummaryTable {
            score_types: table.score_types.clone(),
            rows,
        }
    }

    /// Summary cell lookup by names.
    pub fn stats(&self, document: &str, score_type: &str) -> Option<ScoreStats> {
        let s = self.score_types.iter().position(|t| t == score_type)?;
        let row = self.rows.iter().find(|r| r.document == document)?;
        row.stats[s]
    }
}

/// Quantile of a sorted, non-empty sample, with linear interpolation
/// between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvaluationDocument;
    use crate::table::ComparisonTable;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sample_table() -> ComparisonTable {
        let mut documents = BTreeMap::new();
        documents.insert(
            "doc1".to_string(),
            EvaluationDocument::from_value(
                "doc1",
                json!({
                    "evaluation_metadata": {"evaluator": "alice"},
                    "evaluations": [
                        {"question_id": "Q1", "scores": {"correctness": 8}},
                        {"question_id": "Q2", "scores": {"correctness": 6}}
                    ]
                }),
            )
            .unwrap(),
        );
        documents.insert(
            "doc2".to_string(),
            EvaluationDocument::from_value(
                "doc2",
                json!({
                    "evaluation_metadata": {"evaluator": "bob"},
                    "evaluations": [
                        {"question_id": "Q1", "scores": {"correctness": 7, "fluency": 9}},
                        {"question_id": "Q3", "scores": {"correctness": 5}}
                    ]
                }),
            )
            .unwrap(),
        );
        let score_types = ["correctness".to_string()].into_iter().collect();
        ComparisonTable::build(&documents, &score_types)
    }

    #[test]
    fn test_median_skips_missing_cells() {
        let table = sample_table();
        let summary = SummaryTable::compute(&table, &BTreeSet::new());

        // doc1 over rows Q1, Q2, Q3: values [8, 6], Q3 missing -> excluded.
        let stats = summary.stats("doc1", "correctness").unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.median - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_exclusion_shrinks_the_sample() {
        let table = sample_table();
        let excluded: BTreeSet<String> = ["Q2".to_string()].into_iter().collect();
        let summary = SummaryTable::compute(&table, &excluded);

        let stats = summary.stats("doc1", "correctness").unwrap();
        assert_eq!(stats.count, 1);
        assert!((stats.median - 8.0).abs() < 1e-9);

        // The comparison table itself is untouched by exclusion.
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_all_missing_reports_no_data() {
        let table = sample_table();
        let excluded: BTreeSet<String> = ["Q1".to_string(), "Q3".to_string()]
            .into_iter()
            .collect();
        let summary = SummaryTable::compute(&table, &excluded);

        // doc2 only scored Q1 and Q3; with both excluded there is no sample.
        assert!(summary.stats("doc2", "correctness").is_none());
        // doc1 still has Q2.
        assert!(summary.stats("doc1", "correctness").is_some());
    }

    #[test]
    fn test_evaluator_carried_into_summary() {
        let table = sample_table();
        let summary = SummaryTable::compute(&table, &BTreeSet::new());

        assert_eq!(summary.rows[0].document, "doc1");
        assert_eq!(summary.rows[0].evaluator, "alice");
        assert_eq!(summary.rows[1].evaluator, "bob");
    }

    #[test]
    fn test_quantile_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&values, 0.25) - 1.75).abs() < 1e-9);
        assert!((quantile(&values, 0.5) - 2.5).abs() < 1e-9);
        assert!((quantile(&values, 0.75) - 3.25).abs() < 1e-9);

        let single = [6.0];
        assert!((quantile(&single, 0.25) - 6.0).abs() < 1e-9);
        assert!((quantile(&single, 0.75) - 6.0).abs() < 1e-9);
    }
}

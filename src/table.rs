//! Dense comparison table merging scores from multiple evaluation documents.

use crate::model::{EvaluationDocument, EvaluationItem};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Evaluator sentinel for documents that carry no evaluator identity.
pub const UNKNOWN_EVALUATOR: &str = "unknown";

/// One document's cells within a comparison row.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentCells {
    /// Evaluator identity (document-level, repeated on every row).
    pub evaluator: String,
    /// One entry per common score type (table order); `None` means the
    /// document has no value for that (question, score type), distinct
    /// from a legitimate score of zero.
    pub scores: Vec<Option<f64>>,
}

/// One row of the comparison table.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub question_id: String,
    /// One entry per document (table order).
    pub cells: Vec<DocumentCells>,
}

/// Question-id-keyed table merging scores from multiple documents.
///
/// Row set = sorted union of question ids across all documents. Column axes
/// = sorted document ids × sorted common score types. Building is pure:
/// identical inputs always produce identical output, including row order.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonTable {
    /// Document ids, sorted ascending.
    pub documents: Vec<String>,
    /// Common score types, sorted ascending.
    pub score_types: Vec<String>,
    /// Rows keyed by question id, sorted ascending.
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Build the table from a document set and its common score types.
    ///
    /// Within one document, the first item for a question id wins; later
    /// duplicates are silently ignored. This mirrors the upstream
    /// evaluators' behavior and is a known limitation. Items without a
    /// question id contribute no row.
    pub fn build(
        documents: &BTreeMap<String, EvaluationDocument>,
        score_types: &BTreeSet<String>,
    ) -> Self {
        let doc_ids: Vec<String> = documents.keys().cloned().collect();
        let score_types: Vec<String> = score_types.iter().cloned().collect();

        // First-match index per document, and the sorted id union.
        let mut indexes = Vec::with_capacity(doc_ids.len());
        let mut all_question_ids = BTreeSet::new();
        for doc in documents.values() {
            let mut index: HashMap<&str, &EvaluationItem> = HashMap::new();
            for item in &doc.evaluations {
                if let Some(qid) = item.question_id.as_deref() {
                    index.entry(qid).or_insert(item);
                    all_question_ids.insert(qid.to_string());
                }
            }
            indexes.push(index);
        }

        let evaluators: Vec<String> = documents
            .values()
            .map(|doc| doc.evaluator().unwrap_or(UNKNOWN_EVALUATOR).to_string())
            .collect();

        let rows = all_question_ids
            .iter()
            .map(|qid| {
                let cells = indexes
                    .iter()
                    .zip(&evaluators)
                    .map(|(index, evaluator)| {
                        let scores = match index.get(qid.as_str()) {
                            Some(item) => score_types.iter().map(|s| item.score(s)).collect(),
                            None => vec![None; score_types.len()],
                        };
                        DocumentCells {
                            evaluator: evaluator.clone(),
                            scores,
                        }
                    })
                    .collect();
                ComparisonRow {
                    question_id: qid.clone(),
                    cells,
                }
            })
            .collect();

        ComparisonTable {
            documents: doc_ids,
            score_types,
            rows,
        }
    }

    /// Number of rows (distinct question ids).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a document id in the column axis.
    pub fn document_index(&self, document: &str) -> Option<usize> {
        self.documents.iter().position(|d| d == document)
    }

    /// Position of a score type in the column axis.
    pub fn score_type_index(&self, score_type: &str) -> Option<usize> {
        self.score_types.iter().position(|s| s == score_type)
    }

    /// Cell lookup by names. `None` for unknown axes or a missing cell.
    pub fn score(&self, question_id: &str, document: &str, score_type: &str) -> Option<f64> {
        let d = self.document_index(document)?;
        let s = self.score_type_index(score_type)?;
        let row = self.rows.iter().find(|r| r.question_id == question_id)?;
        row.cells[d].scores[s]
    }

    /// Evaluator identity column for a document.
    pub fn evaluator(&self, document: &str) -> Option<&str> {
        let d = self.document_index(document)?;
        self.rows
            .first()
            .map(|row| row.cells[d].evaluator.as_str())
    }
}

//! The aggregation pipeline: load documents, infer schemas, reconcile the
//! score vocabulary, build the comparison table, derive statistics and
//! visualization matrices.
//!
//! Fetches are independent and run concurrently; everything downstream
//! waits for the entire document set, because the common score-type
//! intersection is only meaningful once every schema is known. A failure
//! local to one document is reported and that document skipped; it never
//! aborts the pass. Each pass operates on an immutable snapshot; changing
//! the selection or exclusion set means a full recompute.

use crate::error::{BotevalError, Result};
use crate::model::{AnnotationSet, EvaluationDocument, Question, Submission, parse_questions};
use crate::schema::{Schema, common_score_types, extract_schema};
use crate::stats::SummaryTable;
use crate::store::BlobStore;
use crate::table::ComparisonTable;
use crate::viz::{ScoreDistribution, ScoreMatrix, score_distributions, score_matrices};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// The document snapshot one analysis pass runs over.
#[derive(Debug, Default)]
pub struct LoadedEvaluations {
    /// Parsed documents keyed by document id (file stem).
    pub documents: BTreeMap<String, EvaluationDocument>,
    /// Inferred schema per document.
    pub schemas: BTreeMap<String, Schema>,
    /// One line per document that was skipped and why.
    pub warnings: Vec<String>,
}

/// Everything one comparison pass derives.
#[derive(Debug, Serialize)]
pub struct ComparisonReport {
    pub common_score_types: Vec<String>,
    pub table: ComparisonTable,
    pub summary: SummaryTable,
    pub matrices: Vec<ScoreMatrix>,
    /// Distribution series per score type, over non-excluded rows.
    pub distributions: BTreeMap<String, Vec<ScoreDistribution>>,
    pub warnings: Vec<String>,
}

/// Terminal states of a comparison pass. The two empty states are expected
/// conditions reported as data, not raised as errors.
#[derive(Debug)]
pub enum CompareOutcome {
    /// No documents selected; nothing to compare.
    EmptyDocumentSet,
    /// Documents loaded but their score vocabularies share nothing. Carries
    /// the per-document schemas so the caller can show what failed to
    /// intersect.
    NoCommonScoreTypes {
        schemas: BTreeMap<String, Schema>,
        warnings: Vec<String>,
    },
    Report(Box<ComparisonReport>),
}

/// Load the canonical question list.
pub async fn load_questions<S: BlobStore>(store: &S, path: &str) -> Result<Vec<Question>> {
    let bytes = store.get(path).await?;
    parse_questions(&bytes)
}

/// Document id for a blob path: file stem without directory or extension.
fn blob_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.strip_suffix(".json").unwrap_or(name)
}

/// Paths of the JSON blobs under `dir`, optionally narrowed to selected
/// document ids (file stems).
async fn select_blobs<S: BlobStore>(
    store: &S,
    dir: &str,
    selected: Option<&[String]>,
) -> Result<Vec<String>> {
    let prefix = if dir.is_empty() || dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{}/", dir)
    };

    let paths = store.list(&prefix).await?;
    Ok(paths
        .into_iter()
        .filter(|p| p.ends_with(".json"))
        .filter(|p| match selected {
            Some(ids) => ids.iter().any(|id| id == blob_stem(p)),
            None => true,
        })
        .collect())
}

/// Fetch and parse every selected evaluation document.
///
/// Blobs are fetched concurrently and the whole set awaited before any
/// parsing result is interpreted. A fetch or parse failure skips only that
/// document.
pub async fn load_evaluations<S: BlobStore>(
    store: &S,
    dir: &str,
    selected: Option<&[String]>,
) -> Result<LoadedEvaluations> {
    let paths = select_blobs(store, dir, selected).await?;
    debug!(count = paths.len(), dir, "fetching evaluation documents");

    let fetched = join_all(paths.iter().map(|path| store.get(path))).await;

    let mut loaded = LoadedEvaluations::default();
    for (path, result) in paths.iter().zip(fetched) {
        let name = blob_stem(path).to_string();
        let outcome = result.and_then(|bytes| EvaluationDocument::from_slice(&name, &bytes));
        match outcome {
            Ok(doc) => {
                loaded.schemas.insert(name.clone(), extract_schema(&doc));
                loaded.documents.insert(name, doc);
            }
            Err(e) => {
                warn!(path = %path, error = %e, "skipping evaluation document");
                loaded.warnings.push(format!("skipped {}: {}", path, e));
            }
        }
    }

    Ok(loaded)
}

/// Fetch every response submission under `dir`, skipping unreadable blobs.
pub async fn load_submissions<S: BlobStore>(store: &S, dir: &str) -> Result<Vec<Submission>> {
    load_records(store, dir, "submission").await
}

/// Fetch every annotation set under `dir`, skipping unreadable blobs.
pub async fn load_annotations<S: BlobStore>(store: &S, dir: &str) -> Result<Vec<AnnotationSet>> {
    load_records(store, dir, "annotation").await
}

async fn load_records<S, T>(store: &S, dir: &str, kind: &str) -> Result<Vec<T>>
where
    S: BlobStore,
    T: serde::de::DeserializeOwned,
{
    let paths = select_blobs(store, dir, None).await?;
    let fetched = join_all(paths.iter().map(|path| store.get(path))).await;

    let mut records = Vec::new();
    for (path, result) in paths.iter().zip(fetched) {
        let parsed = result.and_then(|bytes| {
            serde_json::from_slice::<T>(&bytes).map_err(BotevalError::from)
        });
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path, kind, error = %e, "skipping record"),
        }
    }

    Ok(records)
}

/// Run one comparison pass over a loaded snapshot.
pub fn analyze(loaded: LoadedEvaluations, excluded_question_ids: &BTreeSet<String>) -> CompareOutcome {
    let LoadedEvaluations {
        documents,
        schemas,
        warnings,
    } = loaded;

    if documents.is_empty() {
        return CompareOutcome::EmptyDocumentSet;
    }

    let score_types = match common_score_types(&schemas) {
        Ok(types) => types,
        Err(_) => return CompareOutcome::NoCommonScoreTypes { schemas, warnings },
    };

    let table = ComparisonTable::build(&documents, &score_types);
    let summary = SummaryTable::compute(&table, excluded_question_ids);
    let matrices = score_matrices(&table);
    let distributions = table
        .score_types
        .iter()
        .map(|s| {
            (
                s.clone(),
                score_distributions(&table, s, excluded_question_ids),
            )
        })
        .collect();

    CompareOutcome::Report(Box::new(ComparisonReport {
        common_score_types: score_types.into_iter().collect(),
        table,
        summary,
        matrices,
        distributions,
        warnings,
    }))
}

/// Load the selected documents and run one comparison pass.
pub async fn compare<S: BlobStore>(
    store: &S,
    dir: &str,
    selected: Option<&[String]>,
    excluded_question_ids: &BTreeSet<String>,
) -> Result<CompareOutcome> {
    let loaded = load_evaluations(store, dir, selected).await?;
    Ok(analyze(loaded, excluded_question_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(
            "compare/doc1.json",
            serde_json::to_vec(&json!({
                "evaluation_metadata": {"evaluator": "alice"},
                "evaluations": [
                    {"question_id": "Q1", "scores": {"correctness": 8}},
                    {"question_id": "Q2", "scores": {"correctness": 6}}
                ]
            }))
            .unwrap(),
        );
        store.insert(
            "compare/doc2.json",
            serde_json::to_vec(&json!({
                "evaluation_metadata": {"evaluator": "bob"},
                "evaluations": [
                    {"question_id": "Q1", "scores": {"correctness": 7, "fluency": 9}},
                    {"question_id": "Q3", "scores": {"correctness": 5}}
                ]
            }))
            .unwrap(),
        );
        store
    }

    #[tokio::test]
    async fn test_compare_end_to_end() {
        let store = seeded_store();
        let outcome = compare(&store, "compare", None, &BTreeSet::new())
            .await
            .unwrap();

        let CompareOutcome::Report(report) = outcome else {
            panic!("expected a report");
        };

        assert_eq!(report.common_score_types, vec!["correctness"]);
        assert_eq!(report.table.row_count(), 3);
        assert_eq!(report.table.score("Q2", "doc2", "correctness"), None);

        let stats = report.summary.stats("doc1", "correctness").unwrap();
        assert!((stats.median - 7.0).abs() < 1e-9);

        assert_eq!(report.matrices.len(), 1);
        assert_eq!(report.distributions["correctness"][0].values, vec![8.0, 6.0]);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_exclusion_changes_statistics_not_rows() {
        let store = seeded_store();
        let excluded: BTreeSet<String> = ["Q2".to_string()].into_iter().collect();
        let outcome = compare(&store, "compare", None, &excluded).await.unwrap();

        let CompareOutcome::Report(report) = outcome else {
            panic!("expected a report");
        };

        assert_eq!(report.table.row_count(), 3);
        let stats = report.summary.stats("doc1", "correctness").unwrap();
        assert_eq!(stats.count, 1);
        assert!((stats.median - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_malformed_document_is_skipped_with_warning() {
        let store = seeded_store();
        store.insert("compare/doc3.json", b"[1, 2, 3]".to_vec());

        let loaded = load_evaluations(&store, "compare", None).await.unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("doc3"));
    }

    #[tokio::test]
    async fn test_selection_filters_by_stem() {
        let store = seeded_store();
        let selected = vec!["doc1".to_string()];
        let loaded = load_evaluations(&store, "compare", Some(&selected))
            .await
            .unwrap();

        assert_eq!(loaded.documents.len(), 1);
        assert!(loaded.documents.contains_key("doc1"));
    }

    #[tokio::test]
    async fn test_empty_selection_short_circuits() {
        let store = MemoryStore::new();
        let outcome = compare(&store, "compare", None, &BTreeSet::new())
            .await
            .unwrap();
        assert!(matches!(outcome, CompareOutcome::EmptyDocumentSet));
    }

    #[tokio::test]
    async fn test_disjoint_vocabularies_reported_not_raised() {
        let store = MemoryStore::new();
        store.insert(
            "compare/a.json",
            serde_json::to_vec(&json!({
                "evaluations": [{"question_id": "Q1", "scores": {"correctness": 8}}]
            }))
            .unwrap(),
        );
        store.insert(
            "compare/b.json",
            serde_json::to_vec(&json!({
                "evaluations": [{"question_id": "Q1", "scores": {"helpfulness": 3}}]
            }))
            .unwrap(),
        );

        let outcome = compare(&store, "compare", None, &BTreeSet::new())
            .await
            .unwrap();
        let CompareOutcome::NoCommonScoreTypes { schemas, .. } = outcome else {
            panic!("expected the no-common-score-types state");
        };
        assert_eq!(schemas.len(), 2);
    }

    /// Store whose get fails for one path, to exercise fetch isolation.
    struct FlakyStore {
        inner: MemoryStore,
        poison: String,
    }

    impl BlobStore for FlakyStore {
        async fn get(&self, path: &str) -> crate::error::Result<Vec<u8>> {
            if path == self.poison {
                return Err(BotevalError::Http("connection reset".to_string()));
            }
            self.inner.get(path).await
        }

        async fn put(&self, path: &str, bytes: &[u8]) -> crate::error::Result<()> {
            self.inner.put(path, bytes).await
        }

        async fn list(&self, prefix: &str) -> crate::error::Result<Vec<String>> {
            self.inner.list(prefix).await
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_isolated() {
        let store = FlakyStore {
            inner: seeded_store(),
            poison: "compare/doc2.json".to_string(),
        };

        let loaded = load_evaluations(&store, "compare", None).await.unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert!(loaded.documents.contains_key("doc1"));
        assert_eq!(loaded.warnings.len(), 1);

        // The surviving document still produces a full report.
        let outcome = analyze(loaded, &BTreeSet::new());
        let CompareOutcome::Report(report) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.table.documents, vec!["doc1"]);
    }

    #[tokio::test]
    async fn test_load_questions() {
        let store = MemoryStore::new();
        store.insert(
            "questions.json",
            br#"[{"id": "Q1", "question": "What is X?"}]"#.to_vec(),
        );

        let questions = load_questions(&store, "questions.json").await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "Q1");
    }

    #[tokio::test]
    async fn test_load_submissions_skips_bad_blobs() {
        let store = MemoryStore::new();
        store.insert(
            "gather/submission-1.json",
            serde_json::to_vec(&json!({
                "timestamp": "2025-03-01T10:00:00",
                "model_name": "gpt-4o",
                "run_id": "run-1",
                "responses": {"Q1": "Because."}
            }))
            .unwrap(),
        );
        store.insert("gather/submission-2.json", b"nonsense".to_vec());

        let submissions = load_submissions(&store, "gather").await.unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].model_name, "gpt-4o");
    }
}

//! Record types stored in and loaded from the blob store.
//!
//! Submissions, annotation sets, and evaluation documents are written once
//! and treated as immutable afterwards. Evaluation documents come from
//! external evaluators with no agreed-on schema, so they are parsed
//! defensively: any field may be missing and defaults to empty.

use crate::error::{BotevalError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// One entry of the canonical question list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier.
    pub id: String,
    /// The question text.
    pub question: String,
    /// Reference answer, if one exists.
    #[serde(default)]
    pub answer: Option<String>,
    /// Topics this question belongs to (may be empty).
    #[serde(default)]
    pub topic: Vec<String>,
}

impl Question {
    /// Whether this question is tagged with the given topic.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topic.iter().any(|t| t == topic)
    }
}

/// Parse the canonical question list from JSON bytes.
pub fn parse_questions(bytes: &[u8]) -> Result<Vec<Question>> {
    let questions: Vec<Question> = serde_json::from_slice(bytes)?;
    Ok(questions)
}

/// A set of free-text model responses collected in one sitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// ISO-8601 submission time.
    pub timestamp: String,
    /// Model that produced the responses.
    pub model_name: String,
    /// Experiment/run identifier.
    pub run_id: String,
    /// Person or process that ran the collection.
    #[serde(default)]
    pub operator: String,
    /// Responses keyed by question id.
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
}

/// One annotator's judgement of a single question.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Annotation {
    /// Proposed benchmark answer (may be empty).
    #[serde(default)]
    pub benchmark: String,
    /// Question quality: -1 (bad), 0 (neutral), +1 (good).
    #[serde(default)]
    pub quality: i8,
}

/// All annotations one annotator submitted for one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSet {
    /// Annotator name.
    pub annotator: String,
    /// ISO-8601 submission time.
    #[serde(default)]
    pub timestamp: String,
    /// Topic the annotator worked through.
    #[serde(default)]
    pub topic: String,
    /// Annotations keyed by question id.
    #[serde(default)]
    pub annotations: BTreeMap<String, Annotation>,
}

/// One scored item inside an evaluation document.
///
/// Items are duck-typed: `question_id` and `scores` are the fields the
/// aggregation pipeline consumes, `fields` records the full key set of the
/// raw object for schema inference.
#[derive(Debug, Clone, Default)]
pub struct EvaluationItem {
    /// Question this item scores, when the evaluator recorded one.
    pub question_id: Option<String>,
    /// Raw score values keyed by score type. Values are kept as JSON so a
    /// non-numeric entry degrades to a missing cell instead of a parse error.
    pub scores: BTreeMap<String, Value>,
    /// Key set of the raw item object.
    pub fields: BTreeSet<String>,
}

impl EvaluationItem {
    fn from_value(value: &Value) -> Self {
        let mut item = EvaluationItem::default();

        let Some(obj) = value.as_object() else {
            return item;
        };

        item.fields = obj.keys().cloned().collect();
        item.question_id = obj
            .get("question_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(scores) = obj.get("scores").and_then(Value::as_object) {
            item.scores = scores
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }

        item
    }

    /// Numeric value of the given score type, or `None` when the score is
    /// absent or not a number. Distinct from a legitimate score of zero.
    pub fn score(&self, score_type: &str) -> Option<f64> {
        self.scores.get(score_type).and_then(Value::as_f64)
    }
}

/// One evaluation document: all scored items for a single (model, run),
/// produced by one evaluator. Read-only input to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct EvaluationDocument {
    /// Run-level metadata; expected to contain an `evaluator` identity.
    pub evaluation_metadata: Map<String, Value>,
    /// Declared score types (names and descriptions).
    pub evaluation_criteria: Map<String, Value>,
    /// Scored items in evaluator order.
    pub evaluations: Vec<EvaluationItem>,
}

impl EvaluationDocument {
    /// Parse a document from a JSON value.
    ///
    /// Fails with `MalformedDocument` only when the top-level value is not
    /// an object; every sub-field is optional and defaults to empty.
    pub fn from_value(name: &str, value: Value) -> Result<Self> {
        let Value::Object(obj) = value else {
            return Err(BotevalError::MalformedDocument {
                name: name.to_string(),
                reason: "top-level value is not a JSON object".to_string(),
            });
        };

        let mut doc = EvaluationDocument::default();

        if let Some(metadata) = obj.get("evaluation_metadata").and_then(Value::as_object) {
            doc.evaluation_metadata = metadata.clone();
        }
        if let Some(criteria) = obj.get("evaluation_criteria").and_then(Value::as_object) {
            doc.evaluation_criteria = criteria.clone();
        }
        if let Some(evaluations) = obj.get("evaluations").and_then(Value::as_array) {
            doc.evaluations = evaluations.iter().map(EvaluationItem::from_value).collect();
        }

        Ok(doc)
    }

    /// Parse a document from raw JSON bytes.
    pub fn from_slice(name: &str, bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| BotevalError::MalformedDocument {
                name: name.to_string(),
                reason: format!("invalid JSON: {}", e),
            })?;
        Self::from_value(name, value)
    }

    /// Evaluator identity from run-level metadata, when present as a string.
    pub fn evaluator(&self) -> Option<&str> {
        self.evaluation_metadata
            .get("evaluator")
            .and_then(Value::as_str)
    }
}

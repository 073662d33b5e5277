//! Schema inference over heterogeneous evaluation documents.
//!
//! Different evaluators use different score vocabularies. The extractor
//! infers one schema per document; the reconciler intersects the score
//! vocabularies so only the score types every document shares are compared.

use crate::error::{BotevalError, Result};
use crate::model::EvaluationDocument;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The inferred shape of one evaluation document. Derived, never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    /// Score type names seen in the document.
    pub score_types: BTreeSet<String>,
    /// Key set of the run-level metadata.
    pub metadata_fields: BTreeSet<String>,
    /// Key set of a scored item.
    pub evaluation_fields: BTreeSet<String>,
}

/// Infer the schema of one evaluation document.
///
/// Score types are seeded from the declared `evaluation_criteria` and
/// unioned with the score keys of the *first* item. Only the first item is
/// inspected; this is a cheap approximation, not a guarantee that later
/// items share the same keys.
pub fn extract_schema(doc: &EvaluationDocument) -> Schema {
    let mut schema = Schema::default();

    schema.metadata_fields = doc.evaluation_metadata.keys().cloned().collect();
    schema.score_types = doc.evaluation_criteria.keys().cloned().collect();

    if let Some(first) = doc.evaluations.first() {
        schema.evaluation_fields = first.fields.clone();
        schema.score_types.extend(first.scores.keys().cloned());
    }

    schema
}

/// Intersect score vocabularies across all documents.
///
/// Returns `NoCommonScoreTypes` when the intersection is empty. That is an
/// expected, recoverable condition: the caller reports it and halts only
/// the comparison step.
pub fn common_score_types(schemas: &BTreeMap<String, Schema>) -> Result<BTreeSet<String>> {
    let mut iter = schemas.values();

    let mut common = match iter.next() {
        Some(schema) => schema.score_types.clone(),
        None => return Err(BotevalError::NoCommonScoreTypes),
    };

    for schema in iter {
        common = common
            .intersection(&schema.score_types)
            .cloned()
            .collect();
        if common.is_empty() {
            break;
        }
    }

    if common.is_empty() {
        return Err(BotevalError::NoCommonScoreTypes);
    }

    Ok(common)
}

//! Question list preparation.
//!
//! Curated question sets arrive as YAML with a `qa_pairs` list; the store
//! holds them as the canonical `questions.json`.

use crate::error::{BotevalError, Result};
use crate::model::Question;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct QaFile {
    qa_pairs: Vec<QaPair>,
}

#[derive(Debug, Deserialize)]
struct QaPair {
    id: String,
    question: String,
    answer: Option<String>,
    #[serde(default)]
    topic: Vec<String>,
}

/// Convert a YAML `qa_pairs` document into the canonical question list.
pub fn questions_from_yaml(yaml: &str) -> Result<Vec<Question>> {
    let file: QaFile = serde_yaml::from_str(yaml)
        .map_err(|e| BotevalError::Serialization(format!("invalid question YAML: {}", e)))?;

    Ok(file
        .qa_pairs
        .into_iter()
        .map(|pair| Question {
            id: pair.id,
            question: pair.question,
            answer: pair.answer,
            topic: pair.topic,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_qa_pairs() {
        let yaml = r#"
qa_pairs:
  - id: Q1
    question: What is X?
    answer: X is Y
    topic: [algebra]
  - id: Q2
    question: What is Z?
"#;
        let questions = questions_from_yaml(yaml).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, "Q1");
        assert_eq!(questions[0].answer.as_deref(), Some("X is Y"));
        assert_eq!(questions[0].topic, vec!["algebra"]);
        assert!(questions[1].answer.is_none());
        assert!(questions[1].topic.is_empty());
    }

    #[test]
    fn test_missing_qa_pairs_key() {
        assert!(questions_from_yaml("questions: []").is_err());
    }
}

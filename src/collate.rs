//! Per-question collation of annotations and responses.
//!
//! Joins every annotation set and every response submission onto the
//! canonical question list, producing one record per question for review
//! and download.

use crate::model::{AnnotationSet, Question, Submission};
use serde::Serialize;

/// One annotator's judgement attached to a question.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationView {
    pub annotator: String,
    pub benchmark: String,
    pub quality: i8,
}

/// One model response attached to a question.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub model_name: String,
    pub run_id: String,
    pub response: String,
}

/// A question with everything collected for it.
#[derive(Debug, Clone, Serialize)]
pub struct CollatedQuestion {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub topic: Vec<String>,
    pub annotations: Vec<AnnotationView>,
    pub responses: Vec<ResponseView>,
}

/// Join annotations and responses onto the question list.
///
/// Question-list order is preserved. A question missing from an annotation
/// set or submission simply collects nothing from it.
pub fn collate(
    questions: &[Question],
    annotations: &[AnnotationSet],
    submissions: &[Submission],
) -> Vec<CollatedQuestion> {
    questions
        .iter()
        .map(|q| {
            let annotation_views = annotations
                .iter()
                .filter_map(|set| {
                    set.annotations.get(&q.id).map(|a| AnnotationView {
                        annotator: set.annotator.clone(),
                        benchmark: a.benchmark.clone(),
                        quality: a.quality,
                    })
                })
                .collect();

            let response_views = submissions
                .iter()
                .filter_map(|sub| {
                    sub.responses.get(&q.id).map(|r| ResponseView {
                        model_name: sub.model_name.clone(),
                        run_id: sub.run_id.clone(),
                        response: r.clone(),
                    })
                })
                .collect();

            CollatedQuestion {
                id: q.id.clone(),
                question: q.question.clone(),
                answer: q.answer.clone().unwrap_or_default(),
                topic: q.topic.clone(),
                annotations: annotation_views,
                responses: response_views,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Annotation;
    use std::collections::BTreeMap;

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            question: format!("{}?", id),
            answer: None,
            topic: vec!["general".to_string()],
        }
    }

    #[test]
    fn test_collate_joins_by_question_id() {
        let questions = vec![question("Q1"), question("Q2")];

        let mut annotations = BTreeMap::new();
        annotations.insert(
            "Q1".to_string(),
            Annotation {
                benchmark: "x = 2".to_string(),
                quality: 1,
            },
        );
        let sets = vec![AnnotationSet {
            annotator: "alice".to_string(),
            timestamp: String::new(),
            topic: "general".to_string(),
            annotations,
        }];

        let mut responses = BTreeMap::new();
        responses.insert("Q1".to_string(), "Because.".to_string());
        responses.insert("Q2".to_string(), "Therefore.".to_string());
        let submissions = vec![Submission {
            timestamp: String::new(),
            model_name: "gpt-4o".to_string(),
            run_id: "run-1".to_string(),
            operator: "carol".to_string(),
            responses,
        }];

        let collated = collate(&questions, &sets, &submissions);

        assert_eq!(collated.len(), 2);
        assert_eq!(collated[0].annotations.len(), 1);
        assert_eq!(collated[0].annotations[0].annotator, "alice");
        assert_eq!(collated[0].responses.len(), 1);

        // Q2 has a response but no annotation.
        assert!(collated[1].annotations.is_empty());
        assert_eq!(collated[1].responses[0].response, "Therefore.");
    }

    #[test]
    fn test_collate_preserves_question_order_and_defaults() {
        let questions = vec![question("Q2"), question("Q1")];
        let collated = collate(&questions, &[], &[]);

        let ids: Vec<&str> = collated.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["Q2", "Q1"]);
        assert_eq!(collated[0].answer, "");
        assert!(collated[0].annotations.is_empty());
        assert!(collated[0].responses.is_empty());
    }
}

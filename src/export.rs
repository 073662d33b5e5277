//! Flat tabular export of the comparison and summary tables.
//!
//! Column order is deterministic: sorted document ids × sorted score types,
//! matching the table axes. Missing cells serialize as empty fields so a
//! spreadsheet never confuses "absent" with zero.

use crate::stats::SummaryTable;
use crate::table::ComparisonTable;

/// Render the full comparison table as CSV.
///
/// Header: `question_id`, then per document `{doc}_evaluator` followed by
/// `{doc}_{score_type}` per score type.
pub fn table_csv(table: &ComparisonTable) -> String {
    let mut out = String::new();

    let mut header = vec!["question_id".to_string()];
    for document in &table.documents {
        header.push(format!("{}_evaluator", document));
        for score_type in &table.score_types {
            header.push(format!("{}_{}", document, score_type));
        }
    }
    push_record(&mut out, &header);

    for row in &table.rows {
        let mut record = vec![row.question_id.clone()];
        for cells in &row.cells {
            record.push(cells.evaluator.clone());
            for score in &cells.scores {
                record.push(score.map(format_score).unwrap_or_default());
            }
        }
        push_record(&mut out, &record);
    }

    out
}

/// Render the summary table as CSV, one line per document.
///
/// Quartiles are formatted as `Q25: a | Median: b | Q75: c`; a score type
/// with no data renders as `no data`.
pub fn summary_csv(summary: &SummaryTable) -> String {
    let mut out = String::new();

    let mut header = vec!["model".to_string(), "evaluator".to_string()];
    header.extend(summary.score_types.iter().cloned());
    push_record(&mut out, &header);

    for row in &summary.rows {
        let mut record = vec![row.document.clone(), row.evaluator.clone()];
        for stats in &row.stats {
            record.push(match stats {
                Some(s) => format!(
                    "Q25: {:.2} | Median: {:.2} | Q75: {:.2}",
                    s.q25, s.median, s.q75
                ),
                None => "no data".to_string(),
            });
        }
        push_record(&mut out, &record);
    }

    out
}

fn format_score(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn push_record(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

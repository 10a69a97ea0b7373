use std::collections::HashMap;

use super::views::{CompletenessGroup, CompletenessReport, IncompleteResponse};
use crate::scorecard::domain::{EvaluationType, QuestionSet, StoredResponse};

/// Complete/incomplete counts per (e-mail, category, type).
///
/// A row is complete when every question currently defined for its type has an
/// answer. Rows of a type without questions are neither.
pub fn completeness(responses: &[StoredResponse], questions: &QuestionSet) -> CompletenessReport {
    let mut report = CompletenessReport::default();
    let mut index: HashMap<(String, String, EvaluationType), usize> = HashMap::new();

    for response in responses {
        let defined = questions.for_type(response.evaluation);
        let total = defined.len();
        if total == 0 {
            continue;
        }

        let row = &response.row;
        let answered = defined
            .iter()
            .filter(|question| row.raw_score(&question.text).is_some())
            .count();

        let email = row.email.trim().to_lowercase();
        let key = (email.clone(), row.category.clone(), response.evaluation);
        let position = *index.entry(key).or_insert_with(|| {
            report.groups.push(CompletenessGroup {
                email: email.clone(),
                category: row.category.clone(),
                evaluation: response.evaluation,
                complete: 0,
                incomplete: 0,
            });
            report.groups.len() - 1
        });

        let group = &mut report.groups[position];
        if answered == total {
            group.complete += 1;
        } else {
            group.incomplete += 1;
            report.incomplete.push(IncompleteResponse {
                email,
                category: row.category.clone(),
                supplier: row.supplier.clone(),
                evaluation: response.evaluation,
                answered,
                total,
            });
        }
    }

    report
}

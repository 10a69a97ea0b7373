use super::ranking::weighted_total;
use super::views::{AdminOverview, EvaluationListing, QuestionScore, SupplierActivity, TypeCount};
use crate::scorecard::domain::{EvaluationType, QuestionSet, StoredResponse};

pub fn overview(responses: &[StoredResponse], questions: &QuestionSet) -> AdminOverview {
    let per_type = EvaluationType::ordered()
        .into_iter()
        .filter_map(|evaluation| {
            let count = responses
                .iter()
                .filter(|response| response.evaluation == evaluation)
                .count();
            (count > 0).then_some(TypeCount { evaluation, count })
        })
        .collect();

    let mut per_supplier: Vec<(String, usize, f64)> = Vec::new();
    for response in responses {
        let total = weighted_total(&response.row, questions.for_type(response.evaluation));
        match per_supplier
            .iter_mut()
            .find(|(supplier, _, _)| *supplier == response.row.supplier)
        {
            Some((_, count, sum)) => {
                *count += 1;
                *sum += total;
            }
            None => per_supplier.push((response.row.supplier.clone(), 1, total)),
        }
    }
    let mut per_supplier: Vec<SupplierActivity> = per_supplier
        .into_iter()
        .map(|(supplier, evaluations, sum)| SupplierActivity {
            supplier,
            evaluations,
            mean_weighted_total: sum / evaluations as f64,
        })
        .collect();
    per_supplier.sort_by(|a, b| b.evaluations.cmp(&a.evaluations));

    let evaluations = responses
        .iter()
        .map(|response| listing(response, questions))
        .collect();

    AdminOverview {
        total_evaluations: responses.len(),
        per_type,
        per_supplier,
        evaluations,
    }
}

fn listing(response: &StoredResponse, questions: &QuestionSet) -> EvaluationListing {
    let row = &response.row;
    let defined = questions.for_type(response.evaluation);

    let mut scores: Vec<QuestionScore> = defined
        .iter()
        .map(|question| QuestionScore {
            question: question.text.clone(),
            raw: row.raw_score(&question.text),
            weighted: row.weighted.get(&question.text).copied().flatten(),
        })
        .collect();
    // Columns for questions that were removed since the row was written.
    for (question, raw) in &row.scores {
        if defined.iter().all(|known| &known.text != question) {
            scores.push(QuestionScore {
                question: question.clone(),
                raw: *raw,
                weighted: row.weighted.get(question).copied().flatten(),
            });
        }
    }

    EvaluationListing {
        evaluation: response.evaluation,
        date: row.date.clone(),
        time: row.time.clone(),
        email: row.email.clone(),
        category: row.category.clone(),
        supplier: row.supplier.clone(),
        scores,
        weighted_total: weighted_total(row, defined),
    }
}

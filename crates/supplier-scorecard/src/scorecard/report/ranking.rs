use std::collections::HashMap;

use super::views::{CategoryRanking, SupplierScore};
use crate::scorecard::domain::{EvaluationType, Question, QuestionSet, ResponseRow, StoredResponse};

/// Σ raw × weight over the questions currently defined for the row's type.
///
/// Stored weighted columns are ignored so that weight changes apply to old rows.
pub fn weighted_total(row: &ResponseRow, questions: &[Question]) -> f64 {
    questions
        .iter()
        .filter_map(|question| {
            row.raw_score(&question.text)
                .map(|raw| raw * question.weight)
        })
        .sum()
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

/// Averages per (category, supplier, type), pivoted in first-seen order.
pub fn supplier_scores(responses: &[StoredResponse], questions: &QuestionSet) -> Vec<SupplierScore> {
    let mut group_order: Vec<(String, String, EvaluationType)> = Vec::new();
    let mut groups: HashMap<(String, String, EvaluationType), Accumulator> = HashMap::new();

    for response in responses {
        let key = (
            response.row.category.clone(),
            response.row.supplier.clone(),
            response.evaluation,
        );
        let total = weighted_total(&response.row, questions.for_type(response.evaluation));
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            group_order.push(key);
            Accumulator::default()
        });
        entry.sum += total;
        entry.count += 1;
    }

    let mut scores: Vec<SupplierScore> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    for key in group_order {
        let Some(accumulator) = groups.get(&key) else {
            continue;
        };
        let (category, supplier, evaluation) = key;
        let position = *index
            .entry((category.clone(), supplier.clone()))
            .or_insert_with(|| {
                scores.push(SupplierScore::new(&category, &supplier));
                scores.len() - 1
            });
        scores[position].set_average(evaluation, accumulator.sum / accumulator.count as f64);
    }

    for score in &mut scores {
        score.final_score = (score.commercial + score.technical + score.esg) / 3.0;
    }
    scores
}

/// Best `limit` suppliers per category by blended score; ties keep first-seen order.
pub fn top_suppliers(
    responses: &[StoredResponse],
    questions: &QuestionSet,
    limit: usize,
) -> Vec<CategoryRanking> {
    let mut rankings: Vec<CategoryRanking> = Vec::new();
    for score in supplier_scores(responses, questions) {
        match rankings
            .iter_mut()
            .find(|ranking| ranking.category == score.category)
        {
            Some(ranking) => ranking.suppliers.push(score),
            None => rankings.push(CategoryRanking {
                category: score.category.clone(),
                suppliers: vec![score],
            }),
        }
    }

    for ranking in &mut rankings {
        ranking
            .suppliers
            .sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        ranking.suppliers.truncate(limit);
    }
    rankings
}

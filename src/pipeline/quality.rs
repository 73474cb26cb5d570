use crate::models::{DecisionFlags, GameRecord, QualityAssessment, SearchQuality};

/// Upper bound on refinement passes per run
pub const MAX_REFINEMENT_PASSES: u32 = 2;

/// Completeness below this triggers refinement in the fallback assessment
const COMPLETENESS_THRESHOLD: f64 = 0.7;

/// Games needed before the fallback assessment stops asking for more
const TARGET_GAME_COUNT: usize = 5;

/// Counts of records carrying a description and a current price
pub fn data_counts(games: &[GameRecord]) -> (usize, usize) {
    let descriptions = games.iter().filter(|g| !g.description.is_empty()).count();
    let prices = games.iter().filter(|g| g.current_price.is_some()).count();
    (descriptions, prices)
}

/// Heuristic assessment used when the model verdict is unavailable
pub fn fallback_assessment(games: &[GameRecord]) -> QualityAssessment {
    let count = games.len();
    let (descriptions, prices) = data_counts(games);

    let quality = match count {
        n if n >= 8 => SearchQuality::Excellent,
        n if n >= 5 => SearchQuality::Good,
        n if n >= 2 => SearchQuality::Poor,
        _ => SearchQuality::Insufficient,
    };

    let completeness = if count > 0 {
        ((descriptions + prices) as f64 / (2 * count) as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let confidence = match count {
        n if n >= 5 => 0.8,
        n if n >= 2 => 0.6,
        _ => 0.3,
    };

    let issues = if count < TARGET_GAME_COUNT {
        vec!["Insufficient games found".to_string()]
    } else {
        Vec::new()
    };

    QualityAssessment {
        search_results_quality: quality,
        game_data_completeness: completeness,
        recommendation_confidence: confidence,
        needs_refinement: count < TARGET_GAME_COUNT || completeness < COMPLETENESS_THRESHOLD,
        issues,
    }
}

/// Recomputes the routing flags from an assessment, keeping the complexity flags as they were
pub fn derive_flags(
    assessment: &QualityAssessment,
    previous: DecisionFlags,
    retry_count: u32,
) -> DecisionFlags {
    DecisionFlags {
        should_retry_search: assessment.needs_refinement && retry_count < MAX_REFINEMENT_PASSES,
        should_expand_search: assessment.search_results_quality == SearchQuality::Insufficient
            && retry_count < 1,
        should_use_alternative_strategy: assessment.search_results_quality == SearchQuality::Poor
            && retry_count >= 1,
        ..previous
    }
}

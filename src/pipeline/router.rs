//! Decision router
//!
//! Pure functions from the current state to the next step. Routers never mutate state.
use crate::pipeline::{
    quality::MAX_REFINEMENT_PASSES,
    stages::StageName,
    state::PipelineState,
    PipelineMode,
};

/// What the orchestrator does after a stage completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Goto(StageName),
    /// Run the branches concurrently against the same state, then continue at the join stage
    Fork {
        branches: Vec<StageName>,
        join: StageName,
    },
    End,
}

/// First stage of a run
pub fn entry(mode: PipelineMode) -> StageName {
    match mode {
        PipelineMode::Agentic => StageName::AssessComplexity,
        PipelineMode::Minimal => StageName::AnalyzeQuery,
    }
}

pub fn after_search(_state: &PipelineState) -> StageName {
    StageName::ExtractGames
}

pub fn after_combine(mode: PipelineMode) -> StageName {
    match mode {
        PipelineMode::Agentic => StageName::AssessQuality,
        PipelineMode::Minimal => StageName::Recommend,
    }
}

/// Refines while any flag asks for it and the pass ceiling has not been reached
pub fn after_quality_assessment(state: &PipelineState) -> StageName {
    if state.decision_flags.wants_refinement() && state.retry_count < MAX_REFINEMENT_PASSES {
        StageName::RefineSearch
    } else {
        StageName::Recommend
    }
}

/// Transition table for both pipeline variants
pub fn next(mode: PipelineMode, completed: StageName, state: &PipelineState) -> Transition {
    match completed {
        StageName::AssessComplexity => Transition::Goto(StageName::AnalyzeQuery),
        StageName::AnalyzeQuery => Transition::Goto(StageName::Search),
        StageName::Search => Transition::Goto(after_search(state)),
        StageName::ExtractGames => Transition::Fork {
            branches: vec![StageName::DescribeGames, StageName::FetchPrices],
            join: StageName::Combine,
        },
        StageName::DescribeGames | StageName::FetchPrices => Transition::Goto(StageName::Combine),
        StageName::Combine => Transition::Goto(after_combine(mode)),
        StageName::AssessQuality => Transition::Goto(after_quality_assessment(state)),
        StageName::RefineSearch => Transition::Goto(StageName::Search),
        StageName::Recommend => Transition::End,
    }
}

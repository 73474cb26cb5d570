mod assessment;
mod game;

pub use assessment::{DecisionFlags, QualityAssessment, SearchQuality, SearchStrategy};
pub use game::{
    discount_percent, GameDescription, GameRecommendation, GameRecord, PriceRecord,
    PriceSnapshot, SearchHit,
};

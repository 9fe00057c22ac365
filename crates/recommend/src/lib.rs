pub mod allocation;
pub mod engine;
pub mod features;
pub mod generation_lock;
pub mod quantity;
pub mod storage;
pub mod tiering;
pub mod types;

pub use engine::RecommendationEngine;
pub use generation_lock::GenerationLock;
pub use storage::{FilterOptions, PostgresRecommendationStorage, RecommendationStorage};
pub use types::{RecommendationRow, Tier};

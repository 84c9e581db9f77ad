mod models;

pub use models::{
    HuggingFaceStats, ModelFilter, ModelService, ModelStats, ModelStatus, ModelsView,
    OpenRouterStats,
};

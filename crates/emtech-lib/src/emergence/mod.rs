//! Emergence classification of term series

mod classifier;

pub use classifier::{
    rank_terms, Classification, EmergenceClassifier, DECLINING_SHIFT, EMERGENT_SHIFT,
    RECENT_WINDOW,
};

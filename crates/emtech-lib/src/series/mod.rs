//! Term-count matrices and per-term time series

mod extractor;
mod matrix;
mod quarter;

pub use extractor::{SeriesExtractor, DEFAULT_MIN_PER_BUCKET};
pub use matrix::{DatedCount, TermCountMatrix, TermCounts};
pub use quarter::Quarter;

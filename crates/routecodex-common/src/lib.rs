//! Shared scalar types, parsing helpers, and environment-resolved limits
//! used across the routecodex workspace. Kept free of async runtimes and
//! HTTP types so every other crate can depend on it without pulling in
//! tokio or axum transitively.

pub mod duration;
pub mod limits;
pub mod series;

pub use duration::parse_duration_hint;
pub use limits::LimitsConfig;
pub use series::{classify_series, ModelSeries};

//! Axum extractors for shop-dashboard

mod validated;

pub use validated::{format_validation_errors, validation_errors_json, ValidatedJson};

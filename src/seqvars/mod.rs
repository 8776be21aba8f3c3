//! Sequence variant processing for clonal hematopoiesis calling.

pub mod aggregate;
pub mod canonical;
pub mod extract;
pub mod prefilter;
pub mod schema;

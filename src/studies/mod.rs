pub mod coordinate;
pub mod data;
pub mod plan;
pub mod term;

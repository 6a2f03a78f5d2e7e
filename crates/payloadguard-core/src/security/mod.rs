//! Resource accounting for inspections.

pub mod budget;

pub use budget::ByteBudget;

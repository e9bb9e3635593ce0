// Domain model and core algorithms: scanning, sorting, aggregation, validation.

pub mod document;
pub mod error;
pub mod extract;
pub mod integrity;
pub mod outcome;
pub mod store;
pub mod taxonomy;
pub mod usage;
pub mod variable;
pub mod walker;

// Main library entry point for tokenscope.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

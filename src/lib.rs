pub mod analysis;
pub mod api;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod error;
pub mod feedback;
pub mod rules;
pub mod sink;

pub mod cache;
pub mod classifier;
pub mod rules;
pub mod services;

// Core crosspost module - normalization, similarity scoring and the
// detection/escalation pipeline.

pub mod crosspost_models;
pub mod crosspost_service;
pub mod normalizer;
pub mod similarity;

pub use crosspost_models::*;
pub use crosspost_service::*;

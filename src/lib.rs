//! Scam message predictor
//!
//! Fetches pretrained model artifacts, serves a browser form that asks a
//! generative model whether a message is fraudulent, and classifies text
//! directly with a sequence-classification model.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod views;

pub use config::AppConfig;
pub use error::AppError;
pub use models::verdict_types::{Classification, ModelVerdict};
pub use services::verdict::{extract_verdict, VerdictExtractor};

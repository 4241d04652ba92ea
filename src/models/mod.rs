pub mod classify_types;
pub mod download_types;
pub mod verdict_types;

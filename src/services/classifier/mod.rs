pub mod generator;
pub mod inference;
pub mod model_manager;
pub mod sequence;

pub mod classifier;
pub mod fetcher;
pub mod progress;
pub mod prompt;
pub mod verdict;

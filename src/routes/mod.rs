pub mod catalog;
pub mod health;
pub mod matching;
pub mod metrics;

pub mod candidate_store;
pub mod extractor;
pub mod normalizer;
pub mod resolver;
pub mod search;
pub mod similarity;

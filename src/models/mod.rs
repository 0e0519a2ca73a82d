pub mod api;
pub mod matching;
pub mod search;
pub mod wine;

//! Wine list matching
//!
//! Matches noisy OCR lines from photographed restaurant wine lists against a
//! catalog of reviewed wines: text normalization and field extraction, a
//! local candidate cache with a fuzzy term index, and a remote catalog search
//! fallback.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

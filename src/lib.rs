//! Onco Triage - priority scoring and critical-symptom alerting for oncology patients
//!
//! This library provides the scoring engine (rule fallback and trained ensemble),
//! the keyword symptom detector, and the resilient alert dispatcher used by the
//! triage service.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{detect_critical_symptoms, extract_structured_data, rule_based_score, FeatureEncoder, PriorityModel, PriorityScorer};
pub use models::{AlertRequest, ClinicalSnapshot, PriorityCategory, PriorityScore, SymptomDetection, SymptomTag};
pub use services::{AlertDispatcher, RetryPolicy};

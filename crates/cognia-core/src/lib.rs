//! Cognia core - shared domain types for the cognitive risk pipeline
//!
//! This crate holds everything the runtime pipeline and its callers agree on:
//!
//! 1. **Domain model**: assessments, speech samples, and the subject's health
//!    profile, as read-only inputs created by the persistence layer.
//!
//! 2. **Feature schema**: the frozen tabular feature record the persisted
//!    model artifacts were trained against. Field order here is the single
//!    source of truth for artifact compatibility.
//!
//! 3. **Configuration**: the YAML-backed settings surface (model storage,
//!    ASR options, feature flags).

pub mod config;
pub mod domain;
pub mod schema;

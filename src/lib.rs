//! Billscope estimates how a higher-education bill would land on a roster
//! of colleges.
//!
//! The crate is split into two pipelines. Extraction turns a bill document
//! into structured [`models::BillParameters`] using regex rules first and a
//! generative fallback when rule confidence is low. Prediction applies
//! pre-trained models to a college roster, derives affordability metrics,
//! and rolls everything up into an [`models::ImpactSummary`].

pub mod app;
pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;

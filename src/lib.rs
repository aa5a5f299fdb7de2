//! inquiry-triage - Automated triage of rental-inquiry emails
//!
//! This crate provides the core of the inquiry triage add-in: the metadata
//! gateway, mailbox folder resolution, reply drafting and filing, rating-based
//! partitioning, the live profile sync loop and the orchestration tying them
//! together.

pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;

pub use app::App;

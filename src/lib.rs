//! lingo-cache - UI translation caching layer
//!
//! Translates short UI strings through a local Lingo.dev bridge process
//! without ever blocking the UI for longer than a bounded wait. Results are
//! cached per (locale, text); requests that outlive the wait keep running
//! and heal the cache for the next render.

pub mod bridge;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod locale;
pub mod orchestrator;
pub mod prewarm;
pub mod retry;
pub mod service;

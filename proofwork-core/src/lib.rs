//! Proofwork Core
//!
//! Core types and pure rules for the Proofwork field client.
//!
//! This crate contains:
//! - Domain types: jobs, check events, photos, checklist items, outbox entries
//! - Rules: checklist predicates, progress projection, timeline, action gates
//! - DTOs: request bodies exchanged with the backend API

pub mod domain;
pub mod dto;
pub mod rules;

//! Core domain types
//!
//! This module contains the domain structures shared between the HTTP client
//! (which exchanges them with the backend) and the field engine (which keeps
//! the optimistic local copy and the outbox).

pub mod check_event;
pub mod checklist;
pub mod connectivity;
pub mod geo;
pub mod job;
pub mod outbox;
pub mod photo;

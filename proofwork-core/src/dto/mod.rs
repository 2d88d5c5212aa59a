//! Data Transfer Objects for the backend API
//!
//! Request bodies sent by the field client. Responses are the domain types
//! themselves (`Job`, `Photo`).

pub mod checklist;
pub mod job;

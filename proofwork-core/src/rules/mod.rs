//! Pure derivation rules
//!
//! Everything in here is a side-effect free function of domain values:
//! checklist predicates, the progress projection, the normalized timeline and
//! the action gates. The field engine recomputes them from its current job
//! snapshot whenever the UI asks for a view.

pub mod checklist;
pub mod gates;
pub mod progress;
pub mod timeline;

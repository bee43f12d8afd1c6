//! # Engine Module
//!
//! Per-molecule machinery that turns a typed bonded graph into the nonbonded pair table,
//! together with the configuration, progress and error types shared by the workflows.
//!
//! ## Architecture
//!
//! - **Bonded Pairs** ([`pairs`]) - Shortest-path classification of real-atom pairs into
//!   the 1-2, 1-3 and 1-4 classes
//! - **Exclusion Closure** ([`closure`]) - Extension of those classes to satellites and
//!   virtual sites, producing one rule per unordered particle pair
//! - **Configuration** ([`config`]) - Workflow options and 1-4 scale factors
//! - **Progress Monitoring** ([`progress`]) - Optional callback for workflow events
//! - **Error Handling** ([`error`]) - The top-level error and per-molecule problem list
//!
//! Nothing here holds state between molecules; every molecule can be processed on its own
//! thread against the same shared force field.

pub mod closure;
pub mod config;
pub mod error;
pub mod pairs;
pub mod progress;

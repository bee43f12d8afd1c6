//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::core`] building blocks and the
//! [`crate::engine`] together.
//!
//! - **Preparation Workflow** ([`prepare`]) - Loads a force field and a type-definition
//!   file, then types each molecule, assigns charges and canonical terms to every structural
//!   element, and computes the nonbonded pair table. Problems are collected per molecule and
//!   reported together.

pub mod prepare;

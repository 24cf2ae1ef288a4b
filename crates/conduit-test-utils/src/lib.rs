//! Shared test utilities for the conduit workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not each
//! reinvent temp directories and sample data. It is a dev-dependency only and
//! never published. It deliberately speaks plain JSON rather than depending
//! on `conduit-core`, so any crate can use it.
//!
//! # Modules
//!
//! - [`fixtures`]: sample source records, mappings and definition bodies
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace), a temp data
//!   directory with source files and target directories

pub mod fixtures;
pub mod workspace;

pub use workspace::TestWorkspace;

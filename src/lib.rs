//! Deterministic radial layout for collaborative mindmaps.
//!
//! Node mutations and explicit recomputes load a mindmap's complete node set,
//! compute a position for every node and write all positions back in the same
//! store transaction as the change that triggered them.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

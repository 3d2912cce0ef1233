//! CLI command implementations.

pub mod compare;
pub mod get;
pub mod keygen;
pub mod list;
pub mod prune;
pub mod put;
pub mod revert;
pub mod sweep;

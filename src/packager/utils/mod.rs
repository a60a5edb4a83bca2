//! Filesystem helpers shared by the staging stages.

pub mod clone;
pub mod fs;

//! Property-based tests for region save/restore, hook resolution, and
//! buffer descriptors.

mod hooks;
mod regions;

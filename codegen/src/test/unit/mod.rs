//! Unit tests for regions, hooks, and the template kernel context.

mod hooks;
mod region;

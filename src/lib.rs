//! Workspace-level tooling package.
//!
//! Carries the `rusty-hook` pre-commit configuration; the code lives under `crates/`.

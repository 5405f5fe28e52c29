//! Shared primitives for the hermit_guard workspace.

pub mod state_machine;

//! Domain services layered over the storage interfaces.

pub mod replay_lifecycle;
pub mod variables;

pub use replay_lifecycle::ReplayLifecycle;
pub use variables::VariableRegistry;

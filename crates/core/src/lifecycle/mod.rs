pub mod engine;
pub mod states;

pub use engine::{LifecycleDefinition, LifecycleEngine, LifecycleError, StandardLifecycle};
pub use states::{LifecycleAction, LifecycleContext, LifecycleEvent, TransitionOutcome};

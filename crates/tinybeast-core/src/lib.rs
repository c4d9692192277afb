pub mod debounce;
pub mod dictionary;
pub mod error;
pub mod language;
pub mod lifecycle;
pub mod orchestrator;
pub mod preprocess;
pub mod registry;
pub mod speaker;
pub mod triggers;

#[cfg(test)]
mod tests;

pub use error::{CoreError, LifecycleError};
pub use lifecycle::{DictionaryLifecycleManager, LifecycleEvent};
pub use orchestrator::{Backends, OrchestratorHandle, RequestOrchestrator};
pub use registry::{DictStatus, DictionaryEntry, DictionaryRegistry, SharedRegistry};

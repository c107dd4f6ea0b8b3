pub mod audio;
pub mod engine;
pub mod media;
pub mod script;
pub mod services;
pub mod similarity;

// Re-export the surface the host UI touches.
pub use engine::{EngineConfig, EngineObserver, Phase, TurnEngine};
pub use script::parser::parse_script;

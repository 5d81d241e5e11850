pub mod action;
pub mod driver;
pub mod gemini;
mod gemini_types;
pub mod policy;
pub mod prompt;

pub use action::{Action, ToolCallRequest};
pub use driver::{AgentLoop, LoopOutcome};
pub use gemini::GeminiPolicy;
pub use policy::{DecisionPolicy, PolicyFuture};

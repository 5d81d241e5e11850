pub mod dispatch;
pub mod runtime;

pub use dispatch::dispatch;
pub use runtime::Runtime;

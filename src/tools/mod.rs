pub mod host;
pub mod registry;
pub mod schema;
pub mod traits;
pub mod types;

pub use host::{HostContext, host_tools};
pub use registry::{DEFAULT_CALL_TIMEOUT, ToolRegistry};
pub use schema::{FieldKind, FieldSpec, InputSchema};
pub use traits::{Tool, ToolFuture, ToolInvoker};
pub use types::{ToolArguments, ToolDescriptor, ToolError, ToolErrorKind, ToolOutput};

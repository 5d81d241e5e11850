pub mod decision;
pub mod gate;

pub use decision::{ApprovalDecision, DecisionOutcome, summarize_args};
pub use gate::{ApprovalGate, GateState, PendingApproval, Transition};

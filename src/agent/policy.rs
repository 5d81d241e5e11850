use super::action::Action;
use crate::error::LlmError;
use crate::transcript::Turn;
use std::future::Future;
use std::pin::Pin;

pub type PolicyFuture<'a> = Pin<Box<dyn Future<Output = Result<Action, LlmError>> + Send + 'a>>;

/// Decides the next action from the conversation so far.
///
/// One call yields exactly one [`Action`]; the caller appends its effect to
/// the transcript and calls again.
pub trait DecisionPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn step<'a>(&'a self, transcript: &'a [Turn]) -> PolicyFuture<'a>;
}

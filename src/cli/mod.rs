pub mod chat;
pub mod commands;

pub use commands::{Cli, Commands};

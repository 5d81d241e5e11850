use console::style;
use std::fmt::Display;

/// Green bold: approvals, successful results
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// White bold: section headers, agent label
pub fn header<D: Display>(text: D) -> String {
    style(text).white().bold().to_string()
}

/// Dim: tool output, timestamps, secondary text
pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Yellow: pending approvals, warnings
pub fn warn<D: Display>(text: D) -> String {
    style(text).yellow().bold().to_string()
}

/// Red: denials, failures
pub fn failure<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// Cyan: tool names
pub fn accent<D: Display>(text: D) -> String {
    style(text).cyan().to_string()
}

//! Output formatting for CLI.

mod json;
mod text;

pub use json::{ClonesOutput, JsonFormatter, SystemOutput};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;

pub mod ast;
pub mod error;
pub mod matcher;
pub mod parser;

pub use ast::{NodeKind, Pattern, PatternNode, Repetition};
pub use error::CompileError;
pub use matcher::CaptureTable;
pub use parser::compile;

/// Compiles `pattern` and matches it against `input` in one call.
pub fn is_match(input: &str, pattern: &str) -> Result<bool, CompileError> {
    Ok(compile(pattern)?.is_match(input))
}

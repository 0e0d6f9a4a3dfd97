/// Reasons a pattern text fails to compile. Positions are character offsets
/// into the pattern text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A `(` without its closing `)`.
    #[error("unterminated group opened at {pos}")]
    UnterminatedGroup { pos: usize },

    /// A `[` without its closing `]`.
    #[error("unterminated character class opened at {pos}")]
    UnterminatedClass { pos: usize },

    #[error("invalid range '{start}-{end}' in character class at {pos}")]
    DescendingRange { pos: usize, start: char, end: char },

    /// A backreference to a group the pattern never opens.
    #[error("backreference \\{index} at {pos} refers to a nonexistent group")]
    UnknownGroup { pos: usize, index: usize },
}

pub type Result<T> = std::result::Result<T, CompileError>;

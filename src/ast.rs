use std::collections::BTreeSet;

use crate::matcher::{self, CaptureTable};

/// Expanded member set of a bracket expression. Ranges are stored as
/// their individual characters.
pub type CharSet = BTreeSet<char>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Literal(char),
    Digit,
    WordChar,
    Wildcard,
    CharClassPositive(CharSet),
    CharClassNegative(CharSet),
    Group {
        capture_index: usize,
        branches: Vec<Vec<PatternNode>>,
    },
    Backreference(usize),
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repetition {
    #[default]
    None,
    ZeroOrMore,
    OneOrMore,
    Optional,
}

impl Repetition {
    /// Whether zero occurrences satisfy the atom.
    pub fn allows_zero(self) -> bool {
        matches!(self, Repetition::ZeroOrMore | Repetition::Optional)
    }

    /// Whether the atom may be applied more than once.
    pub fn repeats(self) -> bool {
        matches!(self, Repetition::ZeroOrMore | Repetition::OneOrMore)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternNode {
    pub kind: NodeKind,
    pub repetition: Repetition,
    /// Set on the last node of every branch of a group except the final one.
    pub alternation_marker: bool,
    /// Raw pattern character following this atom, used by greedy quantifiers
    /// to stop before a character the next atom wants.
    pub next_literal_hint: Option<char>,
}

impl PatternNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            repetition: Repetition::None,
            alternation_marker: false,
            next_literal_hint: None,
        }
    }

    /// Tests a single input character against this node's predicate.
    ///
    /// Only single-character kinds have a predicate; groups, backreferences
    /// and the end anchor never accept a lone character.
    pub fn accepts(&self, c: char) -> bool {
        match &self.kind {
            NodeKind::Literal(l) => *l == c,
            NodeKind::Digit => c.is_ascii_digit(),
            NodeKind::WordChar => c.is_ascii_alphanumeric() || c == '_',
            NodeKind::Wildcard => true,
            NodeKind::CharClassPositive(set) => set.contains(&c),
            NodeKind::CharClassNegative(set) => !set.contains(&c),
            NodeKind::Group { .. } | NodeKind::Backreference(_) | NodeKind::EndOfInput => false,
        }
    }

    pub fn is_single_char(&self) -> bool {
        !matches!(
            self.kind,
            NodeKind::Group { .. } | NodeKind::Backreference(_) | NodeKind::EndOfInput
        )
    }
}

/// A compiled pattern: the top-level node sequence plus what the matcher
/// needs to know about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub(crate) nodes: Vec<PatternNode>,
    pub(crate) capture_count: usize,
    pub(crate) anchored_start: bool,
}

impl Pattern {
    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    /// Number of capturing groups, which is also the highest capture index.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// Whether the pattern text began with `^`.
    pub fn is_anchored_start(&self) -> bool {
        self.anchored_start
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.captures(input).is_some()
    }

    /// Runs the matcher over `input` and returns what each group captured,
    /// or `None` when the line does not match.
    pub fn captures(&self, input: &str) -> Option<CaptureTable> {
        let chars: Vec<char> = input.chars().collect();
        let mut captures = CaptureTable::new(self.capture_count);
        matcher::match_nodes(&chars, &self.nodes, self.anchored_start, &mut captures).then_some(captures)
    }
}

use std::mem;

use log::debug;

use crate::ast::{CharSet, NodeKind, Pattern, PatternNode, Repetition};
use crate::error::{CompileError, Result};

/// Compiles `pattern` into its node sequence.
///
/// Example:
/// - Pattern: `^a(b|c)+$` → anchored, [Literal('a'), Group(1)+, EndOfInput]
pub fn compile(pattern: &str) -> Result<Pattern> {
    Parser::new(pattern).parse()
}

/// Single left-to-right scanner over the pattern text.
///
/// The `Parser` struct holds the pattern characters and the current position.
/// It also hands out capture indices for groups, scoped to this one pattern.
pub struct Parser {
    chars: Vec<char>,
    pos: usize,
    next_group_id: usize,
    /// Every backreference seen, as (position, index), checked once the
    /// final group count is known.
    backrefs: Vec<(usize, usize)>,
}

impl Parser {
    /// Create a new parser for the given pattern.
    pub fn new(pattern: &str) -> Self {
        Self {
            chars: pattern.chars().collect(),
            pos: 0,
            next_group_id: 1,
            backrefs: Vec::new(),
        }
    }

    /// Allocate a new group ID for capturing groups.
    fn alloc_group_id(&mut self) -> usize {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    /// Peek at the next character in the pattern without advancing.
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Advance the parser by one character and return it.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    /// Expect a specific character and advance if it matches.
    fn expect(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Entry point for parsing a pattern, consuming the parser.
    ///
    /// A leading `^` is stripped and recorded as the anchored-at-start flag
    /// rather than becoming a node.
    pub fn parse(mut self) -> Result<Pattern> {
        let anchored_start = self.expect('^');
        let mut nodes = Vec::new();
        while self.peek().is_some() {
            nodes.push(self.parse_repeat(0)?);
        }

        let capture_count = self.next_group_id - 1;
        if let Some(&(pos, index)) = self.backrefs.iter().find(|(_, index)| *index > capture_count) {
            return Err(CompileError::UnknownGroup { pos, index });
        }

        debug!(
            "compiled {} top-level nodes, {} groups, anchored: {}",
            nodes.len(),
            capture_count,
            anchored_start
        );
        Ok(Pattern {
            nodes,
            capture_count,
            anchored_start,
        })
    }

    /// Parse an atom and the repetition operator (`?`, `+`, `*`) after it.
    ///
    /// Example:
    /// - Pattern: `a?` → Literal('a') with Optional
    /// - Pattern: `b+` → Literal('b') with OneOrMore
    /// - Pattern: `c`  → Literal('c') with None
    fn parse_repeat(&mut self, depth: usize) -> Result<PatternNode> {
        let mut node = PatternNode::new(self.parse_atom(depth)?);
        node.repetition = match self.peek() {
            Some('+') => Repetition::OneOrMore,
            Some('*') => Repetition::ZeroOrMore,
            Some('?') => Repetition::Optional,
            _ => Repetition::None,
        };
        if node.repetition != Repetition::None {
            self.advance();
        }
        node.next_literal_hint = self.lookahead_hint();
        Ok(node)
    }

    /// The next raw character after the current atom, looking through the
    /// `)` of any groups the atom closes.
    fn lookahead_hint(&self) -> Option<char> {
        self.chars[self.pos..].iter().copied().find(|&c| c != ')')
    }

    /// Parse a single atom: group, char class, escape, wildcard, anchor or literal.
    ///
    /// Examples:
    /// - Pattern: `(abc)` → Group { capture_index, branches: [[a, b, c]] }
    /// - Pattern: `[abc]` → CharClassPositive({a, b, c})
    /// - Pattern: `\d`   → Digit
    /// - Pattern: `\w`   → WordChar
    /// - Pattern: `\1`   → Backreference(1)
    /// - Pattern: `.`    → Wildcard
    /// - Pattern: `$`    → EndOfInput, when it ends the pattern
    /// - Pattern: `a`    → Literal('a')
    fn parse_atom(&mut self, depth: usize) -> Result<NodeKind> {
        let start = self.pos;
        let Some(ch) = self.advance() else {
            unreachable!("parse_atom is only called with input left");
        };
        let kind = match ch {
            '(' => self.parse_group(start, depth)?,
            '[' => self.parse_char_class(start)?,
            '\\' => match self.advance() {
                Some('d') => NodeKind::Digit,
                Some('w') => NodeKind::WordChar,
                Some(c @ '1'..='9') => {
                    let index = c as usize - '0' as usize;
                    self.backrefs.push((start, index));
                    NodeKind::Backreference(index)
                }
                Some(c) => NodeKind::Literal(c),
                None => NodeKind::Literal('\\'),
            },
            '.' => NodeKind::Wildcard,
            '$' if depth == 0 && self.peek().is_none() => NodeKind::EndOfInput,
            c => NodeKind::Literal(c),
        };
        Ok(kind)
    }

    /// Parse a group body after its `(`, splitting it into branches on `|`.
    ///
    /// The capture index is taken before the body is scanned so an outer group
    /// numbers lower than the groups nested in it.
    fn parse_group(&mut self, open: usize, depth: usize) -> Result<NodeKind> {
        let capture_index = self.alloc_group_id();
        let mut branches = Vec::new();
        let mut branch: Vec<PatternNode> = Vec::new();
        loop {
            match self.peek() {
                None => return Err(CompileError::UnterminatedGroup { pos: open }),
                Some(')') => {
                    self.advance();
                    break;
                }
                Some('|') => {
                    self.advance();
                    if let Some(last) = branch.last_mut() {
                        last.alternation_marker = true;
                    }
                    branches.push(mem::take(&mut branch));
                }
                Some(_) => branch.push(self.parse_repeat(depth + 1)?),
            }
        }
        branches.push(branch);
        Ok(NodeKind::Group {
            capture_index,
            branches,
        })
    }

    /// Parse a character class after its `[`, e.g. `[abc]`, `[^abc]` or `[a-z]`.
    ///
    /// Examples:
    /// - Pattern: `[a-c]`  → CharClassPositive({a, b, c})
    /// - Pattern: `[^xyz]` → CharClassNegative({x, y, z})
    fn parse_char_class(&mut self, open: usize) -> Result<NodeKind> {
        let negated = self.expect('^');
        let mut set = CharSet::new();
        loop {
            let member_pos = self.pos;
            let c = match self.advance() {
                None => return Err(CompileError::UnterminatedClass { pos: open }),
                Some(']') => break,
                Some(c) => c,
            };
            let range_end = match (self.peek(), self.chars.get(self.pos + 1)) {
                (Some('-'), Some(&end)) if end != ']' => Some(end),
                _ => None,
            };
            match range_end {
                Some(end) => {
                    if c > end {
                        return Err(CompileError::DescendingRange {
                            pos: member_pos,
                            start: c,
                            end,
                        });
                    }
                    self.pos += 2;
                    set.extend(c..=end);
                }
                None => {
                    set.insert(c);
                }
            }
        }
        Ok(if negated {
            NodeKind::CharClassNegative(set)
        } else {
            NodeKind::CharClassPositive(set)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(c: char) -> PatternNode {
        PatternNode::new(NodeKind::Literal(c))
    }

    #[test]
    fn caret_only_anchors_at_start() {
        let pattern = compile("^a^").unwrap();
        assert!(pattern.is_anchored_start());
        assert_eq!(pattern.nodes().len(), 2);
        assert_eq!(pattern.nodes()[1].kind, NodeKind::Literal('^'));
    }

    #[test]
    fn dollar_is_anchor_only_at_end() {
        let pattern = compile("a$b$").unwrap();
        let kinds: Vec<_> = pattern.nodes().iter().map(|n| n.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Literal('a'),
                NodeKind::Literal('$'),
                NodeKind::Literal('b'),
                NodeKind::EndOfInput
            ]
        );
        assert_eq!(compile("a\\$").unwrap().nodes()[1].kind, NodeKind::Literal('$'));
    }

    #[test]
    fn quantifier_sets_repetition_and_hint() {
        let pattern = compile("ca+t").unwrap();
        let plus = &pattern.nodes()[1];
        assert_eq!(plus.repetition, Repetition::OneOrMore);
        assert_eq!(plus.next_literal_hint, Some('t'));
        assert_eq!(pattern.nodes()[2].next_literal_hint, None);
    }

    #[test]
    fn hint_looks_through_closing_parens() {
        let pattern = compile("((x+)), y").unwrap();
        let NodeKind::Group { branches, .. } = &pattern.nodes()[0].kind else {
            panic!("expected group");
        };
        let NodeKind::Group { branches: inner, .. } = &branches[0][0].kind else {
            panic!("expected nested group");
        };
        assert_eq!(inner[0][0].next_literal_hint, Some(','));
    }

    #[test]
    fn alternation_marks_all_but_last_branch() {
        let pattern = compile("(ab|c|de)").unwrap();
        let NodeKind::Group { capture_index, branches } = &pattern.nodes()[0].kind else {
            panic!("expected group");
        };
        assert_eq!(*capture_index, 1);
        assert_eq!(branches.len(), 3);
        assert!(branches[0][1].alternation_marker);
        assert!(!branches[0][0].alternation_marker);
        assert!(branches[1][0].alternation_marker);
        assert!(!branches[2][1].alternation_marker);
    }

    #[test]
    fn bar_and_paren_outside_group_are_literals() {
        let pattern = compile("a|b)").unwrap();
        assert_eq!(pattern.nodes()[1].kind, NodeKind::Literal('|'));
        assert_eq!(pattern.nodes()[3].kind, NodeKind::Literal(')'));
    }

    #[test]
    fn range_expands_eagerly() {
        let pattern = compile("[^a-dz]").unwrap();
        let expected: CharSet = "abcdz".chars().collect();
        assert_eq!(pattern.nodes()[0].kind, NodeKind::CharClassNegative(expected));
        let trailing_dash: CharSet = ['a', '-'].into_iter().collect();
        assert_eq!(
            compile("[a-]").unwrap().nodes()[0].kind,
            NodeKind::CharClassPositive(trailing_dash)
        );
    }

    #[test]
    fn unknown_escape_is_literal() {
        let pattern = compile("\\.\\").unwrap();
        assert_eq!(pattern.nodes()[0], {
            let mut n = literal('.');
            n.next_literal_hint = Some('\\');
            n
        });
        assert_eq!(pattern.nodes()[1].kind, NodeKind::Literal('\\'));
    }

    #[test]
    fn malformed_patterns_are_reported() {
        assert_eq!(compile("ab(cd").unwrap_err(), CompileError::UnterminatedGroup { pos: 2 });
        assert_eq!(compile("x[abc").unwrap_err(), CompileError::UnterminatedClass { pos: 1 });
        assert_eq!(
            compile("[z-a]").unwrap_err(),
            CompileError::DescendingRange {
                pos: 1,
                start: 'z',
                end: 'a'
            }
        );
        assert_eq!(
            compile("(a) \\2").unwrap_err(),
            CompileError::UnknownGroup { pos: 4, index: 2 }
        );
    }

    #[test]
    fn forward_reference_to_existing_group_compiles() {
        let pattern = compile("\\1(a)").unwrap();
        assert_eq!(pattern.capture_count(), 1);
        assert_eq!(pattern.nodes()[0].kind, NodeKind::Backreference(1));
    }
}

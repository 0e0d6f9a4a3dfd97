use log::{debug, trace};

use crate::ast::{NodeKind, PatternNode, Repetition};

/// Substrings captured by each group during one match call, indexed by the
/// group's 1-based capture index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTable {
    slots: Vec<Option<String>>,
}

impl CaptureTable {
    /// Creates a table with room for groups `1..=capture_count`.
    pub fn new(capture_count: usize) -> Self {
        Self {
            slots: vec![None; capture_count + 1],
        }
    }

    /// The substring group `index` last matched, or `None` when it has not
    /// captured yet. Index 0 is not a group.
    pub fn get(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return None;
        }
        self.slots.get(index)?.as_deref()
    }

    /// Number of groups the table tracks.
    pub fn len(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries for groups `1..=len()`, with unattempted groups as `""`.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slots[1..].iter().map(|slot| slot.as_deref().unwrap_or(""))
    }

    fn set(&mut self, index: usize, value: String) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(value);
        }
    }
}

/// Searches `input` for the node sequence, restarting one position after the
/// start of a failed attempt unless `anchored_start` is set.
///
/// Captures are written into `captures` as groups succeed and are not cleared
/// when an attempt is abandoned.
pub fn match_nodes(
    input: &[char],
    nodes: &[PatternNode],
    anchored_start: bool,
    captures: &mut CaptureTable,
) -> bool {
    let mut i = 0;
    let mut pi = 0;
    let mut last_found_idx = 0;
    let mut in_progress = false;
    let mut matched_any = false;

    while i < input.len() && pi < nodes.len() {
        match match_atom(&nodes[pi], &nodes[pi + 1..], input, i, captures) {
            Some(next) => {
                if !in_progress {
                    last_found_idx = i;
                    in_progress = true;
                }
                matched_any = true;
                i = next;
                pi += 1;
            }
            None if anchored_start => {
                trace!("anchored attempt failed at {} on node {}", i, pi);
                return false;
            }
            None if in_progress => {
                debug!("attempt from {} failed at node {}, sliding", last_found_idx, pi);
                pi = 0;
                i = last_found_idx + 1;
                in_progress = false;
            }
            None => i += 1,
        }
    }

    let remaining_ok = nodes[pi..].iter().all(|node| match node.kind {
        NodeKind::EndOfInput => i == input.len(),
        _ => node.repetition.allows_zero(),
    });
    matched_any && remaining_ok
}

/// Matches one node at `pos`, returning the cursor after it.
///
/// `rest` is the remainder of the sequence the node sits in, consulted when a
/// greedy quantifier gives characters back.
fn match_atom(
    node: &PatternNode,
    rest: &[PatternNode],
    input: &[char],
    pos: usize,
    captures: &mut CaptureTable,
) -> Option<usize> {
    if node.is_single_char() {
        return match_single(node, rest, input, pos);
    }

    let Some(mut end) = match_once(node, input, pos, captures) else {
        return node.repetition.allows_zero().then_some(pos);
    };
    if node.repetition.repeats() && end > pos {
        while let Some(next) = match_once(node, input, end, captures) {
            if next == end {
                break;
            }
            end = next;
        }
    }
    Some(end)
}

/// Single-character atom with the lookahead hint and backoff heuristics.
fn match_single(node: &PatternNode, rest: &[PatternNode], input: &[char], pos: usize) -> Option<usize> {
    if !input.get(pos).is_some_and(|&c| node.accepts(c)) {
        return node.repetition.allows_zero().then_some(pos);
    }
    let mut end = pos + 1;
    if !node.repetition.repeats() {
        return Some(end);
    }

    while let Some(&c) = input.get(end) {
        if !node.accepts(c) || Some(c) == node.next_literal_hint {
            break;
        }
        end += 1;
    }

    // Give one character back for each following atom that also wants the
    // last consumed one.
    let min_end = if node.repetition == Repetition::OneOrMore { pos + 1 } else { pos };
    let last = input[end - 1];
    let give_back = rest
        .iter()
        .take_while(|next| {
            next.is_single_char() && !next.repetition.allows_zero() && next.accepts(last)
        })
        .count();
    let backed_off = end.saturating_sub(give_back).max(min_end);
    if backed_off != end {
        trace!("quantifier at {} backed off from {} to {}", pos, end, backed_off);
    }
    Some(backed_off)
}

/// One application of a group or backreference, ignoring its repetition.
fn match_once(node: &PatternNode, input: &[char], pos: usize, captures: &mut CaptureTable) -> Option<usize> {
    match &node.kind {
        NodeKind::Group {
            capture_index,
            branches,
        } => {
            let end = branches
                .iter()
                .find_map(|branch| match_sequence(branch, input, pos, captures))?;
            let captured: String = input[pos..end].iter().collect();
            trace!("group {} captured {:?}", capture_index, captured);
            captures.set(*capture_index, captured);
            Some(end)
        }
        NodeKind::Backreference(index) => {
            let captured = captures.get(*index)?;
            let len = captured.chars().count();
            let window = input.get(pos..pos + len)?;
            window.iter().copied().eq(captured.chars()).then_some(pos + len)
        }
        NodeKind::EndOfInput => (pos == input.len()).then_some(pos),
        _ => unreachable!("single-character atoms are matched by match_single"),
    }
}

/// Matches every node of a branch in order from `pos`.
fn match_sequence(
    branch: &[PatternNode],
    input: &[char],
    pos: usize,
    captures: &mut CaptureTable,
) -> Option<usize> {
    let mut cursor = pos;
    for (k, node) in branch.iter().enumerate() {
        cursor = match_atom(node, &branch[k + 1..], input, cursor, captures)?;
    }
    Some(cursor)
}

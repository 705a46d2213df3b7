use std::collections::HashSet;

use super::rule::RuleSet;
use crate::config::RuleAction;

/// An unterminated segment longer than this is classified as it stands.
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

/// A rule failed on a line; the line was forwarded unfiltered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFault {
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterOutput {
    /// Surviving lines, terminators included.
    pub text: String,
    pub faults: Vec<FilterFault>,
}

impl FilterOutput {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.faults.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Idle,
    InSuppressedBlock,
}

/// Per-stream line filter. Holds the partial-line buffer and block state for
/// exactly one stream.
pub struct FilterSink {
    rules: RuleSet,
    pending: Vec<u8>,
    state: BlockState,
    faulted: HashSet<usize>,
}

impl FilterSink {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            pending: Vec::with_capacity(8 * 1024),
            state: BlockState::Idle,
            faulted: HashSet::new(),
        }
    }

    /// Feed an arbitrary fragment. Only complete segments are classified: a
    /// line ended by `\n`, or a redraw that the next bare `\r` overwrites.
    pub fn write(&mut self, chunk: &[u8]) -> FilterOutput {
        let mut out = FilterOutput::default();
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(len) = segment_len(&self.pending[start..]) {
            let end = start + len;
            let segment = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
            self.process_line(&segment, &mut out);
            start = end;
        }
        if start > 0 {
            self.pending.drain(..start);
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            let rest = self.pending.split_off(complete_utf8_len(&self.pending));
            let segment = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending = rest;
            self.process_line(&segment, &mut out);
        }
        out
    }

    /// Classify whatever is left after EOF as a final line.
    pub fn finish(&mut self) -> FilterOutput {
        let mut out = FilterOutput::default();
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.process_line(&line, &mut out);
        }
        out
    }

    fn process_line(&mut self, line: &str, out: &mut FilterOutput) {
        if self.classify(content_of(line), out) {
            out.text.push_str(line);
        }
    }

    /// Returns true when the line should be forwarded.
    fn classify(&mut self, content: &str, out: &mut FilterOutput) -> bool {
        if self.state == BlockState::InSuppressedBlock {
            if content.starts_with(' ') || content.starts_with('\t') {
                return false;
            }
            self.state = BlockState::Idle;
        }

        for (idx, rule) in self.rules.iter().enumerate() {
            match rule.evaluate(content) {
                Ok(None) => continue,
                Ok(Some(RuleAction::Drop)) => return false,
                Ok(Some(RuleAction::Block)) => {
                    self.state = BlockState::InSuppressedBlock;
                    return false;
                }
                Ok(Some(RuleAction::Pass)) => return true,
                Err(e) => {
                    if self.faulted.insert(idx) {
                        out.faults.push(FilterFault {
                            rule: rule.name().to_string(),
                            message: e.to_string(),
                        });
                    }
                    return true;
                }
            }
        }
        true
    }
}

/// Length of the first complete segment in `buf`. A bare `\r` starts a new
/// segment; `\r\n` is an ordinary line ending. A trailing `\r` waits for the
/// next byte.
fn segment_len(buf: &[u8]) -> Option<usize> {
    for (i, &b) in buf.iter().enumerate() {
        match b {
            b'\n' => return Some(i + 1),
            b'\r' => match buf.get(i + 1) {
                None => return None,
                Some(b'\n') => return Some(i + 2),
                Some(_) if i > 0 => return Some(i),
                Some(_) => {}
            },
            _ => {}
        }
    }
    None
}

/// Length of `buf` without a trailing, incomplete UTF-8 sequence.
fn complete_utf8_len(buf: &[u8]) -> usize {
    let tail = buf.len().saturating_sub(3);
    for i in (tail..buf.len()).rev() {
        let b = buf[i];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let need = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if buf.len() - i < need { i } else { buf.len() };
    }
    buf.len()
}

fn content_of(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

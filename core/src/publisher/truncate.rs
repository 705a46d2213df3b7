pub const TRUNCATION_MARKER: &str = "... (earlier output truncated due to size limit)\n";

/// Bytes `c` occupies inside a JSON string literal.
pub fn encoded_char_len(c: char) -> usize {
    match c {
        '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
        c if (c as u32) < 0x20 => 6,
        c => c.len_utf8(),
    }
}

/// Bytes `s` occupies inside a JSON string literal, quotes excluded.
pub fn encoded_len(s: &str) -> usize {
    s.chars().map(encoded_char_len).sum()
}

/// Text buffer capped by its JSON-encoded size, which is what the status
/// store measures. Overflow drops the oldest content and puts the marker in
/// front; the marker counts toward the cap and appears at most once.
#[derive(Debug, Default, Clone)]
pub struct CappedText {
    text: String,
    encoded: usize,
}

impl CappedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn encoded_len(&self) -> usize {
        self.encoded
    }

    pub fn push(&mut self, text: &str, cap: usize) {
        self.text.push_str(text);
        self.encoded += encoded_len(text);
        if self.encoded <= cap {
            return;
        }

        let marker = encoded_len(TRUNCATION_MARKER);
        let budget = cap.saturating_sub(marker);
        let mut remaining = self.encoded;
        let mut cut = self.text.len();
        for (idx, c) in self.text.char_indices() {
            if remaining <= budget {
                cut = idx;
                break;
            }
            remaining -= encoded_char_len(c);
        }

        self.text.replace_range(..cut, TRUNCATION_MARKER);
        self.encoded = remaining + marker;
    }
}

//! Chunk splitter
//!
//! Cuts concatenated JSON objects (`{..}{..}{..}`) out of an incrementally
//! fed buffer. Depth is tracked together with string-literal and escape
//! state so braces inside string values never close an object. Structural
//! characters are ASCII, which makes a byte-level scan safe on UTF-8 input.

use super::error::ParseError;

/// One item produced by the splitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split {
    /// A brace-balanced object, not yet validated as JSON
    Object(String),
    Invalid(ParseError),
}

#[derive(Debug, Default, Clone, Copy)]
struct ScanState {
    depth: usize,
    in_string: bool,
    escaped: bool,
}

/// Incremental splitter for one response stream
#[derive(Debug, Default)]
pub struct ChunkSplitter {
    /// Input pushed so far. Bytes before `start` are consumed and dropped on
    /// the next push.
    buffer: String,
    /// First unconsumed byte. While `depth > 0` it is the open object's `{`.
    start: usize,
    /// Next byte of `buffer` to scan
    cursor: usize,
    scan: ScanState,
}

impl ChunkSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Nothing is scanned until splits are pulled.
    pub fn push(&mut self, chunk: &str) {
        if self.start > 0 {
            self.buffer.replace_range(..self.start, "");
            self.cursor -= self.start;
            self.start = 0;
        }
        self.buffer.push_str(chunk);
    }

    /// Input not yet returned as an object
    pub fn remainder(&self) -> &str {
        self.text(self.start, self.buffer.len())
    }

    /// Whether an object has been opened but not closed
    pub fn in_object(&self) -> bool {
        self.scan.depth > 0
    }

    /// Lazily pull every split available from the input pushed so far
    pub fn splits(&mut self) -> impl Iterator<Item = Split> + '_ {
        std::iter::from_fn(move || self.next_split())
    }

    /// Scan forward until the next object closes or the input runs out
    pub fn next_split(&mut self) -> Option<Split> {
        while let Some(&byte) = self.buffer.as_bytes().get(self.cursor) {
            let at = self.cursor;
            self.cursor += 1;

            if self.scan.depth == 0 {
                if byte != b'{' {
                    continue;
                }
                // Drop what sat between objects; the object opens at `at`
                let stray = self.text(self.start, at).trim();
                let stray = (!stray.is_empty()).then(|| {
                    tracing::debug!(bytes = stray.len(), "Stray input between objects");
                    ParseError::stray_input(stray)
                });
                self.start = at;
                self.scan.depth = 1;
                if let Some(err) = stray {
                    return Some(Split::Invalid(err));
                }
                continue;
            }

            if self.scan.in_string {
                if self.scan.escaped {
                    self.scan.escaped = false;
                } else if byte == b'\\' {
                    self.scan.escaped = true;
                } else if byte == b'"' {
                    self.scan.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.scan.in_string = true,
                b'{' => self.scan.depth += 1,
                b'}' => {
                    self.scan.depth -= 1;
                    if self.scan.depth == 0 {
                        let object = self.text(self.start, self.cursor).to_string();
                        self.start = self.cursor;
                        return Some(Split::Object(object));
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// End of transcript: drain everything that is left.
    ///
    /// An object that never closed is reported once. Scanning resumes at
    /// each later `{` until one of them closes, so valid objects that follow
    /// a truncated one are still recovered.
    pub fn finish(&mut self) -> Vec<Split> {
        let mut out: Vec<Split> = self.splits().collect();

        while self.scan.depth > 0 {
            let broken_from = self.start;
            let mut broken_to = self.buffer.len();
            let mut recovered = None;

            while let Some(at) = self.next_open_brace(self.start) {
                self.start = at;
                self.cursor = at;
                self.scan = ScanState::default();
                if let Some(split) = self.next_split() {
                    broken_to = at;
                    recovered = Some(split);
                    break;
                }
            }

            let broken = self.text(broken_from, broken_to);
            tracing::debug!(bytes = broken.len(), "Unterminated object at end of transcript");
            out.push(Split::Invalid(ParseError::unterminated(broken)));

            match recovered {
                Some(split) => {
                    out.push(split);
                    out.extend(self.splits());
                }
                None => {
                    self.start = self.buffer.len();
                    self.scan = ScanState::default();
                }
            }
        }

        let stray = self.remainder().trim();
        if !stray.is_empty() {
            out.push(Split::Invalid(ParseError::stray_input(stray)));
        }
        self.buffer.clear();
        self.start = 0;
        self.cursor = 0;
        out
    }

    /// First `{` after the one at `from`
    fn next_open_brace(&self, from: usize) -> Option<usize> {
        self.buffer
            .as_bytes()
            .get(from + 1..)?
            .iter()
            .position(|&b| b == b'{')
            .map(|pos| from + 1 + pos)
    }

    /// Cut points are always ASCII structural bytes, so they sit on char
    /// boundaries
    fn text(&self, from: usize, to: usize) -> &str {
        self.buffer.get(from..to).unwrap_or_default()
    }
}

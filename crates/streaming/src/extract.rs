//! Structured title/content extraction for multi-option generation.
//!
//! Outline options arrive as free text shaped `TITLE: ...\nCONTENT: ...`.
//! Chunk boundaries fall anywhere, including mid-marker, so the extractor
//! buffers until both markers are seen, then forwards content verbatim
//! under the extracted title. If the markers never show up within a
//! bounded prefix, it gives up and falls back to an ordinal title.

const TITLE_MARKER: &str = "TITLE:";
const CONTENT_MARKER: &str = "CONTENT:";

/// How many buffered characters to scan before giving up on the markers.
const DEFAULT_BUFFER_LIMIT: usize = 500;

/// One emission from the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedChunk {
    /// Set on the first emission and on the terminal chunk.
    pub title: Option<String>,
    pub content: String,
    pub done: bool,
}

enum State {
    /// Accumulating text until the marker pair (or the length limit).
    Buffering,
    /// Title known; content forwards verbatim.
    Titled,
}

/// Per-option extraction state machine. `finish` consumes the extractor,
/// so the terminal chunk is emitted exactly once by construction.
pub struct StructuredExtractor {
    /// 1-based position of this option, used for the fallback title.
    ordinal: usize,
    state: State,
    buffer: String,
    title: Option<String>,
    buffer_limit: usize,
    /// Swallow leading whitespace of the first content fragment when the
    /// content marker landed at the end of a chunk.
    trim_leading: bool,
}

impl StructuredExtractor {
    pub fn new(ordinal: usize) -> Self {
        Self {
            ordinal: ordinal.max(1),
            state: State::Buffering,
            buffer: String::new(),
            title: None,
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            trim_leading: false,
        }
    }

    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = limit;
        self
    }

    fn fallback_title(&self) -> String {
        format!("Option {}", self.ordinal)
    }

    /// Feed one incoming text fragment. Returns zero or one chunks: none
    /// while buffering, one on the buffering→titled transition and for
    /// every fragment after it.
    pub fn feed(&mut self, text: &str) -> Option<ExtractedChunk> {
        match self.state {
            State::Buffering => self.feed_buffering(text),
            State::Titled => self.feed_titled(text),
        }
    }

    fn feed_buffering(&mut self, text: &str) -> Option<ExtractedChunk> {
        self.buffer.push_str(text);

        if let Some(content_pos) = self.buffer.find(CONTENT_MARKER) {
            let head = &self.buffer[..content_pos];
            let title = match head.find(TITLE_MARKER) {
                Some(title_pos) => {
                    let raw = head[title_pos + TITLE_MARKER.len()..].trim();
                    if raw.is_empty() {
                        self.fallback_title()
                    } else {
                        raw.to_string()
                    }
                }
                None => self.fallback_title(),
            };
            let rest = self.buffer[content_pos + CONTENT_MARKER.len()..]
                .trim_start()
                .to_string();
            self.trim_leading = rest.is_empty();
            self.buffer.clear();
            self.title = Some(title.clone());
            self.state = State::Titled;
            return Some(ExtractedChunk {
                title: Some(title),
                content: rest,
                done: false,
            });
        }

        if self.buffer.chars().count() > self.buffer_limit {
            // No markers in a reasonable prefix; treat it all as content.
            let content = std::mem::take(&mut self.buffer);
            let title = self.fallback_title();
            self.title = Some(title.clone());
            self.state = State::Titled;
            return Some(ExtractedChunk {
                title: Some(title),
                content,
                done: false,
            });
        }

        None
    }

    fn feed_titled(&mut self, text: &str) -> Option<ExtractedChunk> {
        let content = if self.trim_leading {
            let trimmed = text.trim_start();
            if trimmed.is_empty() {
                return None;
            }
            self.trim_leading = false;
            trimmed.to_string()
        } else {
            text.to_string()
        };
        if content.is_empty() {
            return None;
        }
        Some(ExtractedChunk {
            title: None,
            content,
            done: false,
        })
    }

    /// End of stream. Emits the single terminal chunk: the final title and
    /// any trailing fragment still buffered.
    pub fn finish(self) -> ExtractedChunk {
        match self.state {
            State::Buffering => ExtractedChunk {
                title: Some(self.fallback_title()),
                content: self.buffer,
                done: true,
            },
            State::Titled => ExtractedChunk {
                title: self.title,
                content: String::new(),
                done: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run the full input through the extractor in the given pieces and
    /// collect (title, concatenated content).
    fn run(pieces: &[&str], ordinal: usize) -> (String, String) {
        let mut extractor = StructuredExtractor::new(ordinal);
        let mut title = None;
        let mut content = String::new();
        for piece in pieces {
            if let Some(chunk) = extractor.feed(piece) {
                if chunk.title.is_some() {
                    title = chunk.title;
                }
                content.push_str(&chunk.content);
            }
        }
        let terminal = extractor.finish();
        assert!(terminal.done);
        if title.is_none() {
            title = terminal.title.clone();
        }
        content.push_str(&terminal.content);
        (title.unwrap(), content)
    }

    #[test]
    fn whole_input_in_one_chunk() {
        let (title, content) = run(&["TITLE: Foo\nCONTENT: bar"], 1);
        assert_eq!(title, "Foo");
        assert_eq!(content, "bar");
    }

    #[test]
    fn title_survives_every_split_point() {
        let input = "TITLE: Foo\nCONTENT: bar";
        for split in 1..input.len() {
            let (head, tail) = input.split_at(split);
            let (title, content) = run(&[head, tail], 1);
            assert_eq!(title, "Foo", "split at {split}");
            assert_eq!(content, "bar", "split at {split}");
        }
    }

    #[test]
    fn character_by_character_feeding() {
        let input = "TITLE: The Long Road\nCONTENT: She walked on.";
        let pieces: Vec<String> = input.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
        let (title, content) = run(&refs, 3);
        assert_eq!(title, "The Long Road");
        assert_eq!(content, "She walked on.");
    }

    #[test]
    fn content_after_transition_forwards_verbatim() {
        let mut extractor = StructuredExtractor::new(1);
        let first = extractor.feed("TITLE: Foo\nCONTENT: one ").unwrap();
        assert_eq!(first.title.as_deref(), Some("Foo"));
        assert_eq!(first.content, "one ");

        let second = extractor.feed("two  three").unwrap();
        assert!(second.title.is_none());
        assert_eq!(second.content, "two  three");
    }

    #[test]
    fn missing_markers_fall_back_to_ordinal_title() {
        let mut extractor = StructuredExtractor::new(2).with_buffer_limit(20);
        let overflow = "a plain paragraph with no markers anywhere in it";
        let chunk = extractor.feed(overflow).unwrap();
        assert_eq!(chunk.title.as_deref(), Some("Option 2"));
        assert_eq!(chunk.content, overflow);
    }

    #[test]
    fn stream_end_before_markers_uses_fallback() {
        let mut extractor = StructuredExtractor::new(4);
        assert!(extractor.feed("short text").is_none());
        let terminal = extractor.finish();
        assert_eq!(terminal.title.as_deref(), Some("Option 4"));
        assert_eq!(terminal.content, "short text");
        assert!(terminal.done);
    }

    #[test]
    fn empty_stream_terminal_is_well_formed() {
        let terminal = StructuredExtractor::new(1).finish();
        assert_eq!(terminal.title.as_deref(), Some("Option 1"));
        assert_eq!(terminal.content, "");
        assert!(terminal.done);
    }

    #[test]
    fn content_marker_without_title_marker() {
        let (title, content) = run(&["CONTENT: just content"], 5);
        assert_eq!(title, "Option 5");
        assert_eq!(content, "just content");
    }

    #[test]
    fn empty_title_falls_back() {
        let (title, content) = run(&["TITLE:\nCONTENT: body"], 2);
        assert_eq!(title, "Option 2");
        assert_eq!(content, "body");
    }

    #[test]
    fn leading_noise_before_markers_is_dropped() {
        let (title, content) = run(&["Sure! Here is an option.\nTITLE: Foo\nCONTENT: bar"], 1);
        assert_eq!(title, "Foo");
        assert_eq!(content, "bar");
    }

    #[test]
    fn ordinal_floors_at_one() {
        let terminal = StructuredExtractor::new(0).finish();
        assert_eq!(terminal.title.as_deref(), Some("Option 1"));
    }
}

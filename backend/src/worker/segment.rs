use regex::Regex;
use std::sync::LazyLock;

/// Paragraphs longer than this are re-chunked on sentence boundaries.
const LONG_PARAGRAPH_CHARS: usize = 2000;
/// Target upper bound for a re-chunked piece.
const CHUNK_CHARS: usize = 1500;

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid blank-line regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

/// Splits a document into the paragraphs that will be analysed.
///
/// Blank lines separate paragraphs. Very long paragraphs are cut into
/// sentence-aligned chunks of roughly `CHUNK_CHARS`. Pieces shorter than
/// `min_chars` (after trimming) are dropped; the returned order is the
/// document order and becomes the paragraph index.
pub fn split_into_paragraphs(text: &str, min_chars: usize) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut pieces = Vec::new();

    for block in BLANK_LINE.split(&normalized) {
        let block = block.trim();
        if block.chars().count() > LONG_PARAGRAPH_CHARS {
            pieces.extend(chunk_sentences(block));
        } else {
            pieces.push(block.to_string());
        }
    }

    pieces
        .into_iter()
        .filter(|p| !p.is_empty() && p.chars().count() >= min_chars)
        .collect()
}

fn sentences(block: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(block) {
        // Keep the punctuation, drop the whitespace after it.
        out.push(&block[start..m.start() + 1]);
        start = m.end();
    }
    if start < block.len() {
        out.push(&block[start..]);
    }
    out
}

fn chunk_sentences(block: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for sentence in sentences(block) {
        let len = sentence.chars().count();
        let separator = usize::from(!current.is_empty());
        if current_chars + separator + len > CHUNK_CHARS && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(sentence);
        current_chars += len;
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}

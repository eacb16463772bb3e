/// Recursive character text splitting.
///
/// Text is cut at the first separator (in priority order) that occurs in it,
/// keeping each separator at the start of the piece that follows. Small pieces
/// are merged greedily up to `chunk_size` characters, carrying up to
/// `chunk_overlap` characters of trailing pieces into the next chunk. Pieces
/// that are still too large are split again with the remaining separators.
/// All lengths are counted in `char`s.
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    separators: &'static [&'static str],
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// `chunk_overlap` must be smaller than `chunk_size`; `Config::validate`
    /// enforces this for configured values.
    #[must_use]
    pub fn new(separators: &'static [&'static str], chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            separators,
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    /// Split `text` into trimmed, non-empty chunks.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        finish(self.split_recursive(text, self.separators))
    }

    /// Merge contiguous pieces that were cut by the caller, splitting any
    /// oversized piece with this splitter's separators.
    #[must_use]
    pub fn split_pieces(&self, pieces: &[&str]) -> Vec<String> {
        finish(self.merge_or_recurse(pieces, self.separators))
    }

    fn split_recursive(&self, text: &str, separators: &'static [&'static str]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);
        let pieces = split_keeping_separator(text, separator);
        self.merge_or_recurse(&pieces, remaining)
    }

    fn merge_or_recurse(&self, pieces: &[&str], remaining: &'static [&'static str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for &piece in pieces {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge(&small));
                small.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                // Keep a tail of at most `chunk_overlap` chars that still
                // leaves room for the incoming piece.
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn finish(chunks: Vec<String>) -> Vec<String> {
    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// The first separator present in `text`, and the separators after it.
fn pick_separator(
    text: &str,
    separators: &'static [&'static str],
) -> (&'static str, &'static [&'static str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    (separators.last().copied().unwrap_or(""), &[])
}

/// Split so that every piece after the first starts with `separator`.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

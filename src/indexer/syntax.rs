/// Top-level syntax boundaries via tree-sitter.
///
/// A document is cut at the start byte of every named child of the syntax
/// tree's root (declarations, statements, comments), so a chunk never begins
/// halfway through a top-level declaration unless that declaration alone
/// exceeds the chunk size.
use thiserror::Error;
use tree_sitter::{Language, Parser};

#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("grammar could not be loaded: {0}")]
    Grammar(String),

    #[error("parser produced no tree")]
    NoTree,
}

/// A parser bound to one grammar.
pub struct SyntaxCutter {
    parser: Parser,
}

impl SyntaxCutter {
    pub fn new(language: &Language) -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(language)
            .map_err(|e| SyntaxError::Grammar(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Byte offsets where the top-level nodes of `source` start.
    pub fn boundaries(&mut self, source: &str) -> Result<Vec<usize>, SyntaxError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(SyntaxError::NoTree)?;
        let root = tree.root_node();
        let mut cursor = root.walk();
        let starts = root
            .named_children(&mut cursor)
            .map(|node| node.start_byte())
            .collect();
        Ok(starts)
    }

    /// Cut `source` into contiguous pieces at its top-level boundaries.
    pub fn cut<'s>(&mut self, source: &'s str) -> Result<Vec<&'s str>, SyntaxError> {
        let boundaries = self.boundaries(source)?;
        Ok(cut_at(source, &boundaries))
    }
}

/// Split `source` at the given byte offsets. Offsets out of order, out of
/// range, or not on a char boundary are ignored.
#[must_use]
pub fn cut_at<'s>(source: &'s str, boundaries: &[usize]) -> Vec<&'s str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for &offset in boundaries {
        if offset <= start || offset >= source.len() || !source.is_char_boundary(offset) {
            continue;
        }
        pieces.push(&source[start..offset]);
        start = offset;
    }
    if start < source.len() {
        pieces.push(&source[start..]);
    }
    pieces
}

/// Loaded source files and the chunks cut from them.
use serde::{Deserialize, Serialize};

/// Provenance carried from a file to every chunk cut from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub source_path: String,
}

/// The full text of one eligible file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata {
                source_path: source_path.into(),
            },
        }
    }

    /// Lowercased file extension of the source path, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.metadata.source_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// A length-bounded slice of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata {
                source_path: source_path.into(),
            },
        }
    }

    #[must_use]
    pub fn source_path(&self) -> &str {
        &self.metadata.source_path
    }

    /// The first `max_chars` characters of the text.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lowercased() {
        let doc = Document::new("", "/src/App/View.SWIFT");
        assert_eq!(doc.extension().as_deref(), Some("swift"));
        assert_eq!(Document::new("", "/src/Makefile").extension(), None);
    }

    #[test]
    fn test_preview_counts_chars() {
        let chunk = Chunk::new("héllo wörld", "/a.swift");
        assert_eq!(chunk.preview(4), "héll");
        assert_eq!(chunk.preview(100), "héllo wörld");
    }
}

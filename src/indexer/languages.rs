use tree_sitter::Language;

/// Separators for files whose extension has no registered language.
pub const GENERIC_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Chunking rules for one source language.
///
/// `separators` are tried in order by the recursive splitter. `grammar` is set
/// when a tree-sitter grammar is bundled; the chunker then cuts at top-level
/// syntax nodes before falling back to the separators.
pub struct LanguageConfig {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub separators: &'static [&'static str],
    pub grammar: Option<fn() -> Language>,
}

impl LanguageConfig {
    pub fn get_all() -> Vec<LanguageConfig> {
        vec![
            swift_config(),
            rust_config(),
            go_config(),
            python_config(),
            typescript_config(),
            javascript_config(),
            java_config(),
            kotlin_config(),
            cpp_config(),
        ]
    }

    pub fn get_by_extension(ext: &str) -> Option<LanguageConfig> {
        let ext = ext.to_ascii_lowercase();
        Self::get_all()
            .into_iter()
            .find(|c| c.extensions.contains(&ext.as_str()))
    }

    pub fn get_by_name(name: &str) -> Option<LanguageConfig> {
        Self::get_all().into_iter().find(|c| c.name == name)
    }

    /// Load the bundled grammar, if this language has one.
    #[must_use]
    pub fn language(&self) -> Option<Language> {
        self.grammar.map(|load| load())
    }
}

fn swift_grammar() -> Language {
    tree_sitter_swift::LANGUAGE.into()
}

fn rust_grammar() -> Language {
    tree_sitter_rust::LANGUAGE.into()
}

fn go_grammar() -> Language {
    tree_sitter_go::LANGUAGE.into()
}

fn python_grammar() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

fn typescript_grammar() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

fn javascript_grammar() -> Language {
    tree_sitter_javascript::LANGUAGE.into()
}

fn swift_config() -> LanguageConfig {
    LanguageConfig {
        name: "swift",
        extensions: &["swift"],
        separators: &[
            "\nfunc ", "\nclass ", "\nstruct ", "\nenum ", "\nif ", "\nfor ", "\nwhile ", "\ndo ",
            "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
        ],
        grammar: Some(swift_grammar),
    }
}

fn rust_config() -> LanguageConfig {
    LanguageConfig {
        name: "rust",
        extensions: &["rs"],
        separators: &[
            "\nfn ", "\nconst ", "\nlet ", "\nif ", "\nwhile ", "\nfor ", "\nloop ", "\nmatch ",
            "\n\n", "\n", " ", "",
        ],
        grammar: Some(rust_grammar),
    }
}

fn go_config() -> LanguageConfig {
    LanguageConfig {
        name: "go",
        extensions: &["go"],
        separators: &[
            "\nfunc ", "\nvar ", "\nconst ", "\ntype ", "\nif ", "\nfor ", "\nswitch ", "\ncase ",
            "\n\n", "\n", " ", "",
        ],
        grammar: Some(go_grammar),
    }
}

fn python_config() -> LanguageConfig {
    LanguageConfig {
        name: "python",
        extensions: &["py"],
        separators: &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " ", ""],
        grammar: Some(python_grammar),
    }
}

fn typescript_config() -> LanguageConfig {
    LanguageConfig {
        name: "typescript",
        extensions: &["ts", "tsx"],
        separators: &[
            "\nenum ", "\ninterface ", "\nnamespace ", "\ntype ", "\nclass ", "\nfunction ",
            "\nconst ", "\nlet ", "\nvar ", "\nif ", "\nfor ", "\nwhile ", "\nswitch ",
            "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
        ],
        grammar: Some(typescript_grammar),
    }
}

fn javascript_config() -> LanguageConfig {
    LanguageConfig {
        name: "javascript",
        extensions: &["js", "jsx", "mjs"],
        separators: &[
            "\nfunction ", "\nconst ", "\nlet ", "\nvar ", "\nclass ", "\nif ", "\nfor ",
            "\nwhile ", "\nswitch ", "\ncase ", "\ndefault ", "\n\n", "\n", " ", "",
        ],
        grammar: Some(javascript_grammar),
    }
}

fn java_config() -> LanguageConfig {
    LanguageConfig {
        name: "java",
        extensions: &["java"],
        separators: &[
            "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\nstatic ", "\nif ",
            "\nfor ", "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
        ],
        grammar: None,
    }
}

fn kotlin_config() -> LanguageConfig {
    LanguageConfig {
        name: "kotlin",
        extensions: &["kt", "kts"],
        separators: &[
            "\nclass ", "\npublic ", "\nprotected ", "\nprivate ", "\ninternal ", "\ncompanion ",
            "\nfun ", "\nval ", "\nvar ", "\nif ", "\nfor ", "\nwhile ", "\nwhen ", "\ncase ",
            "\nelse ", "\n\n", "\n", " ", "",
        ],
        grammar: None,
    }
}

fn cpp_config() -> LanguageConfig {
    LanguageConfig {
        name: "cpp",
        extensions: &["cpp", "cc", "cxx", "hpp", "h"],
        separators: &[
            "\nclass ", "\nvoid ", "\nint ", "\nfloat ", "\ndouble ", "\nif ", "\nfor ",
            "\nwhile ", "\nswitch ", "\ncase ", "\n\n", "\n", " ", "",
        ],
        grammar: None,
    }
}

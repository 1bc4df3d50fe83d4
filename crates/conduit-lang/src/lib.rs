//! Maps file extensions to languages and owns the tree-sitter parser pool.

mod pool;

pub use pool::{ParserGuard, ParserPool};

/// One of the four source languages the extractors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Go,
    TypeScript,
    CSharp,
}

impl Language {
    /// Maps a file extension (without the leading dot) to a language.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext {
            "py" => Some(Language::Python),
            "go" => Some(Language::Go),
            "ts" | "tsx" => Some(Language::TypeScript),
            "cs" => Some(Language::CSharp),
            _ => None,
        }
    }

    pub fn grammar(self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    /// The tree-sitter node type that denotes a call expression in this
    /// language, used by the extractor's depth-first walk (§4.2).
    pub fn call_expression_kind(self) -> &'static str {
        match self {
            Language::Python => "call",
            Language::Go => "call_expression",
            Language::TypeScript => "call_expression",
            Language::CSharp => "invocation_expression",
        }
    }

    /// Node types that may carry a server-side route registration: a
    /// decorator (Python), an annotation-like attribute (C#), or nothing
    /// distinct from a call expression (Go, TypeScript route calls already
    /// appear as call expressions).
    pub fn route_registration_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["decorator"],
            Language::CSharp => &["attribute"],
            Language::Go | Language::TypeScript => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_extensions() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("go"), Some(Language::Go));
        assert_eq!(Language::from_extension("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("cs"), Some(Language::CSharp));
    }

    #[test]
    fn rejects_unknown_extension() {
        assert_eq!(Language::from_extension("rb"), None);
    }
}

//! Parser adapter (C1): load a source file, produce a representation that
//! can be both queried semantically (the Ruff AST) and rewritten safely
//! (the source text plus byte ranges into it), and serialize it back out.
//!
//! Every semantic decision (C2, C6) is made over the Ruff AST; every edit to
//! source text is expressed as a byte range against the stored source,
//! applied via [`crate::fix::ByteRangeRewriter`]. There is therefore no
//! serializer that walks a mutated tree - edits are an explicit, appended
//! `Vec<Edit>` applied once against the original source, and "serializing"
//! an untouched module is just returning its original source text, which
//! trivially satisfies the round-trip invariant (spec §8.1).

use std::path::{Path, PathBuf};

use ruff_python_ast::ModModule;

use crate::error::{BundleshakeError, Result};

/// File extensions treated as opaque, binary native extensions (spec §3
/// `ResolvedModule.kind: native-extension`). No tree is produced for these.
const NATIVE_EXTENSION_SUFFIXES: &[&str] = &["so", "pyd"];

/// File extensions treated as declaration-only stub files (`kind: stub`).
const STUB_SUFFIXES: &[&str] = &["pyi"];

/// A parsed module: its original source text and the semantic (Ruff) AST.
#[derive(Debug)]
pub struct ParsedModule {
    /// Original source text, unmodified.
    pub source: String,
    /// Semantic AST used for every C2/C5/C6 decision; byte ranges into
    /// `source` are also how C5/C7 address the text they rewrite.
    pub ast: ModModule,
}

/// Whether `path`'s extension marks it as an opaque native extension.
#[must_use]
pub fn is_native_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| NATIVE_EXTENSION_SUFFIXES.contains(&ext))
}

/// Whether `path`'s extension marks it as a declaration-only stub.
#[must_use]
pub fn is_stub(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| STUB_SUFFIXES.contains(&ext))
}

/// Parse `source` (the contents of `path`, used only for error messages)
/// into a [`ParsedModule`].
///
/// # Errors
/// Returns [`BundleshakeError::ParseError`] on a syntax error.
pub fn parse(source: &str, path: &Path) -> Result<ParsedModule> {
    let parsed = ruff_python_parser::parse_module(source)
        .map_err(|err| BundleshakeError::parse_error(path.to_path_buf(), err))?;

    if !parsed.errors().is_empty() {
        let message = parsed
            .errors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(BundleshakeError::parse_error(path.to_path_buf(), message));
    }

    let ast = parsed.into_syntax();

    Ok(ParsedModule {
        source: source.to_owned(),
        ast,
    })
}

/// Read and parse the file at `path`.
///
/// # Errors
/// Returns [`BundleshakeError::Io`] if the file cannot be read, or a parse
/// error as described in [`parse`].
pub fn parse_file(path: &Path) -> Result<ParsedModule> {
    let source = std::fs::read_to_string(path)?;
    parse(&source, path)
}

/// Serialize a module back to source text.
///
/// Since no rewrite mutates the AST or CST in place - every transformation
/// (C5, C7) instead produces a fresh source string via
/// [`crate::fix::ByteRangeRewriter::apply`] - serializing an untouched
/// module is simply returning its stored source, which is a byte-for-byte
/// inverse of [`parse`] by construction.
#[must_use]
pub fn serialize(module: &ParsedModule) -> &str {
    &module.source
}

/// A destination to write parsed-and-possibly-rewritten source back to.
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Absolute destination path.
    pub path: PathBuf,
    /// Final source text to write.
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_stability() {
        let source = "import os\n\ndef f():\n    return os.getcwd()\n";
        let module = parse(source, Path::new("mod.py")).expect("parses");
        assert_eq!(serialize(&module), source);
    }

    #[test]
    fn native_extension_detection() {
        assert!(is_native_extension(Path::new("_speedups.so")));
        assert!(is_native_extension(Path::new("_speedups.cp312-win_amd64.pyd")));
        assert!(!is_native_extension(Path::new("mod.py")));
    }

    #[test]
    fn stub_detection() {
        assert!(is_stub(Path::new("mod.pyi")));
        assert!(!is_stub(Path::new("mod.py")));
    }

    #[test]
    fn syntax_error_is_reported() {
        let result = parse("def f(:\n", Path::new("bad.py"));
        assert!(result.is_err());
    }
}

//! Module spec service (C3): map dotted import specs to on-disk paths, walk
//! a package's immediate files, and classify first-party/stdlib/third-party
//! origin.
//!
//! Grounded in `flay.common.module_spec` (`get_top_level_package`,
//! `get_parent_package`, `find_all_files_in_module_spec`,
//! `find_module_path`) - reimplemented against a caller-provided list of
//! resolution roots instead of `sys.path`/`sys.meta_path`, since the core
//! does not assume a live interpreter.

use std::path::{Path, PathBuf};

use crate::error::{BundleshakeError, Result};
use crate::fqn::Fqn;
use crate::parsing::{is_native_extension, is_stub, ParsedModule};
use crate::stdlib::is_stdlib_module;

/// What kind of on-disk entity a resolved module is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// An ordinary source module.
    Regular,
    /// A package marker (`__init__`).
    PackageInit,
    /// An opaque compiled extension; no tree is parsed.
    NativeExtension,
    /// A declaration-only stub.
    Stub,
}

/// Where a module originates from, relative to the package being bundled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Inside the top-level package being bundled/treeshaken.
    FirstParty,
    /// A standard-library module (see [`crate::stdlib`]).
    Stdlib,
    /// Anything else: an installed third-party package.
    ThirdParty,
}

/// A module located on disk and classified, with its parsed tree attached
/// once C1 has run over it (absent for native extensions).
#[derive(Debug)]
pub struct ResolvedModule {
    /// Fully qualified module name.
    pub fqn: Fqn,
    /// Absolute path to the file on disk.
    pub path: PathBuf,
    /// What kind of file this is.
    pub kind: ModuleKind,
    /// Parsed tree, `None` for native extensions.
    pub tree: Option<ParsedModule>,
    /// First-party/stdlib/third-party classification.
    pub origin: Origin,
}

/// Resolves dotted specs against an ordered list of search roots.
pub struct ModuleSpecService {
    roots: Vec<PathBuf>,
    top_level_package: Fqn,
}

impl ModuleSpecService {
    /// Create a service over `roots` (searched in order) that treats
    /// `top_level_package` as first-party.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, top_level_package: Fqn) -> Self {
        Self {
            roots,
            top_level_package,
        }
    }

    /// Classify a module spec's origin without resolving it on disk.
    #[must_use]
    pub fn classify(&self, spec: &Fqn) -> Origin {
        if spec.starts_with(&self.top_level_package) {
            Origin::FirstParty
        } else if is_stdlib_module(spec.top_level()) {
            Origin::Stdlib
        } else {
            Origin::ThirdParty
        }
    }

    /// Locate and parse the file satisfying `spec`, searching resolution
    /// roots in order. A directory `D/a/b/__init__.py` satisfies spec `a.b`;
    /// `D/a/b.py` also satisfies it (single-file module); `D/a/b.so`/`.pyd`
    /// satisfy it as a native extension; `D/a/b.pyi` as a stub.
    ///
    /// # Errors
    /// Returns [`BundleshakeError::FileNotFound`] if no root contains a
    /// matching entry, or a parse error if the matched file is malformed.
    pub fn find(&self, spec: &Fqn) -> Result<ResolvedModule> {
        let rel = spec.as_str().replace('.', "/");
        let origin = self.classify(spec);

        for root in &self.roots {
            let package_init = root.join(&rel).join("__init__.py");
            if package_init.is_file() {
                let tree = Some(crate::parsing::parse_file(&package_init)?);
                return Ok(ResolvedModule {
                    fqn: spec.clone(),
                    path: package_init,
                    kind: ModuleKind::PackageInit,
                    tree,
                    origin,
                });
            }

            for (suffix, kind) in [
                (".py", ModuleKind::Regular),
                (".pyi", ModuleKind::Stub),
                (".so", ModuleKind::NativeExtension),
                (".pyd", ModuleKind::NativeExtension),
            ] {
                let candidate = root.join(format!("{rel}{suffix}"));
                if candidate.is_file() {
                    let tree = if kind == ModuleKind::NativeExtension {
                        None
                    } else {
                        Some(crate::parsing::parse_file(&candidate)?)
                    };
                    return Ok(ResolvedModule {
                        fqn: spec.clone(),
                        path: candidate,
                        kind,
                        tree,
                        origin,
                    });
                }
            }
        }

        Err(BundleshakeError::FileNotFound {
            spec: spec.to_string(),
        })
    }

    /// Enumerate every source/extension file directly inside the package
    /// directory for `spec` (non-recursive at this layer; C4 recurses
    /// through discovered imports, not directory structure).
    ///
    /// # Errors
    /// Returns [`BundleshakeError::FileNotFound`] if `spec` does not resolve
    /// to a package directory in any root.
    pub fn iter_package_files(&self, spec: &Fqn) -> Result<Vec<PathBuf>> {
        let rel = spec.as_str().replace('.', "/");

        for root in &self.roots {
            let dir = root.join(&rel);
            if dir.is_dir() {
                let mut files = Vec::new();
                for entry in std::fs::read_dir(&dir)? {
                    let entry = entry?;
                    let path = entry.path();
                    if path.is_file() && is_module_file(&path) {
                        files.push(path);
                    }
                }
                files.sort();
                return Ok(files);
            }
        }

        Err(BundleshakeError::FileNotFound {
            spec: spec.to_string(),
        })
    }
}

fn is_module_file(path: &Path) -> bool {
    if is_native_extension(path) || is_stub(path) {
        return true;
    }
    path.extension().is_some_and(|ext| ext == "py")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn classify_first_party_stdlib_third_party() {
        let service = ModuleSpecService::new(vec![], Fqn::new("app"));
        assert_eq!(service.classify(&Fqn::new("app.pkg")), Origin::FirstParty);
        assert_eq!(service.classify(&Fqn::new("os.path")), Origin::Stdlib);
        assert_eq!(
            service.classify(&Fqn::new("requests.models")),
            Origin::ThirdParty
        );
    }

    #[test]
    fn find_single_file_module() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("leaf.py"), "x = 1\n").expect("write");

        let service = ModuleSpecService::new(vec![temp.path().to_path_buf()], Fqn::new("leaf"));
        let resolved = service.find(&Fqn::new("leaf")).expect("resolves");
        assert_eq!(resolved.kind, ModuleKind::Regular);
        assert!(resolved.tree.is_some());
    }

    #[test]
    fn find_package_init() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("pkg")).expect("mkdir");
        fs::write(temp.path().join("pkg/__init__.py"), "").expect("write");

        let service = ModuleSpecService::new(vec![temp.path().to_path_buf()], Fqn::new("pkg"));
        let resolved = service.find(&Fqn::new("pkg")).expect("resolves");
        assert_eq!(resolved.kind, ModuleKind::PackageInit);
    }

    #[test]
    fn find_not_found() {
        let service = ModuleSpecService::new(vec![], Fqn::new("app"));
        assert!(matches!(
            service.find(&Fqn::new("missing")),
            Err(BundleshakeError::FileNotFound { .. })
        ));
    }

    #[test]
    fn iter_package_files_lists_non_recursively() {
        let temp = tempdir().expect("tempdir");
        let pkg = temp.path().join("pkg");
        fs::create_dir_all(pkg.join("sub")).expect("mkdir");
        fs::write(pkg.join("__init__.py"), "").expect("write");
        fs::write(pkg.join("a.py"), "").expect("write");
        fs::write(pkg.join("sub/b.py"), "").expect("write");

        let service = ModuleSpecService::new(vec![temp.path().to_path_buf()], Fqn::new("pkg"));
        let files = service.iter_package_files(&Fqn::new("pkg")).expect("lists");
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"__init__.py".to_owned()));
        assert!(names.contains(&"a.py".to_owned()));
        assert!(!names.contains(&"b.py".to_owned()));
    }
}

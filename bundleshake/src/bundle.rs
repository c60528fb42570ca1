//! Top-level `bundle()` entry point (spec §6): orchestrate C3 (classification),
//! C4 (file collection) and C5 (import rewriting) into one filesystem
//! mutation that produces a vendored, self-contained copy of a package.
//!
//! Grounded in `flay.bundle.package.bundle_package`'s own orchestration
//! (collect, rewrite-or-copy each file, write the vendored tree, copy
//! resource collaborators) - C6/C7 treeshaking stays a separate pass
//! ([`crate::treeshake::treeshake`]), exactly as `flay` exposes
//! `bundle_package` and `treeshake_package` as two independent operations
//! rather than one combined command.

use std::path::{Path, PathBuf};

use crate::collector::{CollectedModule, FileCollector};
use crate::ecosystem::ImportAliasMap;
use crate::error::{BundleshakeError, Result};
use crate::event::{Event, EventSink};
use crate::fix::ByteRangeRewriter;
use crate::fqn::Fqn;
use crate::module_spec::{ModuleKind, ModuleSpecService};
use crate::resources::{DistInfoCopier, NativeLibsCopier, ResourceCopier};
use crate::rewrite::ImportRewriter;

/// Bundle the package rooted at `module_spec` into `destination`, vendoring
/// every external dependency under `<module_spec.top_level()>.<vendor_name>`.
///
/// `resource_metadata` is a caller-supplied list of `(source, destination)`
/// directory pairs to copy verbatim once the rewritten tree is written (spec
/// §4.8's dist-info copy); copying is skipped entirely when `bundle_metadata`
/// is `false`, regardless of what `resource_metadata` contains. `import_aliases`
/// is accepted for signature parity with [`crate::treeshake::treeshake`] - C5's
/// vendoring decision is purely structural (stdlib/first-party/third-party),
/// so it is not consulted here.
///
/// # Errors
/// Returns [`BundleshakeError::InvalidConfiguration`] if `vendor_name` is
/// empty, dotted, or collides with an existing first-party submodule of the
/// bundled package - checked before any filesystem mutation. Propagates the
/// first resolve/parse/IO failure otherwise; every rewritten module is held
/// in memory and only written once all of them succeed, so a failure never
/// leaves a partially-rewritten destination (spec §7).
#[allow(clippy::too_many_arguments)]
pub fn bundle(
    service: &ModuleSpecService,
    module_spec: &Fqn,
    destination: &Path,
    vendor_name: &str,
    bundle_metadata: bool,
    resource_metadata: &[(PathBuf, PathBuf)],
    import_aliases: &ImportAliasMap,
    sink: &dyn EventSink,
) -> Result<()> {
    let _ = import_aliases;
    let top_package = module_spec.top_level();
    validate_vendor_name(service, top_package, vendor_name)?;

    let collector = FileCollector::new(service);
    let collected = collector.collect(module_spec, sink)?;

    let rewriter = ImportRewriter::new(service, top_package, vendor_name);
    let mut text_outputs: Vec<(PathBuf, String)> = Vec::new();
    let mut binary_outputs: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut libs_to_copy: Vec<(PathBuf, PathBuf)> = Vec::new();

    for module in &collected {
        sink.on_event(Event::ProcessModule {
            spec: module.fqn.clone(),
        });
        let dest_path = vendored_path(destination, top_package, vendor_name, module);

        let Some(parsed) = &module.parsed else {
            if module.kind == ModuleKind::NativeExtension {
                binary_outputs.push((module.path.clone(), dest_path.clone()));
                if let Some(pair) = native_libs_pair(module, &dest_path) {
                    libs_to_copy.push(pair);
                }
            }
            continue;
        };

        let edits = rewriter.rewrite(&parsed.source, &parsed.ast);
        let source = if edits.is_empty() {
            parsed.source.clone()
        } else {
            let mut applier = ByteRangeRewriter::new(parsed.source.clone());
            applier.add_edits(edits);
            applier.apply()?
        };
        text_outputs.push((dest_path, source));
    }

    // Nothing touches the filesystem until every module above has resolved
    // and rewritten cleanly (spec §7: partial output must never be
    // observable).
    std::fs::create_dir_all(destination)?;
    for (path, source) in text_outputs {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, source)?;
    }
    for (from, to) in binary_outputs {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(from, to)?;
    }
    if !libs_to_copy.is_empty() {
        NativeLibsCopier { pairs: libs_to_copy }.copy(sink)?;
    }

    std::fs::write(destination.join(".gitignore"), "*\n")?;

    if bundle_metadata && !resource_metadata.is_empty() {
        DistInfoCopier {
            pairs: resource_metadata.to_vec(),
        }
        .copy(sink)?;
        sink.on_event(Event::BundledMetadata);
    }

    Ok(())
}

/// Reject a `vendor_name` that is not a single plain identifier segment, or
/// one that would shadow an existing first-party submodule of the package
/// being bundled (spec §7's `InvalidConfiguration`, checked up front).
fn validate_vendor_name(service: &ModuleSpecService, top_package: &str, vendor_name: &str) -> Result<()> {
    if vendor_name.is_empty() || vendor_name.contains('.') {
        return Err(BundleshakeError::InvalidConfiguration(format!(
            "vendor_name must be a single, non-empty identifier segment, got '{vendor_name}'"
        )));
    }
    let collides = service
        .iter_package_files(&Fqn::new(top_package))
        .is_ok_and(|files| {
            files
                .iter()
                .any(|p| p.file_stem().and_then(|s| s.to_str()) == Some(vendor_name))
        });
    if collides {
        return Err(BundleshakeError::InvalidConfiguration(format!(
            "vendor_name '{vendor_name}' collides with an existing first-party submodule of '{top_package}'"
        )));
    }
    Ok(())
}

/// Where a collected module lands under `destination`: first-party modules
/// mirror their dotted path under `<destination>/<top_package>/`; everything
/// else is vendored under `<destination>/<top_package>/<vendor_name>/`,
/// still following its own dotted path underneath (spec §6: "external
/// packages land under `<destination>/<top>/<vendor>/<external>/…`").
fn vendored_path(destination: &Path, top_package: &str, vendor_name: &str, module: &CollectedModule) -> PathBuf {
    let is_external = module.fqn.top_level() != top_package;
    let mut path = destination.join(top_package);

    if is_external {
        path.push(vendor_name);
        for segment in module.fqn.segments() {
            path.push(segment);
        }
    } else {
        for segment in module.fqn.segments().into_iter().skip(1) {
            path.push(segment);
        }
    }

    if module.kind == ModuleKind::PackageInit {
        path.push("__init__.py");
    } else {
        path.set_extension(extension_for(module.kind));
    }
    path
}

fn extension_for(kind: ModuleKind) -> &'static str {
    match kind {
        ModuleKind::Stub => "pyi",
        ModuleKind::NativeExtension => "so",
        ModuleKind::Regular | ModuleKind::PackageInit => "py",
    }
}

/// A vendored native extension's companion `<name>.libs` directory, if its
/// source counterpart exists next to the `.so`/`.pyd` file (spec §4.8).
fn native_libs_pair(module: &CollectedModule, dest_path: &Path) -> Option<(PathBuf, PathBuf)> {
    let stem = module.path.file_stem()?.to_str()?;
    let libs_name = format!("{stem}.libs");
    let source_libs = module.path.with_file_name(&libs_name);
    let dest_libs = dest_path.with_file_name(&libs_name);
    Some((source_libs, dest_libs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecosystem::ImportAliasMap;
    use crate::event::NoopEventHandler;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn bundles_first_party_tree_and_vendors_external_import() {
        let source_root = tempdir().expect("tempdir");
        write(source_root.path(), "app/__init__.py", "from app.util import go\n");
        write(source_root.path(), "app/util.py", "import requests\n\ndef go():\n    return requests.get('x')\n");

        // `requests` lives on a separate root, as a pip-installed third-party
        // package would on `sys.path` - the app root alone would leave it
        // unresolvable and `bundle()` would return `FileNotFound`.
        let site_packages = tempdir().expect("tempdir");
        write(site_packages.path(), "requests/__init__.py", "def get(url):\n    pass\n");

        let destination = tempdir().expect("tempdir");
        let service = ModuleSpecService::new(
            vec![source_root.path().to_path_buf(), site_packages.path().to_path_buf()],
            Fqn::new("app"),
        );

        bundle(
            &service,
            &Fqn::new("app"),
            destination.path(),
            "_vendor",
            false,
            &[],
            &ImportAliasMap::new(),
            &NoopEventHandler,
        )
        .expect("bundles");

        let init = fs::read_to_string(destination.path().join("app/__init__.py")).expect("reads");
        assert!(init.contains("from app.util import go"));

        let util = fs::read_to_string(destination.path().join("app/util.py")).expect("reads");
        assert!(util.contains("import app._vendor.requests"));
        assert!(util.contains("app._vendor.requests.get"));

        assert_eq!(
            fs::read_to_string(destination.path().join(".gitignore")).expect("gitignore written"),
            "*\n"
        );
    }

    #[test]
    fn rejects_vendor_name_colliding_with_existing_submodule() {
        let source_root = tempdir().expect("tempdir");
        write(source_root.path(), "app/__init__.py", "");
        write(source_root.path(), "app/_vendor.py", "");

        let destination = tempdir().expect("tempdir");
        let service = ModuleSpecService::new(vec![source_root.path().to_path_buf()], Fqn::new("app"));

        let result = bundle(
            &service,
            &Fqn::new("app"),
            destination.path(),
            "_vendor",
            false,
            &[],
            &ImportAliasMap::new(),
            &NoopEventHandler,
        );
        assert!(matches!(result, Err(BundleshakeError::InvalidConfiguration(_))));
    }

    #[test]
    fn rejects_dotted_vendor_name() {
        let source_root = tempdir().expect("tempdir");
        write(source_root.path(), "app/__init__.py", "");
        let destination = tempdir().expect("tempdir");
        let service = ModuleSpecService::new(vec![source_root.path().to_path_buf()], Fqn::new("app"));

        let result = bundle(
            &service,
            &Fqn::new("app"),
            destination.path(),
            "a.b",
            false,
            &[],
            &ImportAliasMap::new(),
            &NoopEventHandler,
        );
        assert!(matches!(result, Err(BundleshakeError::InvalidConfiguration(_))));
    }
}

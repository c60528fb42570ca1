//! Resource copier (spec §4.8): copy collaborator directories verbatim
//! alongside the rewritten tree `bundle()` produces - package metadata
//! (`*.dist-info`/`*.egg-info`) and native-extension `.libs` companion
//! directories neither C4 discovers (they contain no importable Python) nor
//! C5 rewrites (nothing inside them is source code).
//!
//! Grounded in `flay.cli.bundle.cli_bundle_package`'s `resources: dict[str,
//! str]` parameter (arbitrary source-to-destination directory copies
//! supplied by the caller, not discovered by the bundler itself) and the
//! `.libs`-directory handling implicit in shipping `auditwheel`/`delvewheel`
//! repaired wheels, which `bundle()`'s native-extension handling mirrors
//! (spec §4.8, scenario S8: a missing `.libs` directory is a warning, not a
//! hard error, since not every extension has one).

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::event::{Event, EventSink};

/// A directory-copying collaborator invoked as part of `bundle()`'s
/// resource-copying step.
pub trait ResourceCopier {
    /// Copy whatever this collaborator is responsible for.
    ///
    /// # Errors
    /// Propagates the first I/O failure encountered while copying.
    fn copy(&self, sink: &dyn EventSink) -> Result<()>;
}

/// Copies a fixed list of `(source, destination)` directory pairs verbatim.
/// Used for `*.dist-info`/`*.egg-info` metadata directories, whose
/// selection is the caller's policy (spec §4.8: "the core does not decide
/// which directories count as package metadata").
pub struct DistInfoCopier {
    /// `(source directory, destination directory)` pairs, both absolute.
    pub pairs: Vec<(PathBuf, PathBuf)>,
}

impl ResourceCopier for DistInfoCopier {
    fn copy(&self, _sink: &dyn EventSink) -> Result<()> {
        for (source, destination) in &self.pairs {
            if source.is_dir() {
                copy_dir_recursive(source, destination)?;
            }
        }
        Ok(())
    }
}

/// Copies native-extension `.libs` companion directories, warning rather
/// than failing when one is absent (not every vendored extension carries
/// one).
pub struct NativeLibsCopier {
    /// `(source `.libs` directory, destination directory)` pairs, both
    /// absolute.
    pub pairs: Vec<(PathBuf, PathBuf)>,
}

impl ResourceCopier for NativeLibsCopier {
    fn copy(&self, sink: &dyn EventSink) -> Result<()> {
        for (source, destination) in &self.pairs {
            if !source.is_dir() {
                sink.on_event(Event::Warning {
                    message: format!("no .libs directory found at {}", source.display()),
                });
                continue;
            }
            copy_dir_recursive(source, destination)?;
        }
        Ok(())
    }
}

/// Recursively copy `source` into `destination`, creating directories as
/// needed. Existing files at `destination` are overwritten.
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<()> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        if from.is_dir() {
            copy_dir_recursive(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NoopEventHandler;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn dist_info_copier_copies_nested_directory() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("requests-2.31.0.dist-info");
        fs::create_dir_all(&source).expect("mkdir");
        fs::write(source.join("METADATA"), "Name: requests\n").expect("write");
        fs::create_dir_all(source.join("licenses")).expect("mkdir");
        fs::write(source.join("licenses/LICENSE"), "Apache-2.0\n").expect("write");

        let destination = temp.path().join("out/requests-2.31.0.dist-info");
        let copier = DistInfoCopier {
            pairs: vec![(source, destination.clone())],
        };
        copier.copy(&NoopEventHandler).expect("copies");

        assert!(destination.join("METADATA").is_file());
        assert!(destination.join("licenses/LICENSE").is_file());
    }

    #[test]
    fn native_libs_copier_warns_instead_of_failing_when_missing() {
        let temp = tempdir().expect("tempdir");
        let missing_source = temp.path().join("pkg.libs");
        let destination = temp.path().join("out/pkg.libs");

        let warnings = std::cell::RefCell::new(Vec::new());
        let sink = |event: Event| {
            if let Event::Warning { message } = event {
                warnings.borrow_mut().push(message);
            }
        };

        let copier = NativeLibsCopier {
            pairs: vec![(missing_source, destination.clone())],
        };
        copier.copy(&sink).expect("missing .libs is not an error");

        assert!(!destination.exists());
        assert_eq!(warnings.borrow().len(), 1);
        assert!(warnings.borrow()[0].contains(".libs"));
    }

    #[test]
    fn native_libs_copier_copies_present_directory() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("pkg.libs");
        fs::create_dir_all(&source).expect("mkdir");
        fs::write(source.join("libfoo.so"), b"\0").expect("write");

        let destination = temp.path().join("out/pkg.libs");
        let copier = NativeLibsCopier {
            pairs: vec![(source, destination.clone())],
        };
        copier.copy(&NoopEventHandler).expect("copies");

        assert!(destination.join("libfoo.so").is_file());
    }
}

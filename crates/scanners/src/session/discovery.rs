use crate::core::{AuditError, Diagnostic, DiagnosticKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "lib", "out", "cache"];

/// Source files under `root`, sorted by path, plus input diagnostics for
/// entries that could not be walked or a directory with nothing to audit.
///
/// A file given directly is returned as is, whatever its extension. In a
/// directory only files with one of `extensions` are collected, and
/// dependency or build folders are not descended into.
pub fn discover_sources(
    root: &Path,
    extensions: &[String],
) -> Result<(Vec<PathBuf>, Vec<Diagnostic>), AuditError> {
    if !root.exists() {
        return Err(AuditError::FatalInput {
            path: root.to_path_buf(),
            reason: "path does not exist".to_string(),
        });
    }

    if root.is_file() {
        return Ok((vec![root.to_path_buf()], Vec::new()));
    }

    let mut files = Vec::new();
    let mut diagnostics = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && e.file_name()
                        .to_str()
                        .map_or(false, |name| SKIPPED_DIRS.contains(&name)))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                let path = e.path().unwrap_or(root);
                diagnostics.push(
                    Diagnostic::new(DiagnosticKind::Input, format!("cannot walk entry: {}", e))
                        .with_path(path.display().to_string()),
                );
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| extensions.iter().any(|e| e == ext));
        if matches {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    debug!("Found {} source file(s) under {}", files.len(), root.display());
    if files.is_empty() {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::Input,
                format!(
                    "no source files with extensions [{}] found",
                    extensions.join(", ")
                ),
            )
            .with_path(root.display().to_string()),
        );
    }
    Ok((files, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_directory_is_walked_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("b/Z.sol"), "").unwrap();
        fs::write(dir.path().join("A.sol"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();
        fs::write(dir.path().join("node_modules/pkg/Dep.sol"), "").unwrap();

        let (files, diagnostics) = discover_sources(dir.path(), &["sol".to_string()]).unwrap();
        assert!(diagnostics.is_empty());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("A.sol"), PathBuf::from("b/Z.sol")]);
    }

    #[test]
    fn test_missing_path_is_fatal() {
        let err = discover_sources(Path::new("/definitely/not/here"), &["sol".to_string()])
            .unwrap_err();
        assert!(matches!(err, AuditError::FatalInput { .. }));
    }

    #[test]
    fn test_single_file_is_taken_as_is() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let (files, diagnostics) = discover_sources(file.path(), &["sol".to_string()]).unwrap();
        assert_eq!(files, vec![file.path().to_path_buf()]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_directory_without_sources_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "# nothing here").unwrap();

        let (files, diagnostics) = discover_sources(dir.path(), &["sol".to_string()]).unwrap();
        assert!(files.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Input);
        assert_eq!(diagnostics[0].path.as_deref(), Some(dir.path().display().to_string().as_str()));
        assert!(diagnostics[0].message.contains("[sol]"));
    }
}

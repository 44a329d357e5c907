//! Source file discovery.

use std::path::{Path, PathBuf};

use genesis_config::ProjectSection;
use walkdir::{DirEntry, WalkDir};

use crate::error::CacheError;

/// Lists the sources of the project rooted at `root`: files under
/// `project.source_dir` with one of `project.extensions`.
///
/// Relative directories resolve against `root`. Nothing under
/// `project.output_dir` is listed, so generated files never count as
/// sources when the output lives inside the source tree.
pub fn discover_project(root: &Path, project: &ProjectSection) -> Result<Vec<PathBuf>, CacheError> {
    let source_dir = root.join(&project.source_dir);
    let output_dir = root.join(&project.output_dir);
    walk(&source_dir, &project.extensions, Some(&output_dir))
}

/// Lists every file under `root` whose extension is one of `extensions`.
///
/// Hidden directories (the cache directory among them) are not entered.
/// The result is sorted so change detection sees a stable order.
pub fn discover_sources(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, CacheError> {
    walk(root, extensions, None)
}

fn walk(root: &Path, extensions: &[String], exclude: Option<&Path>) -> Result<Vec<PathBuf>, CacheError> {
    std::fs::metadata(root).map_err(|e| CacheError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !(is_hidden(e) || exclude.is_some_and(|x| e.path().starts_with(x)))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| extensions.iter().any(|x| x == ext))
        })
        .map(DirEntry::into_path)
        .collect();
    files.sort();
    tracing::debug!(root = %root.display(), files = files.len(), "discovered sources");
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sources_sorted_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("nested/deeper")).unwrap();
        std::fs::create_dir_all(root.join(".genesis")).unwrap();
        std::fs::write(root.join("b.gen"), "").unwrap();
        std::fs::write(root.join("a.gen"), "").unwrap();
        std::fs::write(root.join("notes.md"), "").unwrap();
        std::fs::write(root.join("nested/deeper/c.gen"), "").unwrap();
        std::fs::write(root.join(".genesis/stale.gen"), "").unwrap();

        let files = discover_sources(root, &["gen".to_string()]).unwrap();
        assert_eq!(
            files,
            vec![
                root.join("a.gen"),
                root.join("b.gen"),
                root.join("nested/deeper/c.gen"),
            ]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_sources(&dir.path().join("absent"), &["gen".to_string()]).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }

    #[test]
    fn project_skips_output_inside_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("dist")).unwrap();
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join("main.gen"), "").unwrap();
        std::fs::write(root.join("lib/util.gn"), "").unwrap();
        std::fs::write(root.join("lib/skip.gen"), "").unwrap();
        std::fs::write(root.join("dist/main.gen"), "").unwrap();

        let project = ProjectSection {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("./dist"),
            extensions: vec!["gen".to_string(), "gn".to_string()],
        };
        let files = discover_project(root, &project).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("lib/skip.gen"),
                PathBuf::from("lib/util.gn"),
                PathBuf::from("main.gen"),
            ]
        );
    }
}

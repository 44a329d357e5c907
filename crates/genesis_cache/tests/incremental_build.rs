//! A full incremental build cycle on a real directory: configure, discover,
//! detect, record, save, edit, and detect again from a fresh process state.

use std::path::Path;

use genesis_cache::{discover_project, ChangeDetector, ChangeType, CompilationCache, DetectorConfig};
use genesis_config::load_config_from_str;

const CONFIG: &str = r#"
[project]
source_dir = "src"
output_dir = "src/generated"
extensions = ["gen"]

[cache]
path = ".genesis/cache.json"
declaration_keywords = ["function", "component"]
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn detector(root: &Path) -> ChangeDetector {
    let config = load_config_from_str(CONFIG).unwrap();
    ChangeDetector::new(DetectorConfig::from(&config.cache).rooted_at(root))
}

fn sources(root: &Path) -> Vec<std::path::PathBuf> {
    let config = load_config_from_str(CONFIG).unwrap();
    discover_project(root, &config.project).unwrap()
}

#[test]
fn edit_delete_and_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "src/ui.gen",
        "component Button {\n  Render a Label.\n}\n\ncomponent Label {\n  Show text.\n}\n",
    );
    write(root, "src/app.gen", "import ./ui\n\nfunction main {\n  Show a Button.\n}\n");
    write(root, "src/old.gen", "function legacy {\n}\n");
    write(root, "src/generated/app.gen", "function stale {\n}\n");

    // First build: no cache on disk.
    let mut det = detector(root);
    let files = sources(root);
    assert_eq!(files.len(), 3);
    let changes = det.detect_changes(&files);
    assert_eq!(changes.added().count(), 3);
    det.apply(&changes).unwrap();
    det.save().unwrap();
    assert!(root.join(".genesis/cache.json").exists());

    // Nothing changed.
    let det = detector(root);
    assert!(det.detect_changes(&sources(root)).is_empty());
    let app = det.cache().file(&root.join("src/app.gen")).unwrap();
    assert_eq!(app.imports, vec!["./ui"]);

    // Edit Label, remove old.gen.
    write(
        root,
        "src/ui.gen",
        "component Button {\n  Render a Label.\n}\n\ncomponent Label {\n  Show bold text.\n}\n",
    );
    std::fs::remove_file(root.join("src/old.gen")).unwrap();

    let mut det = detector(root);
    let changes = det.detect_changes(&sources(root));
    assert_eq!(changes.len(), 2);
    let modified: Vec<_> = changes.modified().collect();
    assert_eq!(modified.len(), 1);
    assert_eq!(modified[0].file_path, root.join("src/ui.gen"));
    let edited: Vec<_> = modified[0]
        .changed_elements
        .iter()
        .map(|e| (e.name.as_str(), e.change_type))
        .collect();
    assert_eq!(edited, vec![("Label", ChangeType::Modified)]);

    let deleted: Vec<_> = changes.deleted().collect();
    assert_eq!(deleted[0].file_path, root.join("src/old.gen"));
    assert_eq!(deleted[0].changed_elements[0].name, "legacy");

    // Label is only used inside ui.gen, so nothing else is affected.
    let affected: Vec<_> = changes.affected_files(&det).into_iter().collect();
    assert_eq!(affected, vec![root.join("src/ui.gen")]);

    det.apply(&changes).unwrap();
    det.save().unwrap();

    // Button changes reach app.gen, which mentions it.
    write(
        root,
        "src/ui.gen",
        "component Button {\n  Render a Label with an Icon.\n}\n\ncomponent Label {\n  Show bold text.\n}\n",
    );
    let det = detector(root);
    let changes = det.detect_changes(&sources(root));
    let affected: Vec<_> = changes.affected_files(&det).into_iter().collect();
    assert_eq!(affected, vec![root.join("src/app.gen"), root.join("src/ui.gen")]);
}

#[test]
fn corrupt_cache_means_full_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/a.gen", "function a {\n}\n");
    write(root, ".genesis/cache.json", "{\"version\": \"1.0.0\", \"files\": 42}");

    assert!(CompilationCache::read(&root.join(".genesis/cache.json")).is_err());
    let det = detector(root);
    let changes = det.detect_changes(&sources(root));
    assert_eq!(changes.len(), 1);
    assert!(changes.iter().all(|c| c.change_type == ChangeType::Added));
}

#[test]
fn saved_cache_round_trips_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/a.gen", "function a {\n  call(Thing)\n}\n");

    let mut det = detector(root);
    let changes = det.detect_changes(&sources(root));
    det.apply(&changes).unwrap();
    det.save().unwrap();

    let on_disk = CompilationCache::read(&root.join(".genesis/cache.json")).unwrap();
    assert_eq!(&on_disk, det.cache());
    let element = &on_disk.files[&root.join("src/a.gen")].elements["a"];
    assert_eq!(element.dependencies, vec!["Thing", "call"]);
    assert_eq!((element.start_line, element.end_line), (1, 3));
}

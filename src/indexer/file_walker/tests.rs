//! Tests for FileWalker

use super::*;
use std::fs;
use tempfile::TempDir;

fn relative_paths(files: &[SourceFile]) -> Vec<&str> {
    files.iter().map(|f| f.relative_path.as_str()).collect()
}

#[test]
fn test_new_defaults() {
    let walker = FileWalker::new("/tmp", 1024);
    assert_eq!(walker.root, PathBuf::from("/tmp"));
    assert_eq!(walker.max_file_size, 1024);
    assert_eq!(walker.extensions, vec!["py"]);
    assert_eq!(walker.exclude_dirs, vec!["__pycache__", "venv"]);
    assert!(!walker.respect_gitignore);
}

#[test]
fn test_with_extensions_normalizes() {
    let walker = FileWalker::new("/tmp", 1024).with_extensions(vec![".PY".to_string()]);
    assert_eq!(walker.extensions, vec!["py"]);
}

#[test]
fn test_from_config() {
    let config = ScannerConfig {
        extensions: vec!["pyw".to_string()],
        exclude_dirs: vec!["build".to_string()],
        max_file_size: 10,
        respect_gitignore: true,
    };
    let walker = FileWalker::from_config("/tmp", &config);
    assert_eq!(walker.extensions, vec!["pyw"]);
    assert_eq!(walker.exclude_dirs, vec!["build"]);
    assert_eq!(walker.max_file_size, 10);
    assert!(walker.respect_gitignore);
}

#[test]
fn test_walk_nonexistent_directory() {
    let walker = FileWalker::new("/nonexistent/path/12345", 1024);
    let result = walker.walk();
    assert!(matches!(result, Err(NotFoundError::Directory(_))));
}

#[test]
fn test_walk_not_a_directory() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("module.py");
    fs::write(&file_path, "x = 1").unwrap();

    let walker = FileWalker::new(&file_path, 1024);
    let result = walker.walk();
    assert!(matches!(result, Err(NotFoundError::NotADirectory(_))));
}

#[test]
fn test_walk_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_walk_only_python_files() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("app.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();
    fs::write(temp_dir.path().join("lib.rs"), "fn main() {}").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(relative_paths(&files), vec!["app.py"]);
}

#[test]
fn test_walk_nested_relative_paths() {
    let temp_dir = TempDir::new().unwrap();
    let pkg = temp_dir.path().join("pkg").join("sub");
    fs::create_dir_all(&pkg).unwrap();
    fs::write(temp_dir.path().join("main.py"), "x = 1").unwrap();
    fs::write(pkg.join("util.py"), "y = 2").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    let mut paths = relative_paths(&files);
    paths.sort();
    assert_eq!(paths, vec!["main.py", "pkg/sub/util.py"]);

    let util = files
        .iter()
        .find(|f| f.relative_path == "pkg/sub/util.py")
        .unwrap();
    assert_eq!(util.path, pkg.join("util.py"));
    assert_eq!(util.size, 5);
}

#[test]
fn test_walk_skips_excluded_and_hidden_dirs() {
    let temp_dir = TempDir::new().unwrap();
    for dir in ["__pycache__", "venv", ".git", ".tox", "src"] {
        let path = temp_dir.path().join(dir);
        fs::create_dir(&path).unwrap();
        fs::write(path.join("mod.py"), "x = 1").unwrap();
    }

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(relative_paths(&files), vec!["src/mod.py"]);
}

#[test]
fn test_walk_keeps_hidden_files() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".startup.py"), "x = 1").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(relative_paths(&files), vec![".startup.py"]);
}

#[test]
fn test_walk_custom_exclude_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let build = temp_dir.path().join("build");
    fs::create_dir(&build).unwrap();
    fs::write(build.join("gen.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("keep.py"), "x = 1").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024)
        .with_exclude_dirs(vec!["build".to_string()])
        .walk()
        .unwrap();
    assert_eq!(relative_paths(&files), vec!["keep.py"]);
}

#[test]
fn test_walk_ignores_gitignore_by_default() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".gitignore"), "ignored.py\n").unwrap();
    fs::write(temp_dir.path().join("ignored.py"), "x = 1").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(relative_paths(&files), vec!["ignored.py"]);

    let files = FileWalker::new(temp_dir.path(), 1024)
        .with_gitignore(true)
        .walk()
        .unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_walk_max_file_size() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("small.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("large.py"), "a".repeat(2000)).unwrap();

    let files = FileWalker::new(temp_dir.path(), 100).walk().unwrap();
    assert_eq!(relative_paths(&files), vec!["small.py"]);
}

#[test]
fn test_walk_is_sorted_by_name() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["c.py", "a.py", "b.py"] {
        fs::write(temp_dir.path().join(name), "x = 1").unwrap();
    }

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(relative_paths(&files), vec!["a.py", "b.py", "c.py"]);
}

#[test]
fn test_source_file_language() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.py"), "x = 1").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(
        files[0].language(),
        Some(crate::indexer::SourceLanguage::Python)
    );
}

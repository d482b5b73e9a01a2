//! Finding Lua files and loading them with their syntax trees.
use lualint_config::LintConfig;
use lualint_linter::{retry_with_backoff, LintError, RetryPolicy};
use lualint_syntax::{JsonTreeParser, Parse, Tree};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const LUA_EXTENSIONS: &[&str] = &["lua", "luau"];

/// A source file and the tree its sidecar describes
pub struct SourceFile {
    pub path: PathBuf,
    /// Path as reported in output
    pub display: String,
    pub source: String,
    pub tree: Tree,
}

fn is_lua_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| LUA_EXTENSIONS.contains(&ext))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Collect the Lua files under `roots`, sorted and deduplicated.
///
/// Directories are walked (skipping hidden entries) and filtered by the
/// config's include/exclude globs, matched relative to `base_dir`. Files
/// named explicitly are always linted.
#[tracing::instrument(skip_all, fields(roots = roots.len()))]
pub fn discover_files(roots: &[PathBuf], config: &LintConfig, base_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for root in roots {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such file or directory", root.display()),
            ));
        }

        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_lua_file(entry.path()) {
                continue;
            }
            let absolute = std::path::absolute(entry.path())?;
            let rel_path = absolute.strip_prefix(base_dir).unwrap_or(&absolute);
            if config.matches_path(rel_path) {
                files.push(entry.into_path());
            } else {
                tracing::trace!(path = %rel_path.display(), "Skipped by config globs");
            }
        }
    }

    files.sort();
    files.dedup();
    tracing::debug!(count = files.len(), "Discovered files");
    Ok(files)
}

/// `init.lua` + `.ast.json` -> `init.lua.ast.json`
#[must_use]
pub fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Read a source file and parse its sidecar tree
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_source_file(path: &Path, tree_suffix: &str) -> Result<SourceFile, LintError> {
    let display = path.display().to_string();
    let source = read_file(path)?;

    let tree_path = sidecar_path(path, tree_suffix);
    let tree_json = read_file(&tree_path)?;
    let tree = JsonTreeParser
        .parse(&tree_json)
        .map_err(|e| LintError::from(e).with_file(tree_path.display().to_string()))?;

    Ok(SourceFile {
        path: path.to_path_buf(),
        display,
        source,
        tree,
    })
}

pub fn read_file(path: &Path) -> Result<String, LintError> {
    retry_with_backoff(RetryPolicy::default(), || {
        fs::read_to_string(path).map_err(|e| LintError::from(e).with_file(path.display().to_string()))
    })
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), LintError> {
    retry_with_backoff(RetryPolicy::default(), || {
        fs::write(path, contents).map_err(|e| LintError::from(e).with_file(path.display().to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lualint_linter::ErrorKind;

    const EMPTY_TREE: &str = r#"{ "body": [] }"#;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_sidecar_path_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("src/init.lua"), ".ast.json"),
            PathBuf::from("src/init.lua.ast.json")
        );
    }

    #[test]
    fn test_discovers_lua_and_luau_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(&root.join("init.lua"));
        touch(&root.join("src/net/client.luau"));
        touch(&root.join("src/net/client.luau.ast.json"));
        touch(&root.join("README.md"));
        touch(&root.join(".git/hooks/pre-commit.lua"));

        let files = discover_files(&[root.to_path_buf()], &LintConfig::default(), root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["init.lua", "src/net/client.luau"]);
    }

    #[test]
    fn test_discovery_applies_exclude_globs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = std::path::absolute(temp_dir.path()).unwrap();
        touch(&root.join("src/main.lua"));
        touch(&root.join("vendor/lib.lua"));

        let config = LintConfig {
            exclude: vec!["vendor/**".to_string()],
            ..LintConfig::default()
        };
        let files = discover_files(&[root.clone()], &config, &root).unwrap();
        assert_eq!(files, vec![root.join("src/main.lua")]);
    }

    #[test]
    fn test_explicit_file_bypasses_globs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = std::path::absolute(temp_dir.path()).unwrap();
        let file = root.join("vendor/lib.lua");
        touch(&file);

        let config = LintConfig {
            exclude: vec!["vendor/**".to_string()],
            ..LintConfig::default()
        };
        let files = discover_files(&[file.clone()], &config, &root).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nope");
        let err = discover_files(&[missing], &LintConfig::default(), temp_dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_load_source_file_reads_sidecar() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("init.lua");
        fs::write(&path, "").unwrap();
        fs::write(sidecar_path(&path, ".ast.json"), EMPTY_TREE).unwrap();

        let file = load_source_file(&path, ".ast.json").unwrap();
        assert!(file.tree.body.is_empty());
        assert_eq!(file.source, "");
    }

    #[test]
    fn test_missing_sidecar_is_file_system_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("init.lua");
        fs::write(&path, "").unwrap();

        let err = load_source_file(&path, ".ast.json").err().unwrap();
        assert_eq!(err.kind, ErrorKind::FileSystemError);
        assert!(err.context.file.unwrap().ends_with("init.lua.ast.json"));
    }

    #[test]
    fn test_malformed_sidecar_is_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("init.lua");
        fs::write(&path, "").unwrap();
        fs::write(sidecar_path(&path, ".ast.json"), "{ not json").unwrap();

        let err = load_source_file(&path, ".ast.json").err().unwrap();
        assert_eq!(err.kind, ErrorKind::ParseError);
    }
}

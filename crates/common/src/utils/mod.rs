use crate::config::error::ConfigError;
use crate::traits::IsFileExtension;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file below `dir`, sorted so staging order is stable.
pub fn files_under(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::not_found(format!(
            "directory '{}' does not exist",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Files below `dir` carrying the given extension.
pub fn paths_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, ConfigError> {
    Ok(files_under(dir)?
        .into_iter()
        .filter(|p| p.is_extension(ext))
        .collect())
}

/// Resolve a path from a pipeline definition relative to the definition's
/// own directory.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walks_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("lib")).unwrap();
        fs::write(tmp.path().join("main.py"), "print(1)").unwrap();
        fs::write(tmp.path().join("lib/util.py"), "").unwrap();
        fs::write(tmp.path().join("lib/schema.sql"), "").unwrap();

        let files = files_under(tmp.path()).unwrap();
        assert_eq!(files.len(), 3);
        let sql = paths_with_ext(tmp.path(), "sql").unwrap();
        assert_eq!(sql, vec![tmp.path().join("lib/schema.sql")]);
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let root = Path::new("/pipelines");
        assert_eq!(resolve_path(root, Path::new("sql/a.sql")), PathBuf::from("/pipelines/sql/a.sql"));
        assert_eq!(resolve_path(root, Path::new("/abs/a.sql")), PathBuf::from("/abs/a.sql"));
    }
}

//! Working-tree tools, confined to the cohort repository root.
//!
//! A requested path is checked lexically before the filesystem is touched,
//! then canonicalized and checked again so symlinks cannot lead outside.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::tools::ToolError;
use crate::tools::listing::{cap_entries, is_noise, read_capped, sized_entry, truncate_text};

/// Resolve `requested` under `root`, refusing anything that escapes it.
pub fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, ToolError> {
    let escape = || ToolError::PathEscapesRoot(requested.to_string());

    let mut relative = PathBuf::new();
    for component in Path::new(requested.trim()).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(escape());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }

    let root = root
        .canonicalize()
        .map_err(|err| ToolError::Io(format!("repository root unavailable: {err}")))?;
    let candidate = root.join(&relative);
    let resolved = match candidate.canonicalize() {
        Ok(path) => path,
        Err(_) => return Err(ToolError::NotFound(requested.to_string())),
    };
    if !resolved.starts_with(&root) {
        warn!(requested, "path escapes repository root");
        return Err(escape());
    }
    Ok(resolved)
}

pub fn read_file(
    root: &Path,
    filepath: &str,
    max_lines: usize,
    max_bytes: usize,
) -> Result<String, ToolError> {
    let full = resolve_within(root, filepath)?;
    info!(path = %full.display(), "read_local_file");
    if !full.is_file() {
        return Err(ToolError::NotFound(filepath.to_string()));
    }
    let file = fs::File::open(&full).map_err(|err| ToolError::Io(err.to_string()))?;
    let bytes = read_capped(file, max_bytes).map_err(|err| ToolError::Io(err.to_string()))?;
    Ok(truncate_text(&String::from_utf8_lossy(&bytes), max_lines, max_bytes))
}

pub fn list_directory(root: &Path, dirpath: &str, max_entries: usize) -> Result<String, ToolError> {
    let full = resolve_within(root, dirpath)?;
    info!(path = %full.display(), "list_local_directory");
    if !full.is_dir() {
        return Err(ToolError::NotFound(dirpath.to_string()));
    }
    let root = root
        .canonicalize()
        .map_err(|err| ToolError::Io(err.to_string()))?;
    let entries = sized_files_under(&full, &root)?;
    if entries.is_empty() {
        return Err(ToolError::EmptyListing("directory is empty"));
    }
    Ok(cap_entries(entries, max_entries))
}

/// Regular files under `dir`, as sized listing lines relative to `base`,
/// sorted by path. Symlinks are not followed.
pub(crate) fn sized_files_under(dir: &Path, base: &Path) -> Result<Vec<String>, ToolError> {
    let mut files: Vec<(String, u64)> = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|err| ToolError::Io(err.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(base) else {
            continue;
        };
        let rel = rel.to_string_lossy().into_owned();
        if is_noise(&rel) {
            continue;
        }
        let size = entry
            .metadata()
            .map_err(|err| ToolError::Io(err.to_string()))?
            .len();
        files.push((rel, size));
    }
    files.sort();
    Ok(files
        .into_iter()
        .map(|(rel, size)| sized_entry(&rel, size))
        .collect())
}

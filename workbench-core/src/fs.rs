// workbench-core/src/fs.rs

//! File and folder operations confined to the workspace root.

use crate::errors::{Result, WorkbenchError};
use crate::format::preview;
use crate::workspace::Workspace;
use ignore::{DirEntry, WalkBuilder};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Hits returned by the search operations before they stop walking.
pub const MAX_SEARCH_RESULTS: usize = 200;

pub async fn read_file(workspace: &Workspace, name: &str) -> Result<String> {
    let path = workspace.resolve(name)?;
    info!("Reading file: {}", preview(name, 60));
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| WorkbenchError::io(&path, e))?;
    debug!("Read {} bytes from {}", content.len(), preview(name, 60));
    Ok(content)
}

/// Writes `content` to `name`, creating parent directories as needed.
/// Returns the path relative to the root.
pub async fn write_file(workspace: &Workspace, name: &str, content: &str) -> Result<String> {
    let path = workspace.resolve(name)?;
    if path == workspace.root() {
        return Err(WorkbenchError::invalid_path("cannot write to the workspace root"));
    }
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            debug!("Creating parent directory: {:?}", parent);
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkbenchError::io(parent, e))?;
        }
    }
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| WorkbenchError::io(&path, e))?;
    let relative = workspace.relative(&path);
    info!("Wrote {} bytes to {}", content.len(), relative);
    Ok(relative)
}

pub async fn delete_file(workspace: &Workspace, name: &str) -> Result<String> {
    let path = workspace.resolve(name)?;
    if !path.is_file() {
        return Err(WorkbenchError::invalid_path(format!("'{}' is not a file", name)));
    }
    tokio::fs::remove_file(&path)
        .await
        .map_err(|e| WorkbenchError::io(&path, e))?;
    let relative = workspace.relative(&path);
    info!("Deleted file {}", relative);
    Ok(relative)
}

pub async fn create_folder(workspace: &Workspace, name: &str) -> Result<String> {
    let path = workspace.resolve(name)?;
    tokio::fs::create_dir_all(&path)
        .await
        .map_err(|e| WorkbenchError::io(&path, e))?;
    let relative = workspace.relative(&path);
    info!("Created folder {}", relative);
    Ok(relative)
}

pub async fn delete_folder(workspace: &Workspace, name: &str) -> Result<String> {
    let path = workspace.resolve(name)?;
    if path == workspace.root() {
        return Err(WorkbenchError::invalid_path("refusing to delete the workspace root"));
    }
    if !path.is_dir() {
        return Err(WorkbenchError::invalid_path(format!("'{}' is not a directory", name)));
    }
    tokio::fs::remove_dir_all(&path)
        .await
        .map_err(|e| WorkbenchError::io(&path, e))?;
    let relative = workspace.relative(&path);
    info!("Deleted folder {}", relative);
    Ok(relative)
}

/// Recursively copies `name` to `new_name`, which must not exist yet.
/// Returns the destination relative to the root.
pub async fn copy_folder(workspace: &Workspace, name: &str, new_name: &str) -> Result<String> {
    let source = workspace.resolve(name)?;
    let destination = workspace.resolve(new_name)?;
    if !source.is_dir() {
        return Err(WorkbenchError::invalid_path(format!("'{}' is not a directory", name)));
    }
    if destination.exists() {
        return Err(WorkbenchError::invalid_path(format!("'{}' already exists", new_name)));
    }
    if destination.starts_with(&source) {
        return Err(WorkbenchError::invalid_path(format!(
            "cannot copy '{}' into itself",
            name
        )));
    }
    info!(
        "Copying folder {} to {}",
        workspace.relative(&source),
        workspace.relative(&destination)
    );
    let (src, dst) = (source.clone(), destination.clone());
    tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
        .await
        .map_err(|e| WorkbenchError::io(&source, std::io::Error::other(e)))??;
    Ok(workspace.relative(&destination))
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination).map_err(|e| WorkbenchError::io(destination, e))?;
    let entries = fs::read_dir(source).map_err(|e| WorkbenchError::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| WorkbenchError::io(source, e))?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| WorkbenchError::io(&from, e))?;
        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| WorkbenchError::io(&from, e))?;
        }
    }
    Ok(())
}

fn walker(start: &Path, max_depth: Option<usize>) -> ignore::Walk {
    let mut builder = WalkBuilder::new(start);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .parents(true)
        .require_git(false)
        .max_depth(max_depth)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| entry.file_name() != ".git");
    builder.build()
}

fn is_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|ft| ft.is_dir())
}

/// Lists the immediate children of `name` (the root when `None`), one per
/// line, directories suffixed with `/`.
pub fn list_dir(workspace: &Workspace, name: Option<&str>) -> Result<String> {
    let start = workspace.resolve(name.unwrap_or("."))?;
    if !start.is_dir() {
        return Err(WorkbenchError::invalid_path(format!(
            "'{}' is not a directory",
            name.unwrap_or(".")
        )));
    }
    debug!("Listing directory {:?}", start);

    let mut lines = Vec::new();
    for result in walker(&start, Some(1)) {
        match result {
            Ok(entry) if entry.depth() == 0 => continue,
            Ok(entry) => {
                let mut line = entry.file_name().to_string_lossy().into_owned();
                if is_dir(&entry) {
                    line.push('/');
                }
                lines.push(line);
            }
            Err(err) => debug!("Warning during directory walk: {}", err),
        }
    }
    Ok(lines.join("\n"))
}

/// Compiles `pattern`, honoring `i` (ignore case), `m` (multi-line) and
/// `s` (dot matches newline). `g` and `u` are accepted and ignored.
pub fn build_pattern(pattern: &str, flags: Option<&str>) -> Result<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or("").chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'g' | 'u' => {}
            other => {
                return Err(WorkbenchError::invalid_argument(format!(
                    "unsupported regex flag '{}'",
                    other
                )))
            }
        }
    }
    builder.build().map_err(|source| WorkbenchError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Relative paths of files and folders whose name matches `pattern`.
pub fn search_entries(workspace: &Workspace, pattern: &str, flags: Option<&str>) -> Result<Vec<String>> {
    let regex = build_pattern(pattern, flags)?;
    info!("Searching entry names for /{}/", preview(pattern, 60));

    let mut hits = Vec::new();
    for entry in walker(workspace.root(), None).flatten() {
        if entry.depth() == 0 {
            continue;
        }
        if regex.is_match(&entry.file_name().to_string_lossy()) {
            let mut relative = workspace.relative(entry.path());
            if is_dir(&entry) {
                relative.push('/');
            }
            hits.push(relative);
            if hits.len() >= MAX_SEARCH_RESULTS {
                warn!("Entry search stopped at {} results", MAX_SEARCH_RESULTS);
                break;
            }
        }
    }
    Ok(hits)
}

/// `path:line:text` for every line matching `pattern` in files under `path`.
/// Files that are not valid UTF-8 are skipped.
pub fn search_content(
    workspace: &Workspace,
    pattern: &str,
    flags: Option<&str>,
    path: Option<&str>,
) -> Result<Vec<String>> {
    let regex = build_pattern(pattern, flags)?;
    let start = workspace.resolve(path.unwrap_or("."))?;
    if !start.exists() {
        return Err(WorkbenchError::invalid_path(format!(
            "'{}' does not exist",
            path.unwrap_or(".")
        )));
    }
    info!(
        "Searching file contents for /{}/ under {}",
        preview(pattern, 60),
        workspace.relative(&start)
    );

    let mut hits = Vec::new();
    'files: for entry in walker(&start, None).flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(content) = fs::read_to_string(entry.path()) else {
            debug!("Skipping unreadable or binary file {:?}", entry.path());
            continue;
        };
        let relative = workspace.relative(entry.path());
        for (index, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                hits.push(format!("{}:{}:{}", relative, index + 1, line));
                if hits.len() >= MAX_SEARCH_RESULTS {
                    warn!("Content search stopped at {} results", MAX_SEARCH_RESULTS);
                    break 'files;
                }
            }
        }
    }
    Ok(hits)
}

use crate::utils::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Removes everything inside `dir` but keeps the directory itself.
pub fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Empties `dir` if present, then makes sure it exists.
pub fn reset_dir(dir: &Path) -> Result<()> {
    clear_dir(dir)?;
    fs::create_dir_all(dir)?;
    Ok(())
}

pub fn prepare_temp_dir(root: &Path, clean: bool) -> Result<PathBuf> {
    if clean {
        clear_dir(root)?;
    }
    fs::create_dir_all(root)?;
    Ok(root.to_path_buf())
}

/// Mirrors the input's directory below `output_dir` when the input lives
/// under `input_prefix`; otherwise everything lands in `output_dir`.
pub fn output_dir_for(output_dir: &Path, input: &Path, input_prefix: Option<&Path>) -> PathBuf {
    let relative = input_prefix
        .and_then(|prefix| input.parent()?.strip_prefix(prefix).ok())
        .filter(|rel| !rel.as_os_str().is_empty());

    match relative {
        Some(rel) => output_dir.join(rel),
        None => output_dir.to_path_buf(),
    }
}

/// Files in `dir` with the given extension (case-insensitive), sorted by name.
pub fn list_files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(ext))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

pub fn copy_dir_contents(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let path = entry?.path();
        if let Some(name) = path.file_name() {
            if path.is_dir() {
                copied += copy_dir_contents(&path, &dst.join(name))?;
            } else {
                fs::copy(&path, dst.join(name))?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}

/// Copies unless source and destination are the same file.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if src == dst {
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// First 8 hex chars of the SHA-256 of the path string; keeps temp files of
/// equally named inputs from different folders apart.
pub fn path_hash(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    hex::encode(digest)[..8].to_string()
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

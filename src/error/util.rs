//! Utility functions for error handling
//!
//! This module provides file helpers that attach path and purpose
//! information to IO failures.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;

fn with_path(e: io::Error, context: String, path: &Path) -> io::Error {
    io::Error::new(e.kind(), format!("{context} ({}): {e}", path.display()))
}

/// Safely create a file with rich error information
///
/// Parent directories are created when missing.
///
/// # Arguments
/// * `path` - The path of the file to create
/// * `purpose` - Why the file is being created (for error context)
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            with_path(e, format!("Failed to create directory for: {purpose}"), parent)
        })?;
    }

    fs::File::create(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                "Permission denied - check directory permissions".to_string()
            }
            _ => format!("Failed to create file for: {purpose}"),
        };
        with_path(e, context, path).into()
    })
}

/// Safely open a file for reading with rich error information
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::NotFound => format!("File not found, needed for: {purpose}"),
            _ => format!("Failed to open file for: {purpose}"),
        };
        with_path(e, context, path).into()
    })
}

/// Safely read a file to string with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("File not found ({}), needed for: {purpose}", path.display()),
        )
        .into());
    }

    fs::read_to_string(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::InvalidData => {
                "File contains invalid UTF-8 data - cannot read as text".to_string()
            }
            _ => format!("Failed to read file content for: {purpose}"),
        };
        with_path(e, context, path).into()
    })
}

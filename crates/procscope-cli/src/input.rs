//! Input handling for file reading and stdin support.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read the SQL script from a file, or stdin when no path is given.
pub fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => read_file(path),
        None => read_stdin(),
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;
    Ok(content)
}

//! Scan commands
//!
//! Both commands drive a file provider to completion and list what it
//! yields, one line per file: `<context> <size> <path>`. Matching the
//! content against rules is left to whatever consumes the provider.
//!
//! - `git`: every file in the history of the repositories below a path
//! - `filesystem`: every file below a directory

pub mod filesystem;
pub mod git;

use crate::artifacts::history::provider::FileProvider;
use colored::Colorize;
use std::io::Write;

/// Drain `provider`, writing one line per file, and return the file count
pub fn report_files(provider: impl FileProvider, writer: &mut dyn Write) -> anyhow::Result<usize> {
    let mut count = 0;
    for file in provider {
        writeln!(
            writer,
            "{} {:>8} {}",
            file.context.yellow(),
            file.content.len(),
            file.path
        )?;
        count += 1;
    }

    Ok(count)
}

use crate::areas::history::GitHistoryProvider;
use crate::artifacts::history::options::ScanOptions;
use crate::commands::scan::report_files;
use std::io::Write;
use std::path::Path;

/// List every file in the history of the repositories below `path`
pub fn scan_history(
    path: &Path,
    options: ScanOptions,
    writer: &mut dyn Write,
) -> anyhow::Result<usize> {
    let provider = GitHistoryProvider::new(path, options)?;
    let count = report_files(provider, writer)?;

    tracing::info!(files = count, "history scan complete");
    Ok(count)
}

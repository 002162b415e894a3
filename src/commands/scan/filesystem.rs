use crate::areas::filesystem::FileSystemProvider;
use crate::artifacts::history::options::FileFilter;
use crate::commands::scan::report_files;
use std::io::Write;
use std::path::Path;

/// List every file below `path` that passes `filter`
pub fn scan_directory(path: &Path, filter: FileFilter, writer: &mut dyn Write) -> anyhow::Result<usize> {
    if !path.is_dir() {
        return Err(anyhow::anyhow!("{} is not a directory", path.display()));
    }

    let provider = FileSystemProvider::new(path, filter);
    let count = report_files(provider, writer)?;

    tracing::info!(files = count, "filesystem scan complete");
    Ok(count)
}

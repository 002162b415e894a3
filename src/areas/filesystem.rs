use crate::artifacts::history::options::FileFilter;
use crate::artifacts::history::provider::{FileProvider, ScannedFile};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, FilterEntry, WalkDir};

/// Context attached to every file read from disk
pub const FILESYSTEM_CONTEXT: &str = "filesystem";

type Walker = FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>;

/// Regular files below a directory, `.git` directories excluded
///
/// Paths are reported relative to the root, `/`-separated, in file name order.
pub struct FileSystemProvider {
    root: PathBuf,
    walker: Walker,
    filter: FileFilter,
}

impl FileSystemProvider {
    pub fn new(root: &Path, filter: FileFilter) -> Self {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_not_git_dir as fn(&DirEntry) -> bool);

        FileSystemProvider {
            root: root.to_path_buf(),
            walker,
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn is_not_git_dir(entry: &DirEntry) -> bool {
    !(entry.file_type().is_dir() && entry.file_name() == ".git")
}

impl Iterator for FileSystemProvider {
    type Item = ScannedFile;

    fn next(&mut self) -> Option<ScannedFile> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = self.relative_path(entry.path());
            if self.filter.is_excluded(&path) {
                tracing::debug!(%path, "excluded");
                continue;
            }
            match entry.metadata() {
                Ok(metadata) if self.filter.is_too_large(metadata.len()) => {
                    tracing::debug!(%path, size = metadata.len(), "too large");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(%path, error = %e, "skipping unreadable file");
                    continue;
                }
            }

            match std::fs::read(entry.path()) {
                Ok(content) => {
                    return Some(ScannedFile::new(
                        content.into(),
                        path,
                        FILESYSTEM_CONTEXT.to_string(),
                    ));
                }
                Err(e) => tracing::warn!(%path, error = %e, "skipping unreadable file"),
            }
        }
    }
}

impl FileProvider for FileSystemProvider {
    fn file_filter(&self) -> &FileFilter {
        &self.filter
    }
}

use crate::artifacts::history::options::FileFilter;
use bytes::Bytes;
use derive_new::new;

/// One file handed to the scanning pipeline
///
/// `context` says where the content came from: the commit id for history
/// scans, `"filesystem"` for directory walks.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ScannedFile {
    pub content: Bytes,
    pub path: String,
    pub context: String,
}

/// A lazy source of files for the scanning pipeline
///
/// Files are produced one at a time as the consumer pulls them. Every
/// provider has already applied its `file_filter()` to what it yields.
pub trait FileProvider: Iterator<Item = ScannedFile> {
    fn file_filter(&self) -> &FileFilter;
}

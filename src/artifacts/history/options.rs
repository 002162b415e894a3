use crate::artifacts::history::exclusions::ExclusionSet;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pack::cache::CacheLimits;
use std::time::Duration;

/// Files larger than this are skipped unless configured otherwise
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10_000;

/// How often long scans report their rate
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Size and path limits every file provider applies before yielding a file
#[derive(Debug, Clone)]
pub struct FileFilter {
    max_file_size: u64,
    exclusions: ExclusionSet,
}

impl FileFilter {
    pub fn new(max_file_size: u64, exclusions: ExclusionSet) -> Self {
        FileFilter {
            max_file_size,
            exclusions,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclusions.is_excluded(path)
    }

    pub fn is_too_large(&self, size: u64) -> bool {
        size > self.max_file_size
    }

    pub fn accepts(&self, path: &str, size: u64) -> bool {
        !self.is_too_large(size) && !self.is_excluded(path)
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        FileFilter::new(DEFAULT_MAX_FILE_SIZE, ExclusionSet::default())
    }
}

/// Knobs for one history scan, passed explicitly to the provider
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Scan only this commit instead of every commit found
    pub commit: Option<ObjectId>,
    /// Scan only the commit this full or abbreviated id names in each
    /// repository; ignored when `commit` is set
    pub revision: Option<String>,
    /// Probe object types from headers and skip non-blobs before decoding
    pub fast_scan: bool,
    pub filter: FileFilter,
    /// Report a file only when its content changed since the last commit
    pub dedup_unchanged: bool,
    pub progress_interval: Duration,
    pub cache_limits: CacheLimits,
}

impl ScanOptions {
    pub fn with_commit(mut self, commit: ObjectId) -> Self {
        self.commit = Some(commit);
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_fast_scan(mut self, fast_scan: bool) -> Self {
        self.fast_scan = fast_scan;
        self
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_dedup_unchanged(mut self, dedup_unchanged: bool) -> Self {
        self.dedup_unchanged = dedup_unchanged;
        self
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            commit: None,
            revision: None,
            fast_scan: false,
            filter: FileFilter::default(),
            dedup_unchanged: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cache_limits: CacheLimits::default(),
        }
    }
}

//! Enumerating every file in the history of one or more repositories
//!
//! [`GitHistoryProvider`] is a pull iterator: each call to `next` decodes just
//! enough (one repository, one commit, one tree entry at a time) to produce
//! the next file. Nothing fails the iteration; broken repositories, commits,
//! trees and blobs are logged and skipped.

use crate::areas::repository::GitRepository;
use crate::areas::tree_walker::TreeWalk;
use crate::artifacts::history::object_cache::ObjectCache;
use crate::artifacts::history::options::{FileFilter, ScanOptions};
use crate::artifacts::history::progress::ScanProgress;
use crate::artifacts::history::provider::{FileProvider, ScannedFile};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::TreeEntry;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// State of the scan of one repository
struct RepositoryScan {
    repository: GitRepository,
    commits: VecDeque<ObjectId>,
    walk: Option<(ObjectId, TreeWalk)>,
    object_cache: ObjectCache,
    seen_blobs: HashSet<ObjectId>,
}

impl RepositoryScan {
    fn new(repository: GitRepository, options: &ScanOptions) -> Self {
        let commits = match (options.commit, options.revision.as_deref()) {
            (Some(commit), _) => VecDeque::from([commit]),
            (None, Some(revision)) => match repository.resolve_revision(revision) {
                Ok(commit) => VecDeque::from([commit]),
                Err(e) => {
                    tracing::warn!(git_dir = ?repository.git_dir(), revision, error = %e, "revision not found, skipping repository");
                    VecDeque::new()
                }
            },
            (None, None) => repository.commits().iter().map(|c| *c.id()).collect(),
        };
        tracing::info!(
            git_dir = ?repository.git_dir(),
            commits = commits.len(),
            "scanning history"
        );

        RepositoryScan {
            repository,
            commits,
            walk: None,
            object_cache: ObjectCache::new(),
            seen_blobs: HashSet::new(),
        }
    }

    fn next_file(
        &mut self,
        options: &ScanOptions,
        progress: &mut ScanProgress,
    ) -> Option<ScannedFile> {
        loop {
            let Some((commit_id, walk)) = self.walk.as_mut() else {
                let commit_id = self.commits.pop_front()?;
                progress.commit_scanned();
                self.walk = self.start_commit(&commit_id).map(|walk| (commit_id, walk));
                continue;
            };
            let commit_id = *commit_id;

            let cache = options.dedup_unchanged.then_some(&mut self.object_cache);
            let Some(leaf) = walk.next_leaf(&mut self.repository, cache) else {
                self.walk = None;
                continue;
            };

            if let Some(file) = self.load_file(leaf, &commit_id, options) {
                return Some(file);
            }
        }
    }

    fn start_commit(&mut self, commit_id: &ObjectId) -> Option<TreeWalk> {
        let tree = match self.repository.commit(commit_id) {
            Some(commit) => commit.tree_oid().copied(),
            None => match self.repository.get_commit(commit_id) {
                Ok(Some(commit)) => commit.tree_oid().copied(),
                Ok(None) => {
                    tracing::warn!(commit = %commit_id, "commit not found, skipping");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(commit = %commit_id, error = %e, "skipping unreadable commit");
                    return None;
                }
            },
        };
        let Some(tree) = tree else {
            tracing::warn!(commit = %commit_id, "commit has no tree, skipping");
            return None;
        };

        match TreeWalk::start(&mut self.repository, &tree) {
            Ok(Some(walk)) => Some(walk),
            Ok(None) => {
                tracing::warn!(commit = %commit_id, %tree, "tree not found, skipping commit");
                None
            }
            Err(e) => {
                tracing::warn!(commit = %commit_id, %tree, error = %e, "skipping commit with unreadable tree");
                None
            }
        }
    }

    /// Decode one leaf if it passes every filter
    fn load_file(
        &mut self,
        leaf: TreeEntry,
        commit_id: &ObjectId,
        options: &ScanOptions,
    ) -> Option<ScannedFile> {
        let filter = &options.filter;
        if filter.is_excluded(&leaf.path) {
            tracing::debug!(path = %leaf.path, "excluded");
            return None;
        }

        if options.fast_scan {
            if !self.seen_blobs.insert(leaf.oid) {
                return None;
            }
            match self.repository.object_type(&leaf.oid) {
                Ok(Some(ObjectType::Blob)) => {}
                Ok(Some(other)) => {
                    tracing::debug!(path = %leaf.path, object_type = %other, "not a blob");
                    return None;
                }
                Ok(None) => {
                    tracing::debug!(path = %leaf.path, oid = %leaf.oid, "blob not found");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(path = %leaf.path, oid = %leaf.oid, error = %e, "skipping unreadable object");
                    return None;
                }
            }
        }

        match self.repository.object_size(&leaf.oid) {
            Ok(Some(size)) if filter.is_too_large(size) => {
                tracing::debug!(path = %leaf.path, size, "too large");
                return None;
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!(path = %leaf.path, oid = %leaf.oid, "blob not found");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %leaf.path, oid = %leaf.oid, error = %e, "skipping unreadable object");
                return None;
            }
        }

        match self.repository.get_object(&leaf.oid) {
            Ok(Some(object)) if object.object_type == ObjectType::Blob => Some(ScannedFile::new(
                object.content,
                leaf.path,
                commit_id.to_hex(),
            )),
            Ok(Some(object)) => {
                tracing::warn!(path = %leaf.path, object_type = %object.object_type, "tree entry is not a blob");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(path = %leaf.path, oid = %leaf.oid, error = %e, "skipping unreadable object");
                None
            }
        }
    }
}

/// Every file of every commit of every repository below a directory
pub struct GitHistoryProvider {
    pending: VecDeque<PathBuf>,
    options: ScanOptions,
    current: Option<RepositoryScan>,
    progress: ScanProgress,
}

impl GitHistoryProvider {
    /// Scan every `.git` directory found below `path`, in path order.
    ///
    /// `path` may itself be a `.git` directory.
    pub fn new(path: &Path, options: ScanOptions) -> anyhow::Result<Self> {
        let git_dirs = Self::discover_repositories(path);
        if git_dirs.is_empty() {
            return Err(anyhow::anyhow!(
                "No Git repository found under {}",
                path.display()
            ));
        }

        Ok(GitHistoryProvider {
            progress: ScanProgress::new(options.progress_interval),
            pending: git_dirs.into(),
            options,
            current: None,
        })
    }

    /// Scan an already opened repository
    pub fn from_repository(repository: GitRepository, options: ScanOptions) -> Self {
        GitHistoryProvider {
            progress: ScanProgress::new(options.progress_interval),
            current: Some(RepositoryScan::new(repository, &options)),
            pending: VecDeque::new(),
            options,
        }
    }

    fn discover_repositories(path: &Path) -> Vec<PathBuf> {
        if path.join("objects").is_dir() && path.join("HEAD").is_file() {
            return vec![path.to_path_buf()];
        }

        let mut git_dirs = Vec::new();
        let mut walker = WalkDir::new(path).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() && entry.file_name() == ".git" {
                git_dirs.push(entry.into_path());
                walker.skip_current_dir();
            }
        }
        git_dirs
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }
}

impl Iterator for GitHistoryProvider {
    type Item = ScannedFile;

    fn next(&mut self) -> Option<ScannedFile> {
        loop {
            if self.current.is_none() {
                let git_dir = self.pending.pop_front()?;
                match GitRepository::open_with(&git_dir, self.options.cache_limits) {
                    Ok(repository) => {
                        self.current = Some(RepositoryScan::new(repository, &self.options));
                    }
                    Err(e) => {
                        tracing::warn!(repository = %git_dir.display(), error = %e, "skipping repository");
                        continue;
                    }
                }
            }

            let scan = self.current.as_mut()?;
            match scan.next_file(&self.options, &mut self.progress) {
                Some(file) => {
                    self.progress.file_yielded();
                    return Some(file);
                }
                None => {
                    tracing::info!(
                        commits = self.progress.commits(),
                        files = self.progress.files(),
                        "finished scanning repository"
                    );
                    self.current = None;
                }
            }
        }
    }
}

impl FileProvider for GitHistoryProvider {
    fn file_filter(&self) -> &FileFilter {
        &self.options.filter
    }
}

use crate::areas::loose::LooseObjects;
use crate::areas::pack::Pack;
use crate::areas::tree_walker::TreeSource;
use crate::artifacts::objects::commit::GitCommit;
use crate::artifacts::objects::object::{DecodedObject, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::pack::cache::CacheLimits;
use crate::artifacts::pack::delta::{self, ObjectSource};
use crate::artifacts::pack::error::{PackError, PackResult};
use crate::artifacts::pack::header::{DeltaBase, ObjectHeader};
use anyhow::Context;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Combined pack size above which scans are expected to be slow
pub const LARGE_HISTORY_BYTES: u64 = 100 * 1024 * 1024;

/// Shortest abbreviated object id accepted on the command line
const MIN_PREFIX_LENGTH: usize = 4;

/// Where an object is stored within a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectLocation {
    /// Record at `offset` in the pack at position `pack`
    Packed { pack: usize, offset: u64 },
    Loose(ObjectId),
}

/// Every pack (and loose object) of one repository behind a single lookup
///
/// Lookups try packs in registration order, then loose objects, and return the
/// first hit. The repository owns its pack handles and their decode caches;
/// dropping it closes them.
#[derive(Debug)]
pub struct GitRepository {
    git_dir: Option<PathBuf>,
    packs: Vec<Pack>,
    loose: LooseObjects,
    commits: Vec<GitCommit>,
}

impl GitRepository {
    /// Open a repository from its `.git` directory or from a working tree
    /// containing one.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Self::open_with(path, CacheLimits::default())
    }

    pub fn open_with(path: &Path, limits: CacheLimits) -> anyhow::Result<Self> {
        let git_dir = Self::discover_git_dir(path)?;
        let objects_dir = git_dir.join("objects");

        let pack_paths = Self::discover_packs(&objects_dir.join("pack"))?;
        let packs = Self::open_packs(&pack_paths, limits);
        let loose = LooseObjects::open(&objects_dir);

        tracing::debug!(
            git_dir = %git_dir.display(),
            packs = packs.len(),
            loose = loose.len(),
            "opened repository"
        );

        Ok(Self::assemble(Some(git_dir), packs, loose))
    }

    /// Aggregate explicitly listed packs, each named by the path of its
    /// `.idx`, its `.pack`, or their shared stem.
    ///
    /// A pack that cannot be opened is logged and left out; the others are
    /// still served.
    pub fn from_packs(pack_paths: &[PathBuf], limits: CacheLimits) -> Self {
        let packs = Self::open_packs(pack_paths, limits);
        Self::assemble(None, packs, LooseObjects::default())
    }

    fn assemble(git_dir: Option<PathBuf>, packs: Vec<Pack>, loose: LooseObjects) -> Self {
        let total_size: u64 = packs.iter().map(Pack::size).sum();
        if total_size >= LARGE_HISTORY_BYTES {
            tracing::warn!(
                size_mb = total_size / (1024 * 1024),
                "Git history is over 100MB, scanning will be slow"
            );
        }

        let mut repository = GitRepository {
            git_dir,
            packs,
            loose,
            commits: Vec::new(),
        };
        repository.commits = repository.collect_commits();
        repository
    }

    fn discover_git_dir(path: &Path) -> anyhow::Result<PathBuf> {
        let dot_git = path.join(".git");
        if dot_git.join("objects").is_dir() {
            return Ok(dot_git);
        }
        if path.join("objects").is_dir() {
            return Ok(path.to_path_buf());
        }
        Err(anyhow::anyhow!(
            "{} is not a Git repository",
            path.display()
        ))
    }

    fn discover_packs(pack_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut pack_paths = Vec::new();
        for entry in WalkDir::new(pack_dir)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .with_context(|| format!("Unable to list packs in {}", pack_dir.display()))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "idx")
            {
                pack_paths.push(entry.into_path());
            }
        }

        Ok(pack_paths)
    }

    fn open_packs(pack_paths: &[PathBuf], limits: CacheLimits) -> Vec<Pack> {
        pack_paths
            .iter()
            .filter_map(|path| match Pack::open_with(path, limits) {
                Ok(pack) => Some(pack),
                Err(e) => {
                    tracing::warn!(pack = %path.display(), error = %e, "skipping pack");
                    None
                }
            })
            .collect()
    }

    /// Commits from every pack and loose object, deduplicated and ordered by
    /// committer time (then id), oldest first
    fn collect_commits(&mut self) -> Vec<GitCommit> {
        let mut commits = BTreeMap::new();

        for pack in &mut self.packs {
            match pack.commits() {
                Ok(found) => {
                    for commit in found {
                        commits.entry(*commit.id()).or_insert(commit);
                    }
                }
                Err(e) => {
                    tracing::warn!(pack = %pack.name(), error = %e, "unable to list commits");
                }
            }
        }

        let loose_ids: Vec<ObjectId> = self.loose.ids().copied().collect();
        for oid in loose_ids {
            if commits.contains_key(&oid) {
                continue;
            }
            match self.loose.load(&oid) {
                Ok(Some(object)) if object.object_type == ObjectType::Commit => {
                    commits.insert(oid, GitCommit::parse(oid, &object.content));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%oid, error = %e, "skipping unreadable loose object"),
            }
        }

        let mut commits: Vec<GitCommit> = commits.into_values().collect();
        commits.sort_by(|a, b| {
            a.committed_at()
                .cmp(&b.committed_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        commits
    }

    pub fn git_dir(&self) -> Option<&Path> {
        self.git_dir.as_deref()
    }

    pub fn packs(&self) -> &[Pack] {
        &self.packs
    }

    pub fn loose_objects(&self) -> &LooseObjects {
        &self.loose
    }

    /// All commits found, oldest first
    pub fn commits(&self) -> &[GitCommit] {
        &self.commits
    }

    pub fn commit(&self, oid: &ObjectId) -> Option<&GitCommit> {
        self.commits.iter().find(|commit| commit.id() == oid)
    }

    /// Total size of all pack files in bytes
    pub fn pack_size(&self) -> u64 {
        self.packs.iter().map(Pack::size).sum()
    }

    pub fn locate(&self, oid: &ObjectId) -> Option<ObjectLocation> {
        self.packs
            .iter()
            .enumerate()
            .find_map(|(pack, p)| {
                p.offset_of(oid)
                    .map(|offset| ObjectLocation::Packed { pack, offset })
            })
            .or_else(|| self.loose.contains(oid).then_some(ObjectLocation::Loose(*oid)))
    }

    pub fn object_exists(&self, oid: &ObjectId) -> bool {
        self.locate(oid).is_some()
    }

    /// Decode the object at a known location
    pub fn object_at(&mut self, location: ObjectLocation) -> PackResult<DecodedObject> {
        delta::resolve(self, location)
    }

    /// Decode `oid` from whichever pack holds it.
    ///
    /// `None` means no pack (and no loose object) has it; decoding failures
    /// are errors.
    pub fn get_object(&mut self, oid: &ObjectId) -> PackResult<Option<DecodedObject>> {
        match self.locate(oid) {
            Some(location) => self.object_at(location).map(Some),
            None => Ok(None),
        }
    }

    /// Decode `oid` and parse it as `T`, failing if it has another type
    pub fn get_object_as<T: Unpackable>(
        &mut self,
        oid: &ObjectId,
        expected: ObjectType,
    ) -> anyhow::Result<Option<T>> {
        let Some(object) = self.get_object(oid)? else {
            return Ok(None);
        };
        object
            .parse_as(expected)
            .with_context(|| format!("Unable to parse {expected} {oid}"))
            .map(Some)
    }

    pub fn get_tree(&mut self, oid: &ObjectId) -> anyhow::Result<Option<Tree>> {
        self.get_object_as(oid, ObjectType::Tree)
    }

    /// Decode a commit, whether or not it was part of the commit enumeration
    pub fn get_commit(&mut self, oid: &ObjectId) -> anyhow::Result<Option<GitCommit>> {
        let Some(object) = self.get_object(oid)? else {
            return Ok(None);
        };
        if object.object_type != ObjectType::Commit {
            return Err(anyhow::anyhow!(
                "expected a commit object, found a {}",
                object.object_type
            ));
        }
        Ok(Some(GitCommit::parse(*oid, &object.content)))
    }

    /// Final type of `oid`, read from record headers only
    pub fn object_type(&mut self, oid: &ObjectId) -> PackResult<Option<ObjectType>> {
        match self.locate(oid) {
            Some(location) => delta::resolve_type(self, location).map(Some),
            None => Ok(None),
        }
    }

    /// Decompressed size of `oid`, without replaying deltas
    pub fn object_size(&mut self, oid: &ObjectId) -> PackResult<Option<u64>> {
        match self.locate(oid) {
            Some(location) => delta::resolve_size(self, location).map(Some),
            None => Ok(None),
        }
    }

    /// Every object id starting with the hex `prefix`
    pub fn find_objects_by_prefix(&self, prefix: &str) -> Vec<ObjectId> {
        let prefix = prefix.to_ascii_lowercase();
        let mut matches = BTreeSet::new();

        for pack in &self.packs {
            matches.extend(
                pack.index()
                    .entries()
                    .iter()
                    .map(|entry| entry.oid)
                    .filter(|oid| oid.to_hex().starts_with(&prefix)),
            );
        }
        matches.extend(
            self.loose
                .ids()
                .filter(|oid| oid.to_hex().starts_with(&prefix))
                .copied(),
        );

        matches.into_iter().collect()
    }

    /// Resolve a full or abbreviated object id
    pub fn resolve_revision(&self, revision: &str) -> anyhow::Result<ObjectId> {
        if revision.len() == OBJECT_ID_LENGTH {
            return ObjectId::try_parse(revision);
        }
        if revision.len() < MIN_PREFIX_LENGTH || !revision.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object name {revision:?}"));
        }

        match self.find_objects_by_prefix(revision).as_slice() {
            [] => Err(anyhow::anyhow!("Unknown object {revision}")),
            [oid] => Ok(*oid),
            candidates => Err(anyhow::anyhow!(
                "Ambiguous object name {revision}: {} candidates",
                candidates.len()
            )),
        }
    }

    fn pack_mut(&mut self, pack: usize) -> PackResult<&mut Pack> {
        self.packs
            .get_mut(pack)
            .ok_or_else(|| PackError::corrupt(format!("no pack at position {pack}")))
    }

    fn load_loose(&self, oid: &ObjectId) -> PackResult<DecodedObject> {
        match self.loose.load(oid) {
            Ok(Some(object)) => Ok(object),
            Ok(None) => Err(PackError::corrupt(format!("loose object {oid} vanished"))),
            Err(e) => Err(PackError::corrupt(format!("{e:#}"))),
        }
    }
}

impl ObjectSource for GitRepository {
    type Location = ObjectLocation;

    fn read_header(&mut self, at: ObjectLocation) -> PackResult<ObjectHeader> {
        match at {
            ObjectLocation::Packed { pack, offset } => self.pack_mut(pack)?.read_header(offset),
            ObjectLocation::Loose(oid) => {
                let object = self.load_loose(&oid)?;
                Ok(loose_header(&object))
            }
        }
    }

    fn read_payload(&mut self, at: ObjectLocation) -> PackResult<(ObjectHeader, Bytes)> {
        match at {
            ObjectLocation::Packed { pack, offset } => self.pack_mut(pack)?.read_payload(offset),
            ObjectLocation::Loose(oid) => {
                let object = self.load_loose(&oid)?;
                Ok((loose_header(&object), object.content))
            }
        }
    }

    /// Offset deltas stay in their pack; hash deltas may find their base in
    /// any pack, or loose
    fn base_location(&self, at: ObjectLocation, base: &DeltaBase) -> Option<ObjectLocation> {
        match (at, base) {
            (ObjectLocation::Packed { pack, .. }, DeltaBase::Offset(offset)) => {
                Some(ObjectLocation::Packed {
                    pack,
                    offset: *offset,
                })
            }
            (_, DeltaBase::Id(oid)) => self.locate(oid),
            (ObjectLocation::Loose(_), DeltaBase::Offset(_)) => None,
        }
    }

    fn cached(&mut self, at: ObjectLocation) -> Option<DecodedObject> {
        match at {
            ObjectLocation::Packed { pack, offset } => self.packs.get(pack)?.cache().get(offset),
            ObjectLocation::Loose(_) => None,
        }
    }

    fn remember(&mut self, at: ObjectLocation, object: &DecodedObject) {
        if let ObjectLocation::Packed { pack, offset } = at
            && let Some(pack) = self.packs.get_mut(pack)
        {
            pack.remember(offset, object);
        }
    }
}

impl TreeSource for GitRepository {
    fn tree(&mut self, oid: &ObjectId) -> anyhow::Result<Option<Tree>> {
        self.get_tree(oid)
    }
}

fn loose_header(object: &DecodedObject) -> ObjectHeader {
    ObjectHeader {
        object_type: object.object_type.into(),
        size: object.len() as u64,
        offset: 0,
        payload_offset: 0,
        delta_base: None,
    }
}

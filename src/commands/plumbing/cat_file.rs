use crate::areas::repository::GitRepository;
use crate::artifacts::objects::commit::GitCommit;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use colored::Colorize;
use std::io::Write;

/// What `cat-file` prints about an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatFileMode {
    #[default]
    Pretty,
    Type,
    Size,
}

impl GitRepository {
    pub fn cat_file(
        &mut self,
        revision: &str,
        mode: CatFileMode,
        writer: &mut dyn Write,
    ) -> anyhow::Result<()> {
        let oid = self.resolve_revision(revision)?;

        match mode {
            CatFileMode::Type => {
                let object_type = self
                    .object_type(&oid)?
                    .ok_or_else(|| anyhow::anyhow!("Object not found: {oid}"))?;
                writeln!(writer, "{object_type}")?;
            }
            CatFileMode::Size => {
                let size = self
                    .object_size(&oid)?
                    .ok_or_else(|| anyhow::anyhow!("Object not found: {oid}"))?;
                writeln!(writer, "{size}")?;
            }
            CatFileMode::Pretty => {
                let object = self
                    .get_object(&oid)?
                    .ok_or_else(|| anyhow::anyhow!("Object not found: {oid}"))?;

                match object.object_type {
                    ObjectType::Commit => {
                        let commit = GitCommit::parse(oid, &object.content);
                        Self::write_commit(&commit, writer)?;
                    }
                    ObjectType::Tree => {
                        let tree = Tree::deserialize(&object.content[..])?;
                        for entry in tree.entries() {
                            writeln!(
                                writer,
                                "{:06o} {} {}\t{}",
                                entry.mode,
                                entry.kind(),
                                entry.oid,
                                entry.path
                            )?;
                        }
                    }
                    ObjectType::Blob | ObjectType::Tag => writer.write_all(&object.content)?,
                }
            }
        }

        Ok(())
    }

    fn write_commit(commit: &GitCommit, writer: &mut dyn Write) -> anyhow::Result<()> {
        writeln!(writer, "{}", format!("commit {}", commit.id()).yellow())?;
        if let Some(tree) = commit.tree_oid() {
            writeln!(writer, "tree {tree}")?;
        }
        if let Some(parent) = commit.parent() {
            writeln!(writer, "parent {parent}")?;
        }
        writeln!(writer, "author {}", commit.author())?;
        writeln!(writer, "committer {}", commit.committer())?;
        if let Some(committed_at) = commit.committed_at() {
            writeln!(writer, "date {}", committed_at.to_rfc2822())?;
        }

        Ok(())
    }
}

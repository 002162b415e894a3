use crate::areas::repository::GitRepository;
use crate::areas::tree_walker::walk_tree;
use crate::artifacts::objects::object_type::ObjectType;
use std::io::Write;

impl GitRepository {
    /// List every file below a tree, or below the root tree of a commit
    pub fn ls_tree(&mut self, revision: &str, writer: &mut dyn Write) -> anyhow::Result<()> {
        let oid = self.resolve_revision(revision)?;

        let root = match self.object_type(&oid)? {
            Some(ObjectType::Tree) => oid,
            Some(ObjectType::Commit) => self
                .get_commit(&oid)?
                .and_then(|commit| commit.tree_oid().copied())
                .ok_or_else(|| anyhow::anyhow!("Commit {oid} has no tree"))?,
            Some(other) => return Err(anyhow::anyhow!("Object {oid} is a {other}, not a tree")),
            None => return Err(anyhow::anyhow!("Object not found: {oid}")),
        };

        let leaves = walk_tree(self, &root, None)?
            .ok_or_else(|| anyhow::anyhow!("Tree not found: {root}"))?;
        for leaf in leaves {
            writeln!(writer, "{:o} {} {}", leaf.mode, leaf.oid, leaf.path)?;
        }

        Ok(())
    }
}

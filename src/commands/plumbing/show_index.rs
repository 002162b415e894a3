use crate::artifacts::pack::index::PackIndex;
use std::io::Write;
use std::path::Path;

/// Print `<offset> <object id>` for every entry of a pack index
pub fn show_index(index_path: &Path, writer: &mut dyn Write) -> anyhow::Result<()> {
    let index = PackIndex::open(index_path)?;

    if !index.verify_checksum() {
        tracing::warn!(index = %index_path.display(), "pack index checksum mismatch");
    }
    if let Some(pack_checksum) = index.pack_checksum() {
        tracing::info!(objects = index.len(), pack = %pack_checksum, "read pack index");
    }

    for entry in index.entries() {
        writeln!(writer, "{} {}", entry.offset, entry.oid)?;
    }

    Ok(())
}

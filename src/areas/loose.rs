//! Loose object store
//!
//! Objects not yet packed live one per file under `objects/`, named by their
//! id split after the second hex character. Each file is a zlib stream of
//! `<type> <size>\0<body>`. Loose objects are never deltas.

use crate::artifacts::objects::object::DecodedObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct LooseObjects {
    path: PathBuf,
    ids: BTreeSet<ObjectId>,
}

impl LooseObjects {
    /// Index the loose objects below an `objects/` directory.
    ///
    /// Only the file names are inspected here; nothing is inflated.
    pub fn open(objects_dir: &Path) -> Self {
        let mut ids = BTreeSet::new();

        let fan_out_dirs = WalkDir::new(objects_dir)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file());

        for entry in fan_out_dirs {
            let Some(dir) = entry.path().parent().and_then(Path::file_name) else {
                continue;
            };
            let hex = format!(
                "{}{}",
                dir.to_string_lossy(),
                entry.file_name().to_string_lossy()
            );
            if hex.len() != OBJECT_ID_LENGTH {
                continue;
            }
            if let Ok(oid) = ObjectId::try_parse(&hex) {
                ids.insert(oid);
            }
        }

        LooseObjects {
            path: objects_dir.to_path_buf(),
            ids,
        }
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.ids.contains(oid)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Read and decode one loose object, or `None` if it is not stored here
    pub fn load(&self, oid: &ObjectId) -> anyhow::Result<Option<DecodedObject>> {
        if !self.contains(oid) {
            return Ok(None);
        }

        let object_path = self.path.join(oid.to_loose_path());
        let object_content = std::fs::read(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;
        let object_content = Self::decompress(object_content.into())?;

        let mut object_reader = Cursor::new(object_content);
        let (object_type, size) = ObjectType::parse_object_header(&mut object_reader)?;
        let body_start = object_reader.position() as usize;
        let body = object_reader.into_inner().slice(body_start..);

        if body.len() as u64 != size {
            return Err(anyhow::anyhow!(
                "Loose object {oid} declares {size} bytes but holds {}",
                body.len()
            ));
        }

        Ok(Some(DecodedObject::new(object_type, body)))
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }
}

use flate2::Compression;
use flate2::write::ZlibEncoder;
use ludvig::artifacts::objects::object_id::ObjectId;
use sha1::{Digest, Sha1};
use std::io::Write;
use std::path::{Path, PathBuf};

const OBJ_COMMIT: u8 = 1;
const OBJ_TREE: u8 = 2;
const OBJ_BLOB: u8 = 3;
const OBJ_TAG: u8 = 4;
const OBJ_OFS_DELTA: u8 = 6;
const OBJ_REF_DELTA: u8 = 7;

#[derive(Debug, Clone)]
enum Base {
    None,
    Offset(usize),
    Id(ObjectId),
}

#[derive(Debug, Clone)]
struct Record {
    id: ObjectId,
    tag: u8,
    base: Base,
    payload: Vec<u8>,
    /// Size written to the record header, if not the payload length
    declared_size: Option<u64>,
    /// Resolved object, if the record has one
    content: Option<(String, Vec<u8>)>,
}

/// Writes small packs and their v2 indexes for tests
#[derive(Debug, Clone)]
pub struct PackBuilder {
    version: u32,
    large_offsets: bool,
    records: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct BuiltPack {
    pub pack: Vec<u8>,
    pub index: Vec<u8>,
    /// Per record, in insertion order
    pub ids: Vec<ObjectId>,
    pub offsets: Vec<u64>,
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackBuilder {
    pub fn new() -> Self {
        PackBuilder {
            version: 2,
            large_offsets: false,
            records: Vec::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Flag every offset as living in the 64-bit table
    pub fn large_offsets(mut self) -> Self {
        self.large_offsets = true;
        self
    }

    pub fn object(&mut self, object_type: &str, content: &[u8]) -> usize {
        let tag = match object_type {
            "commit" => OBJ_COMMIT,
            "tree" => OBJ_TREE,
            "blob" => OBJ_BLOB,
            "tag" => OBJ_TAG,
            other => panic!("unknown object type {other}"),
        };
        self.push(Record {
            id: object_id(object_type, content),
            tag,
            base: Base::None,
            payload: content.to_vec(),
            content: Some((object_type.to_string(), content.to_vec())),
            declared_size: None,
        })
    }

    pub fn blob(&mut self, content: &[u8]) -> usize {
        self.object("blob", content)
    }

    /// Offset delta turning record `base` into `target`
    pub fn ofs_delta(&mut self, base: usize, target: &[u8]) -> usize {
        let (object_type, base_content) = self.records[base]
            .content
            .clone()
            .expect("delta base must have known content");
        self.push(Record {
            id: object_id(&object_type, target),
            tag: OBJ_OFS_DELTA,
            base: Base::Offset(base),
            payload: encode_delta(&base_content, target),
            content: Some((object_type, target.to_vec())),
            declared_size: None,
        })
    }

    /// Hash delta turning record `base` into `target`
    pub fn ref_delta(&mut self, base: usize, target: &[u8]) -> usize {
        let (object_type, base_content) = self.records[base]
            .content
            .clone()
            .expect("delta base must have known content");
        self.external_ref_delta(&object_type, &base_content, target)
    }

    /// Hash delta against an object this pack does not contain
    pub fn external_ref_delta(&mut self, object_type: &str, base: &[u8], target: &[u8]) -> usize {
        self.push(Record {
            id: object_id(object_type, target),
            tag: OBJ_REF_DELTA,
            base: Base::Id(object_id(object_type, base)),
            payload: encode_delta(base, target),
            content: Some((object_type.to_string(), target.to_vec())),
            declared_size: None,
        })
    }

    /// Hash delta with an arbitrary id and base id; the payload is a valid
    /// empty delta
    pub fn raw_ref_delta(&mut self, id: ObjectId, base: ObjectId) -> usize {
        self.push(Record {
            id,
            tag: OBJ_REF_DELTA,
            base: Base::Id(base),
            payload: vec![0, 0],
            content: None,
            declared_size: None,
        })
    }

    /// Record with an arbitrary type tag
    pub fn raw(&mut self, id: ObjectId, tag: u8, payload: &[u8]) -> usize {
        self.push(Record {
            id,
            tag,
            base: Base::None,
            payload: payload.to_vec(),
            content: None,
            declared_size: None,
        })
    }

    /// Record whose header claims `size` bytes whatever the payload holds
    pub fn raw_with_size(&mut self, id: ObjectId, tag: u8, size: u64, payload: &[u8]) -> usize {
        self.push(Record {
            id,
            tag,
            base: Base::None,
            payload: payload.to_vec(),
            content: None,
            declared_size: Some(size),
        })
    }

    fn push(&mut self, record: Record) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn build(&self) -> BuiltPack {
        let mut pack = b"PACK".to_vec();
        pack.extend(self.version.to_be_bytes());
        pack.extend((self.records.len() as u32).to_be_bytes());

        let mut offsets = Vec::with_capacity(self.records.len());
        let mut crcs = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let offset = pack.len() as u64;
            let mut raw = encode_type_and_size(
                record.tag,
                record.declared_size.unwrap_or(record.payload.len() as u64),
            );
            match &record.base {
                Base::None => {}
                Base::Offset(base) => raw.extend(encode_base_distance(offset - offsets[*base])),
                Base::Id(id) => raw.extend(id.as_bytes()),
            }
            raw.extend(compress(&record.payload));

            let mut crc = flate2::Crc::new();
            crc.update(&raw);
            crcs.push(crc.sum());
            offsets.push(offset);
            pack.extend(raw);
        }
        let pack_checksum = Sha1::digest(&pack);
        pack.extend(pack_checksum.as_slice());

        let ids: Vec<ObjectId> = self.records.iter().map(|record| record.id).collect();
        let index = self.build_index(&ids, &offsets, &crcs, pack_checksum.as_slice());

        BuiltPack {
            pack,
            index,
            ids,
            offsets,
        }
    }

    fn build_index(&self, ids: &[ObjectId], offsets: &[u64], crcs: &[u32], checksum: &[u8]) -> Vec<u8> {
        let mut order: Vec<usize> = (0..ids.len()).collect();
        order.sort_by_key(|&i| ids[i]);

        let mut index = vec![0xff, b't', b'O', b'c', 0, 0, 0, 2];
        for bucket in 0..=255u8 {
            let count = ids.iter().filter(|id| id.as_bytes()[0] <= bucket).count() as u32;
            index.extend(count.to_be_bytes());
        }
        for &i in &order {
            index.extend(ids[i].as_bytes());
        }
        for &i in &order {
            index.extend(crcs[i].to_be_bytes());
        }
        for (position, &i) in order.iter().enumerate() {
            let entry = if self.large_offsets {
                0x8000_0000 | position as u32
            } else {
                offsets[i] as u32
            };
            index.extend(entry.to_be_bytes());
        }
        if self.large_offsets {
            for &i in &order {
                index.extend(offsets[i].to_be_bytes());
            }
        }
        index.extend(checksum);
        let index_checksum = Sha1::digest(&index);
        index.extend(index_checksum.as_slice());
        index
    }
}

impl BuiltPack {
    /// Write `<name>.idx` and `<name>.pack` into `dir`, returning the index path
    pub fn write_to(&self, dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let index_path = dir.join(format!("{name}.idx"));
        std::fs::write(&index_path, &self.index)?;
        std::fs::write(dir.join(format!("{name}.pack")), &self.pack)?;
        Ok(index_path)
    }
}

pub fn object_id(object_type: &str, content: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(format!("{object_type} {}\0", content.len()));
    hasher.update(content);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hasher.finalize());
    ObjectId::from_bytes(bytes)
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory write")
}

fn encode_type_and_size(tag: u8, mut size: u64) -> Vec<u8> {
    let mut bytes = vec![(tag << 4) | (size & 0x0f) as u8];
    size >>= 4;
    while size > 0 {
        if let Some(last) = bytes.last_mut() {
            *last |= 0x80;
        }
        bytes.push((size & 0x7f) as u8);
        size >>= 7;
    }
    bytes
}

fn encode_base_distance(mut distance: u64) -> Vec<u8> {
    let mut bytes = vec![(distance & 0x7f) as u8];
    distance >>= 7;
    while distance > 0 {
        distance -= 1;
        bytes.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }
    bytes.reverse();
    bytes
}

fn encode_size(mut size: usize, out: &mut Vec<u8>) {
    while size >= 0x80 {
        out.push((size & 0x7f) as u8 | 0x80);
        size >>= 7;
    }
    out.push(size as u8);
}

/// Copy the longest shared prefix from the base, insert the rest
pub fn encode_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();
    encode_size(base.len(), &mut delta);
    encode_size(target.len(), &mut delta);

    let shared = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count()
        .min(0xff_ffff);
    if shared > 0 {
        let mut op = 0x80u8;
        let mut operands = Vec::new();
        for (bit, byte) in (shared as u32).to_le_bytes()[..3].iter().enumerate() {
            if *byte != 0 {
                op |= 0x10 << bit;
                operands.push(*byte);
            }
        }
        delta.push(op);
        delta.extend(operands);
    }
    for chunk in target[shared..].chunks(0x7f) {
        delta.push(chunk.len() as u8);
        delta.extend(chunk);
    }
    delta
}

//! Binary persistence for index state.
//!
//! The stream is self-describing: a fixed header names the format version,
//! index variant, dimensionality, metric, and variant parameters, followed
//! by the vector records (and, for HNSW, the full graph topology), and a
//! trailing CRC32 over everything before it. `load` rejects anything it
//! does not recognize with `CorruptIndex` — an unknown version is never
//! silently misparsed.
//!
//! Round-trip contract: `load(save(index))` reconstructs an index that
//! returns identical search results to the original for any query and
//! query-time parameters.
//!
//! Streams written by `save` are not safe to interrupt; use
//! [`save_to_path`], which writes a temporary sibling file and renames it
//! into place, when atomicity matters.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::distance::DistanceMetric;
use crate::error::{ProximaError, Result};
use crate::index::flat::FlatIndex;
use crate::index::hnsw::{HnswConfig, HnswIndex, HnswNode};
use crate::index::{AnyIndex, VectorIndex};
use crate::vector::Vector;

const MAGIC: &[u8; 4] = b"PXIX";
const FORMAT_VERSION: u16 = 1;

const VARIANT_FLAT: u8 = 1;
const VARIANT_HNSW: u8 = 2;

/// Serialize a flat index. Tombstoned slots are compacted away: flat
/// storage has no topology to preserve, and ids stay stable without them.
pub(crate) fn save_flat(index: &FlatIndex, output: &mut dyn Write) -> Result<()> {
    let mut payload = Vec::new();
    write_header(&mut payload, VARIANT_FLAT, index.distance_metric(), index.dimension())?;

    payload.write_u64::<LittleEndian>(index.len() as u64)?;
    for (id, vector) in index.live_entries() {
        payload.write_u64::<LittleEndian>(id)?;
        write_vector(&mut payload, vector)?;
    }

    finish(payload, output)
}

/// Serialize an HNSW index.
///
/// Every resident node is written, tombstoned ones included, because live
/// nodes' neighbor lists may reference tombstoned slots; dropping them
/// would leave dangling edges. The header carries both the total node
/// count and the live count so `load` can cross-check.
pub(crate) fn save_hnsw(index: &HnswIndex, output: &mut dyn Write) -> Result<()> {
    let config = index.config();
    let mut payload = Vec::new();
    write_header(&mut payload, VARIANT_HNSW, config.distance_metric, config.dimension)?;
    payload.write_u32::<LittleEndian>(config.m as u32)?;
    payload.write_u32::<LittleEndian>(config.ef_construction as u32)?;
    payload.write_u32::<LittleEndian>(config.ef_search as u32)?;
    payload.write_u64::<LittleEndian>(config.seed)?;

    let nodes = index.nodes();
    payload.write_u64::<LittleEndian>(nodes.len() as u64)?;
    payload.write_u64::<LittleEndian>(index.len() as u64)?;
    match index.entry_point() {
        Some(slot) => {
            payload.write_u8(1)?;
            payload.write_u32::<LittleEndian>(slot)?;
        }
        None => {
            payload.write_u8(0)?;
            payload.write_u32::<LittleEndian>(0)?;
        }
    }

    for node in nodes {
        payload.write_u64::<LittleEndian>(node.id)?;
        payload.write_u8(node.deleted as u8)?;
        payload.write_u32::<LittleEndian>(node.top_layer() as u32)?;
        write_vector(&mut payload, &node.vector)?;
        for neighbors in &node.neighbors {
            payload.write_u32::<LittleEndian>(neighbors.len() as u32)?;
            for &slot in neighbors {
                payload.write_u32::<LittleEndian>(slot)?;
            }
        }
    }

    finish(payload, output)
}

/// Deserialize an index of either variant from a stream.
///
/// Fully validates the stream before constructing anything visible: a
/// failed load leaves no partially-built index behind.
pub fn load(input: &mut dyn Read) -> Result<AnyIndex> {
    let mut framed = Vec::new();
    input.read_to_end(&mut framed)?;
    if framed.len() < 4 {
        return Err(ProximaError::corrupt("Stream too short"));
    }

    let (payload, crc_bytes) = framed.split_at(framed.len() - 4);
    let expected_crc = u32::from_le_bytes(crc_bytes.try_into().unwrap());
    if crc32fast::hash(payload) != expected_crc {
        return Err(ProximaError::corrupt("Checksum mismatch"));
    }

    let mut reader = payload;
    let (variant, metric, dimension) = read_header(&mut reader)?;
    match variant {
        VARIANT_FLAT => load_flat(&mut reader, metric, dimension).map(AnyIndex::Flat),
        VARIANT_HNSW => load_hnsw(&mut reader, metric, dimension).map(AnyIndex::Hnsw),
        _ => Err(ProximaError::corrupt(format!(
            "Unknown index variant tag: {variant}"
        ))),
    }
}

/// Atomically write an index to a file: the stream goes to a `.tmp`
/// sibling first and is renamed into place only after a successful flush.
pub fn save_to_path<P: AsRef<Path>>(index: &dyn VectorIndex, path: P) -> Result<()> {
    let path = path.as_ref();
    let tmp_path = path.with_extension("tmp");

    let mut file = File::create(&tmp_path)?;
    index.save(&mut file)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load an index of either variant from a file.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<AnyIndex> {
    let mut file = File::open(path)?;
    load(&mut file)
}

fn write_header(
    payload: &mut Vec<u8>,
    variant: u8,
    metric: DistanceMetric,
    dimension: usize,
) -> Result<()> {
    payload.extend_from_slice(MAGIC);
    payload.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    payload.write_u8(variant)?;
    payload.write_u8(metric.tag())?;
    payload.write_u32::<LittleEndian>(dimension as u32)?;
    Ok(())
}

fn read_header(reader: &mut &[u8]) -> Result<(u8, DistanceMetric, usize)> {
    let mut magic = [0u8; 4];
    read_exact(reader, &mut magic)?;
    if &magic != MAGIC {
        return Err(ProximaError::corrupt("Bad magic bytes"));
    }

    let version = read_u16(reader)?;
    if version != FORMAT_VERSION {
        return Err(ProximaError::corrupt(format!(
            "Unsupported format version: {version}"
        )));
    }

    let variant = read_u8(reader)?;
    let metric = DistanceMetric::from_tag(read_u8(reader)?)?;
    let dimension = read_u32(reader)? as usize;
    if dimension == 0 {
        return Err(ProximaError::corrupt("Dimension must be > 0"));
    }

    Ok((variant, metric, dimension))
}

fn write_vector(payload: &mut Vec<u8>, vector: &Vector) -> Result<()> {
    for &value in &vector.data {
        payload.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}

fn finish(payload: Vec<u8>, output: &mut dyn Write) -> Result<()> {
    let crc = crc32fast::hash(&payload);
    output.write_all(&payload)?;
    output.write_u32::<LittleEndian>(crc)?;
    output.flush()?;
    Ok(())
}

fn load_flat(reader: &mut &[u8], metric: DistanceMetric, dimension: usize) -> Result<FlatIndex> {
    let count = read_u64(reader)? as usize;
    check_plausible(reader, count, 8 + dimension * 4)?;

    let mut entries = Vec::with_capacity(count);
    let mut seen = ahash::AHashSet::with_capacity(count);
    for _ in 0..count {
        let id = read_u64(reader)?;
        if !seen.insert(id) {
            return Err(ProximaError::corrupt(format!("Duplicate vector id: {id}")));
        }
        entries.push((id, read_vector_data(reader, dimension)?));
    }
    ensure_consumed(reader)?;

    FlatIndex::from_parts(dimension, metric, entries)
}

fn load_hnsw(reader: &mut &[u8], metric: DistanceMetric, dimension: usize) -> Result<HnswIndex> {
    let m = read_u32(reader)? as usize;
    let ef_construction = read_u32(reader)? as usize;
    let ef_search = read_u32(reader)? as usize;
    let seed = read_u64(reader)?;

    let config = HnswConfig {
        dimension,
        distance_metric: metric,
        m,
        ef_construction,
        ef_search,
        seed,
    };
    config
        .validate()
        .map_err(|e| ProximaError::corrupt(format!("Invalid persisted parameters: {e}")))?;

    let node_count = read_u64(reader)? as usize;
    let live_count = read_u64(reader)? as usize;
    check_plausible(reader, node_count, 8 + 1 + 4 + dimension * 4)?;

    let has_entry = read_u8(reader)?;
    let entry_slot = read_u32(reader)?;
    let entry_point = match has_entry {
        0 => None,
        1 => Some(entry_slot),
        _ => return Err(ProximaError::corrupt("Bad entry point flag")),
    };

    let mut nodes = Vec::with_capacity(node_count);
    let mut seen = ahash::AHashSet::with_capacity(node_count);
    let mut live_seen = 0usize;
    for _ in 0..node_count {
        let id = read_u64(reader)?;
        if !seen.insert(id) {
            return Err(ProximaError::corrupt(format!("Duplicate vector id: {id}")));
        }

        let deleted = match read_u8(reader)? {
            0 => false,
            1 => true,
            flag => {
                return Err(ProximaError::corrupt(format!(
                    "Bad tombstone flag: {flag}"
                )));
            }
        };
        if !deleted {
            live_seen += 1;
        }

        let top_layer = read_u32(reader)? as usize;
        if top_layer > 63 {
            return Err(ProximaError::corrupt(format!(
                "Implausible top layer: {top_layer}"
            )));
        }

        let vector = read_vector_data(reader, dimension)?;

        let mut node = HnswNode::new(id, vector, top_layer);
        node.deleted = deleted;
        for layer in 0..=top_layer {
            let neighbor_count = read_u32(reader)? as usize;
            check_plausible(reader, neighbor_count, 4)?;
            let mut neighbors = Vec::with_capacity(neighbor_count);
            for _ in 0..neighbor_count {
                neighbors.push(read_u32(reader)?);
            }
            node.neighbors[layer] = neighbors;
        }
        nodes.push(node);
    }
    ensure_consumed(reader)?;

    if live_seen != live_count {
        return Err(ProximaError::corrupt(format!(
            "Live vector count mismatch: header says {live_count}, records hold {live_seen}"
        )));
    }

    // Every edge and the entry point must land on a resident node.
    let limit = nodes.len() as u32;
    if let Some(entry) = entry_point
        && entry >= limit
    {
        return Err(ProximaError::corrupt(format!(
            "Entry point references missing node: {entry}"
        )));
    }
    if entry_point.is_none() && !nodes.is_empty() {
        return Err(ProximaError::corrupt(
            "Non-empty graph without an entry point",
        ));
    }
    for node in &nodes {
        for neighbors in &node.neighbors {
            for &slot in neighbors {
                if slot >= limit {
                    return Err(ProximaError::corrupt(format!(
                        "Neighbor list references missing node: {slot}"
                    )));
                }
            }
        }
    }

    HnswIndex::from_parts(config, nodes, entry_point)
}

fn read_vector_data(reader: &mut &[u8], dimension: usize) -> Result<Vector> {
    let mut data = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let value = read_f32(reader)?;
        if !value.is_finite() {
            return Err(ProximaError::corrupt(
                "Vector record contains NaN or infinite values",
            ));
        }
        data.push(value);
    }
    Ok(Vector::new(data))
}

/// Reject record counts that could not possibly fit in the remaining
/// bytes, before allocating for them.
fn check_plausible(reader: &&[u8], count: usize, min_record_size: usize) -> Result<()> {
    if count.checked_mul(min_record_size).is_none_or(|needed| needed > reader.len()) {
        return Err(ProximaError::corrupt(format!(
            "Declared count {count} exceeds stream size"
        )));
    }
    Ok(())
}

fn ensure_consumed(reader: &&[u8]) -> Result<()> {
    if !reader.is_empty() {
        return Err(ProximaError::corrupt(format!(
            "{} trailing bytes after index records",
            reader.len()
        )));
    }
    Ok(())
}

/// Truncated streams surface as `CorruptIndex`, not as bare I/O errors.
fn eof_as_corrupt(error: std::io::Error) -> ProximaError {
    if error.kind() == std::io::ErrorKind::UnexpectedEof {
        ProximaError::corrupt("Unexpected end of stream")
    } else {
        ProximaError::Io(error)
    }
}

fn read_exact(reader: &mut &[u8], buf: &mut [u8]) -> Result<()> {
    Read::read_exact(reader, buf).map_err(eof_as_corrupt)
}

fn read_u8(reader: &mut &[u8]) -> Result<u8> {
    ReadBytesExt::read_u8(reader).map_err(eof_as_corrupt)
}

fn read_u16(reader: &mut &[u8]) -> Result<u16> {
    reader.read_u16::<LittleEndian>().map_err(eof_as_corrupt)
}

fn read_u32(reader: &mut &[u8]) -> Result<u32> {
    reader.read_u32::<LittleEndian>().map_err(eof_as_corrupt)
}

fn read_u64(reader: &mut &[u8]) -> Result<u64> {
    reader.read_u64::<LittleEndian>().map_err(eof_as_corrupt)
}

fn read_f32(reader: &mut &[u8]) -> Result<f32> {
    reader.read_f32::<LittleEndian>().map_err(eof_as_corrupt)
}

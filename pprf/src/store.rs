//! Byte encoding of a punctured key.
//!
//! All integers are little-endian:
//!
//! ```text
//! magic      4 bytes  "GGMP"
//! version    u8       1
//! tree_depth u8
//! key_size   u8
//! punctures  u64
//! count      u32      number of records
//! record*    path_len: u8 | path_bits: ceil(path_len / 8) bytes | key: key_size bytes
//! ```
//!
//! `path_bits` packs the directions most significant bit first, `1` for
//! right, and unused trailing bits must be zero. Records may come in any
//! order; decoding sorts and validates them before anything is returned.

use log::debug;
use zeroize::Zeroizing;

use crate::ggm::{Node, Params, GGM};
use crate::key::Key;
use crate::path::{Direction, Path};
use crate::PPRFError;

pub const MAGIC: &[u8; 4] = b"GGMP";
pub const VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 1 + 1 + 8 + 4;

pub fn encode(pprf: &GGM) -> Result<Zeroizing<Vec<u8>>, PPRFError> {
    let params = pprf.params();
    let frontier = pprf.frontier();
    let key_size = u8::try_from(params.key_size()).map_err(|_| PPRFError::BadParams {
        reason: format!("key size {} does not fit the store format", params.key_size()),
    })?;
    let count = u32::try_from(frontier.len()).map_err(|_| PPRFError::BadParams {
        reason: format!("{} frontier entries do not fit the store format", frontier.len()),
    })?;

    let mut out = Zeroizing::new(Vec::with_capacity(
        HEADER_LEN + frontier.len() * (1 + 8 + params.key_size()),
    ));
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(params.tree_depth());
    out.push(key_size);
    out.extend_from_slice(&pprf.num_punctures().to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    for node in frontier {
        write_node(&mut out, node);
    }
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<GGM, PPRFError> {
    let mut reader = Reader { buf: bytes };
    if reader.take(MAGIC.len(), "magic")? != MAGIC {
        return Err(malformed("bad magic"));
    }
    let version = reader.u8("version")?;
    if version != VERSION {
        return Err(malformed(format!("unsupported version {}", version)));
    }
    let tree_depth = reader.u8("tree depth")?;
    let key_size = reader.u8("key size")?;
    let params = Params::new(tree_depth, usize::from(key_size))
        .map_err(|e| malformed(format!("header: {}", e)))?;
    let punctures = u64::from_le_bytes(reader.array("puncture count")?);
    let count = u32::from_le_bytes(reader.array("record count")?);

    // Each record is at least one length byte plus a key.
    let min_record = 1 + params.key_size();
    if (count as usize).saturating_mul(min_record) > reader.buf.len() {
        return Err(malformed(format!(
            "{} records cannot fit in {} bytes",
            count,
            reader.buf.len()
        )));
    }

    let mut frontier = Vec::with_capacity(count as usize);
    for _ in 0..count {
        frontier.push(read_node(&mut reader, params)?);
    }
    if !reader.buf.is_empty() {
        return Err(malformed(format!(
            "{} trailing bytes after last record",
            reader.buf.len()
        )));
    }
    debug!("Decoded store with {} records", count);
    GGM::from_frontier(params, frontier, punctures)
}

impl GGM {
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>, PPRFError> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PPRFError> {
        decode(bytes)
    }
}

fn write_node(out: &mut Vec<u8>, node: &Node) {
    let directions = node.prefix.directions();
    // Depth is capped well below 256 by `Params`.
    out.push(directions.len() as u8);
    for chunk in directions.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, d)| acc | (u8::from(d.is_right()) << (7 - i)));
        out.push(byte);
    }
    out.extend_from_slice(node.key.as_bytes());
}

fn read_node(reader: &mut Reader<'_>, params: Params) -> Result<Node, PPRFError> {
    let path_len = reader.u8("path length")?;
    if path_len > params.tree_depth() {
        return Err(malformed(format!(
            "path length {} exceeds tree depth {}",
            path_len,
            params.tree_depth()
        )));
    }
    let path_len = usize::from(path_len);
    let bits = reader.take((path_len + 7) / 8, "path bits")?;
    let directions: Vec<Direction> = (0..path_len)
        .map(|i| Direction::from_bit((bits[i / 8] >> (7 - i % 8)) & 1 == 1))
        .collect();
    if path_len % 8 != 0 {
        let padding = bits[path_len / 8] & (0xffu8 >> (path_len % 8));
        if padding != 0 {
            return Err(malformed("non-zero padding bits in path"));
        }
    }
    let key = Key::from_bytes(reader.take(params.key_size(), "key")?);
    Ok(Node::new(Path::new(directions), key))
}

fn malformed(reason: impl Into<String>) -> PPRFError {
    PPRFError::MalformedStore {
        reason: reason.into(),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], PPRFError> {
        if self.buf.len() < n {
            return Err(malformed(format!(
                "truncated {}: need {} bytes, have {}",
                what,
                n,
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self, what: &str) -> Result<u8, PPRFError> {
        Ok(self.take(1, what)?[0])
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], PPRFError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }
}

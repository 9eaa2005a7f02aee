//! Pure functions packing a payload together with its relevant keys.
//!
//! Stored layout:
//!
//! ```text
//! "RLC" 0x01 | u32 BE key count | (u32 BE key length, key bytes)* | payload
//! ```
//!
//! Keys are length-prefixed, so no character of the key alphabet is reserved.
//! Values written without this layer (no magic prefix) decode as an unframed
//! payload with no relevant keys.

/// Prefix marking a framed value, including the format version.
pub const MAGIC: &[u8; 4] = b"RLC\x01";

const LEN_SIZE: usize = 4;

/// A decoded stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Keys to delete together with this entry, in write order.
    pub relevant_keys: Vec<String>,
    /// The opaque payload supplied by the caller.
    pub payload: Vec<u8>,
    /// False when the value carried no relevance header at all.
    pub framed: bool,
}

impl Envelope {
    fn unframed(bytes: &[u8]) -> Self {
        Self {
            relevant_keys: Vec::new(),
            payload: bytes.to_vec(),
            framed: false,
        }
    }
}

/// Encodes a payload and its relevant keys into a stored value.
///
/// The header is always written, even when `relevant_keys` is empty.
pub fn encode<K: AsRef<str>>(payload: &[u8], relevant_keys: &[K]) -> Vec<u8> {
    let keys_len: usize = relevant_keys
        .iter()
        .map(|k| LEN_SIZE + k.as_ref().len())
        .sum();
    let mut out = Vec::with_capacity(MAGIC.len() + LEN_SIZE + keys_len + payload.len());

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&len_prefix(relevant_keys.len()));
    for key in relevant_keys {
        let key = key.as_ref().as_bytes();
        out.extend_from_slice(&len_prefix(key.len()));
        out.extend_from_slice(key);
    }
    out.extend_from_slice(payload);
    out
}

/// Decodes a stored value.
///
/// Never fails: a value without the magic prefix, or with a truncated or
/// non UTF-8 header, is returned whole as an unframed payload.
pub fn decode(bytes: &[u8]) -> Envelope {
    let Some(mut rest) = bytes.strip_prefix(MAGIC.as_slice()) else {
        return Envelope::unframed(bytes);
    };

    let Some(count) = read_len(&mut rest) else {
        return Envelope::unframed(bytes);
    };

    // Each key needs at least its length prefix, bounding the allocation.
    if count > rest.len() / LEN_SIZE {
        return Envelope::unframed(bytes);
    }

    let mut relevant_keys = Vec::with_capacity(count);
    for _ in 0..count {
        let Some(key) = read_key(&mut rest) else {
            return Envelope::unframed(bytes);
        };
        relevant_keys.push(key);
    }

    Envelope {
        relevant_keys,
        payload: rest.to_vec(),
        framed: true,
    }
}

/// Returns only the payload of a stored value.
pub fn decode_payload(bytes: &[u8]) -> Vec<u8> {
    decode(bytes).payload
}

fn len_prefix(len: usize) -> [u8; LEN_SIZE] {
    // Keys and key counts beyond u32::MAX are not representable by the store.
    u32::try_from(len).unwrap_or(u32::MAX).to_be_bytes()
}

fn read_len(rest: &mut &[u8]) -> Option<usize> {
    let (head, tail) = rest.split_first_chunk::<LEN_SIZE>()?;
    *rest = tail;
    usize::try_from(u32::from_be_bytes(*head)).ok()
}

fn read_key(rest: &mut &[u8]) -> Option<String> {
    let len = read_len(rest)?;
    if len > rest.len() {
        return None;
    }
    let (key, tail) = rest.split_at(len);
    *rest = tail;
    String::from_utf8(key.to_vec()).ok()
}

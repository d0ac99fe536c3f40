//! Constant values with structural hashing and canonical ordering
//!
//! Composite constants (pair, list, map, struct) carry a hash computed once at
//! construction by folding child hashes through Szudzik pairing, seeded per
//! shape tag. Map and struct entries are stored sorted by key hash (ties by
//! canonical order), so semantically equal maps are bit-identical.

use crate::{ModelError, ModelResult};
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// Shape tags, also the hash seeds telling identical children apart per shape.
const TAG_NAME: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_BYTES: u8 = 3;
const TAG_NUMBER: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_TIME: u8 = 6;
const TAG_DURATION: u8 = 7;
const TAG_PAIR: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_MAP: u8 = 10;
const TAG_STRUCT: u8 = 11;

const SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Szudzik pairing over wrapping u64 arithmetic.
fn szudzik(a: u64, b: u64) -> u64 {
    if a >= b {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    } else {
        b.wrapping_mul(b).wrapping_add(a)
    }
}

fn composite_hash(tag: u8, children: impl Iterator<Item = u64>) -> u64 {
    let mut acc = SEED.wrapping_mul(u64::from(tag));
    for child in children {
        acc = szudzik(acc, child);
    }
    acc
}

fn leaf_hash(tag: u8, write: impl FnOnce(&mut FxHasher)) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u8(tag);
    write(&mut hasher);
    hasher.finish()
}

/// The kind of a constant, in canonical order rank
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstantKind {
    /// Slash-rooted name path
    Name,
    /// Unicode string
    String,
    /// Byte sequence
    Bytes,
    /// Signed 64-bit integer
    Number,
    /// IEEE-754 double
    Float64,
    /// Nanoseconds since Unix epoch, UTC
    Time,
    /// Signed nanoseconds
    Duration,
    /// Ordered pair
    Pair,
    /// Sequence of constants
    List,
    /// Key-value mapping in canonical entry order
    Map,
    /// Labelled fields in canonical entry order
    Struct,
}

/// Pair payload with precomputed hash
#[derive(Debug)]
pub struct PairValue {
    pub(crate) hash: u64,
    /// First component
    pub first: Constant,
    /// Second component
    pub second: Constant,
}

/// List payload with precomputed hash
#[derive(Debug)]
pub struct ListValue {
    pub(crate) hash: u64,
    pub(crate) items: Vec<Constant>,
}

/// Map/struct payload: entries sorted by key hash, ties by canonical order
#[derive(Debug)]
pub struct EntriesValue {
    pub(crate) hash: u64,
    pub(crate) entries: Vec<(Constant, Constant)>,
}

/// A constant term value
///
/// Immutable once constructed; composites share children via `Arc`.
#[derive(Clone)]
pub enum Constant {
    /// Slash-rooted path, e.g. `/foo/bar`
    Name(Arc<str>),
    /// Unicode text
    String(Arc<str>),
    /// Arbitrary bytes
    Bytes(Arc<[u8]>),
    /// Signed 64-bit integer
    Number(i64),
    /// IEEE-754 double, compared and hashed by bit pattern
    Float64(f64),
    /// Time instant, nanoseconds since Unix epoch (UTC)
    Time(i64),
    /// Signed duration in nanoseconds
    Duration(i64),
    /// Ordered pair of constants
    Pair(Arc<PairValue>),
    /// List of constants
    List(Arc<ListValue>),
    /// Map with canonical entry order
    Map(Arc<EntriesValue>),
    /// Struct with canonical entry order
    Struct(Arc<EntriesValue>),
}

impl Constant {
    /// Create a name constant, validating the slash-rooted path shape
    pub fn name(path: impl Into<String>) -> ModelResult<Constant> {
        let path = path.into();
        if !is_valid_name(&path) {
            return Err(ModelError::InvalidName(path));
        }
        Ok(Constant::Name(Arc::from(path.as_str())))
    }

    // Internal constructor for statically-known-valid names (e.g. /any).
    pub(crate) fn name_unchecked(path: &str) -> Constant {
        debug_assert!(is_valid_name(path));
        Constant::Name(Arc::from(path))
    }

    /// Create a string constant
    pub fn string(value: impl AsRef<str>) -> Constant {
        Constant::String(Arc::from(value.as_ref()))
    }

    /// Create a bytes constant
    pub fn bytes(value: impl AsRef<[u8]>) -> Constant {
        Constant::Bytes(Arc::from(value.as_ref()))
    }

    /// Create a number constant
    pub fn number(value: i64) -> Constant {
        Constant::Number(value)
    }

    /// Create a float constant
    pub fn float(value: f64) -> Constant {
        Constant::Float64(value)
    }

    /// Create a time instant from nanoseconds since the Unix epoch
    pub fn time(nanos: i64) -> Constant {
        Constant::Time(nanos)
    }

    /// Create a duration from signed nanoseconds
    pub fn duration(nanos: i64) -> Constant {
        Constant::Duration(nanos)
    }

    /// Create a pair
    pub fn pair(first: Constant, second: Constant) -> Constant {
        let hash = composite_hash(
            TAG_PAIR,
            [first.hash_value(), second.hash_value()].into_iter(),
        );
        Constant::Pair(Arc::new(PairValue { hash, first, second }))
    }

    /// Create a list; the empty list is the canonical nil value
    pub fn list(items: Vec<Constant>) -> Constant {
        let hash = composite_hash(TAG_LIST, items.iter().map(Constant::hash_value));
        Constant::List(Arc::new(ListValue { hash, items }))
    }

    /// The canonical empty list
    pub fn empty_list() -> Constant {
        Constant::list(Vec::new())
    }

    /// Create a map from key-value pairs
    ///
    /// Entries are sorted by key hash (ties by canonical order) so that maps
    /// built from the same pairs in any order are identical. On duplicate
    /// keys the last occurrence wins.
    pub fn map(entries: Vec<(Constant, Constant)>) -> Constant {
        Constant::Map(Arc::new(canonical_entries(TAG_MAP, entries)))
    }

    /// The canonical empty map
    pub fn empty_map() -> Constant {
        Constant::map(Vec::new())
    }

    /// Create a struct from field-value pairs, canonicalised like maps
    pub fn struct_(entries: Vec<(Constant, Constant)>) -> Constant {
        Constant::Struct(Arc::new(canonical_entries(TAG_STRUCT, entries)))
    }

    /// The canonical empty struct
    pub fn empty_struct() -> Constant {
        Constant::struct_(Vec::new())
    }

    /// The kind tag of this constant
    pub fn kind(&self) -> ConstantKind {
        match self {
            Constant::Name(_) => ConstantKind::Name,
            Constant::String(_) => ConstantKind::String,
            Constant::Bytes(_) => ConstantKind::Bytes,
            Constant::Number(_) => ConstantKind::Number,
            Constant::Float64(_) => ConstantKind::Float64,
            Constant::Time(_) => ConstantKind::Time,
            Constant::Duration(_) => ConstantKind::Duration,
            Constant::Pair(_) => ConstantKind::Pair,
            Constant::List(_) => ConstantKind::List,
            Constant::Map(_) => ConstantKind::Map,
            Constant::Struct(_) => ConstantKind::Struct,
        }
    }

    /// Structural hash; composites return the hash precomputed at construction
    pub fn hash_value(&self) -> u64 {
        match self {
            Constant::Name(s) => leaf_hash(TAG_NAME, |h| h.write(s.as_bytes())),
            Constant::String(s) => leaf_hash(TAG_STRING, |h| h.write(s.as_bytes())),
            Constant::Bytes(b) => leaf_hash(TAG_BYTES, |h| h.write(b)),
            Constant::Number(n) => leaf_hash(TAG_NUMBER, |h| h.write_i64(*n)),
            Constant::Float64(f) => leaf_hash(TAG_FLOAT, |h| h.write_u64(f.to_bits())),
            Constant::Time(n) => leaf_hash(TAG_TIME, |h| h.write_i64(*n)),
            Constant::Duration(n) => leaf_hash(TAG_DURATION, |h| h.write_i64(*n)),
            Constant::Pair(p) => p.hash,
            Constant::List(l) => l.hash,
            Constant::Map(m) => m.hash,
            Constant::Struct(s) => s.hash,
        }
    }

    /// Name path, if this is a name constant
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Constant::Name(s) => Some(s),
            _ => None,
        }
    }

    /// String value, if this is a string constant
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte contents, if this is a bytes constant
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Constant::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Integer value, if this is a number constant
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Constant::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Float value, if this is a float constant
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Constant::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Epoch nanoseconds, if this is a time constant
    pub fn as_time(&self) -> Option<i64> {
        match self {
            Constant::Time(n) => Some(*n),
            _ => None,
        }
    }

    /// Nanoseconds, if this is a duration constant
    pub fn as_duration(&self) -> Option<i64> {
        match self {
            Constant::Duration(n) => Some(*n),
            _ => None,
        }
    }

    /// Pair components, if this is a pair
    pub fn as_pair(&self) -> Option<(&Constant, &Constant)> {
        match self {
            Constant::Pair(p) => Some((&p.first, &p.second)),
            _ => None,
        }
    }

    /// List items, if this is a list
    pub fn list_items(&self) -> Option<&[Constant]> {
        match self {
            Constant::List(l) => Some(&l.items),
            _ => None,
        }
    }

    /// Entries in canonical order, if this is a map or struct
    pub fn entries(&self) -> Option<&[(Constant, Constant)]> {
        match self {
            Constant::Map(m) | Constant::Struct(m) => Some(&m.entries),
            _ => None,
        }
    }

    /// Look up a key by structural equality in a map or struct
    pub fn get_entry(&self, key: &Constant) -> Option<&Constant> {
        let entries = self.entries()?;
        let key_hash = key.hash_value();
        // Entries are sorted by key hash; scan the collision run.
        let start = entries.partition_point(|(k, _)| k.hash_value() < key_hash);
        entries[start..]
            .iter()
            .take_while(|(k, _)| k.hash_value() == key_hash)
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Name path segments (without the leading slash), if this is a name
    pub fn name_segments(&self) -> Option<Vec<&str>> {
        self.as_name().map(|n| n[1..].split('/').collect())
    }

    /// True if this constant contains no child constants
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self,
            Constant::Pair(_) | Constant::List(_) | Constant::Map(_) | Constant::Struct(_)
        )
    }
}

fn canonical_entries(tag: u8, mut entries: Vec<(Constant, Constant)>) -> EntriesValue {
    // Last occurrence of a duplicate key wins.
    entries.reverse();
    let mut seen: Vec<&Constant> = Vec::new();
    let mut kept: Vec<(Constant, Constant)> = Vec::with_capacity(entries.len());
    for (k, v) in &entries {
        if !seen.iter().any(|s| *s == k) {
            kept.push((k.clone(), v.clone()));
            seen.push(k);
        }
    }
    kept.sort_by(|(a, _), (b, _)| {
        a.hash_value()
            .cmp(&b.hash_value())
            .then_with(|| a.cmp(b))
    });
    let hash = composite_hash(
        tag,
        kept.iter()
            .flat_map(|(k, v)| [k.hash_value(), v.hash_value()]),
    );
    EntriesValue { hash, entries: kept }
}

pub(crate) fn is_valid_name(path: &str) -> bool {
    match path.strip_prefix('/') {
        Some(rest) => !rest.is_empty() && rest.split('/').all(|seg| !seg.is_empty()),
        None => false,
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Name(a), Constant::Name(b)) => a == b,
            (Constant::String(a), Constant::String(b)) => a == b,
            (Constant::Bytes(a), Constant::Bytes(b)) => a == b,
            (Constant::Number(a), Constant::Number(b)) => a == b,
            (Constant::Float64(a), Constant::Float64(b)) => a.to_bits() == b.to_bits(),
            (Constant::Time(a), Constant::Time(b)) => a == b,
            (Constant::Duration(a), Constant::Duration(b)) => a == b,
            (Constant::Pair(a), Constant::Pair(b)) => {
                a.hash == b.hash && a.first == b.first && a.second == b.second
            }
            (Constant::List(a), Constant::List(b)) => a.hash == b.hash && a.items == b.items,
            (Constant::Map(a), Constant::Map(b)) => a.hash == b.hash && a.entries == b.entries,
            (Constant::Struct(a), Constant::Struct(b)) => {
                a.hash == b.hash && a.entries == b.entries
            }
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl PartialOrd for Constant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Constant {
    /// Canonical total order: kind rank first, then value; composites compare
    /// lexicographically over children. Used for map key tie-breaks and for
    /// deterministic result ordering.
    fn cmp(&self, other: &Self) -> Ordering {
        let by_kind = self.kind().cmp(&other.kind());
        if by_kind != Ordering::Equal {
            return by_kind;
        }
        match (self, other) {
            (Constant::Name(a), Constant::Name(b)) => a.cmp(b),
            (Constant::String(a), Constant::String(b)) => a.cmp(b),
            (Constant::Bytes(a), Constant::Bytes(b)) => a.cmp(b),
            (Constant::Number(a), Constant::Number(b)) => a.cmp(b),
            (Constant::Float64(a), Constant::Float64(b)) => a.total_cmp(b),
            (Constant::Time(a), Constant::Time(b)) => a.cmp(b),
            (Constant::Duration(a), Constant::Duration(b)) => a.cmp(b),
            (Constant::Pair(a), Constant::Pair(b)) => a
                .first
                .cmp(&b.first)
                .then_with(|| a.second.cmp(&b.second)),
            (Constant::List(a), Constant::List(b)) => a.items.iter().cmp(b.items.iter()),
            (Constant::Map(a), Constant::Map(b)) | (Constant::Struct(a), Constant::Struct(b)) => {
                a.entries.iter().cmp(b.entries.iter())
            }
            _ => unreachable!("kinds compared equal"),
        }
    }
}

impl std::fmt::Debug for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constant({})", self)
    }
}

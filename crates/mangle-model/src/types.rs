//! Well-known type name constants used in declaration bounds

use crate::constant::{Constant, ConstantKind};

/// Top type; every constant conforms
pub const ANY: &str = "/any";
/// Signed 64-bit integers
pub const NUMBER: &str = "/number";
/// Unicode strings
pub const STRING: &str = "/string";
/// Name constants
pub const NAME: &str = "/name";
/// IEEE-754 doubles
pub const FLOAT64: &str = "/float64";
/// Time instants
pub const TIME: &str = "/time";
/// Durations
pub const DURATION: &str = "/duration";
/// Byte sequences
pub const BYTES: &str = "/bytes";
/// Lists
pub const LIST: &str = "/list";
/// Maps
pub const MAP: &str = "/map";
/// Structs
pub const STRUCT: &str = "/struct";
/// Pairs
pub const PAIR: &str = "/pair";

/// Truth name constant used by predicates returning booleans
pub const TRUE: &str = "/true";
/// Falsity name constant
pub const FALSE: &str = "/false";

const ALL: &[&str] = &[
    ANY, NUMBER, STRING, NAME, FLOAT64, TIME, DURATION, BYTES, LIST, MAP, STRUCT, PAIR,
];

/// The `/any` bound constant
pub fn any() -> Constant {
    Constant::name_unchecked(ANY)
}

/// The `/true` or `/false` name constant
pub fn bool_const(value: bool) -> Constant {
    Constant::name_unchecked(if value { TRUE } else { FALSE })
}

/// The type name constant for a constant kind
pub fn for_kind(kind: ConstantKind) -> Constant {
    let name = match kind {
        ConstantKind::Name => NAME,
        ConstantKind::String => STRING,
        ConstantKind::Bytes => BYTES,
        ConstantKind::Number => NUMBER,
        ConstantKind::Float64 => FLOAT64,
        ConstantKind::Time => TIME,
        ConstantKind::Duration => DURATION,
        ConstantKind::Pair => PAIR,
        ConstantKind::List => LIST,
        ConstantKind::Map => MAP,
        ConstantKind::Struct => STRUCT,
    };
    Constant::name_unchecked(name)
}

/// True if `name` is one of the built-in type names
pub fn is_type_name(name: &str) -> bool {
    ALL.contains(&name)
}

/// True if `value` conforms to the type named `bound`
///
/// Unknown bounds conform nothing; `/any` conforms everything.
pub fn conforms(bound: &str, value: &Constant) -> bool {
    match bound {
        ANY => true,
        NUMBER => value.kind() == ConstantKind::Number,
        STRING => value.kind() == ConstantKind::String,
        NAME => value.kind() == ConstantKind::Name,
        FLOAT64 => value.kind() == ConstantKind::Float64,
        TIME => value.kind() == ConstantKind::Time,
        DURATION => value.kind() == ConstantKind::Duration,
        BYTES => value.kind() == ConstantKind::Bytes,
        LIST => value.kind() == ConstantKind::List,
        MAP => value.kind() == ConstantKind::Map,
        STRUCT => value.kind() == ConstantKind::Struct,
        PAIR => value.kind() == ConstantKind::Pair,
        _ => false,
    }
}

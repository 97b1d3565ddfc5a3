//! Per-call options threaded through the engines and custom codecs.

use crate::wire::ByteOrder;

/// Default cap on lengths resolved from length-carrying fields while
/// unpacking.
pub const DEFAULT_MAX_LEN: usize = 1 << 24;

/// Options for a single pack, unpack or sizeof call.
#[derive(Debug, Clone)]
pub struct Options {
    /// Call-time byte order. When set it dominates any per-field directive.
    pub byte_order: Option<ByteOrder>,
    /// Upper bound accepted for a length read out of another field.
    pub max_len: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            byte_order: None,
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

impl Options {
    pub fn with_order(order: ByteOrder) -> Self {
        Options {
            byte_order: Some(order),
            ..Default::default()
        }
    }
}

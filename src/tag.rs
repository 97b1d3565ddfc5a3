//! The per-field directive language.
//!
//! A directive is a comma-separated token list attached to a field:
//! a type token (`uint16`, `[4]byte`, `[]int32`, `pad`, `skip`), an
//! endianness (`big`, `little`), a cross reference (`sizeof=Name`,
//! `sizefrom=Name`) and the `null-terminated` option.

use crate::errors::{Error, Result};
use crate::wire::{ByteOrder, WireType};

/// A parsed directive: the partial plan entry a single tag contributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub wire: Option<WireType>,
    /// Fixed element count from a `[N]` prefix.
    pub len: Option<usize>,
    /// Set by a `[]` prefix: length determined elsewhere.
    pub seq: bool,
    pub order: Option<ByteOrder>,
    pub sizeof: Option<String>,
    pub sizefrom: Option<String>,
    pub null_terminated: bool,
    pub skip: bool,
}

impl Tag {
    pub fn parse(directive: &str) -> Result<Tag> {
        let mut tag = Tag::default();
        for token in directive.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token {
                "big" => tag.order = Some(ByteOrder::Big),
                "little" => tag.order = Some(ByteOrder::Little),
                "skip" => tag.skip = true,
                "null-terminated" => tag.null_terminated = true,
                _ => {
                    if let Some(name) = token.strip_prefix("sizeof=") {
                        if name.is_empty() {
                            return Err(Error::InvalidArgument("empty sizeof reference".into()));
                        }
                        tag.sizeof = Some(name.to_string());
                    } else if let Some(name) = token.strip_prefix("sizefrom=") {
                        if name.is_empty() {
                            return Err(Error::InvalidArgument("empty sizefrom reference".into()));
                        }
                        tag.sizefrom = Some(name.to_string());
                    } else {
                        parse_type(token, &mut tag)?;
                    }
                }
            }
        }
        if tag.sizeof.is_some() && tag.sizefrom.is_some() {
            return Err(Error::InvalidArgument(
                "`sizeof` and `sizefrom` are mutually exclusive".into(),
            ));
        }
        Ok(tag)
    }
}

fn parse_type(token: &str, tag: &mut Tag) -> Result<()> {
    if tag.wire.is_some() {
        return Err(Error::InvalidArgument(format!(
            "duplicate type token `{token}`"
        )));
    }
    let name = if let Some(rest) = token.strip_prefix("[]") {
        tag.seq = true;
        rest
    } else if let Some(rest) = token.strip_prefix('[') {
        let (count, name) = rest.split_once(']').ok_or_else(|| {
            Error::InvalidArgument(format!("unterminated array count in `{token}`"))
        })?;
        let n: usize = count
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("bad array count in `{token}`")))?;
        if n == 0 {
            return Err(Error::InvalidArgument(format!(
                "array count must be positive in `{token}`"
            )));
        }
        tag.len = Some(n);
        name
    } else {
        token
    };
    match WireType::from_token(name) {
        Some(wire) => {
            tag.wire = Some(wire);
            Ok(())
        }
        None => Err(Error::InvalidArgument(format!(
            "unknown directive token `{token}`"
        ))),
    }
}

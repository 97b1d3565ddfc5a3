//! User-defined wire codecs dispatched by a registered type tag.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::errors::{Error, Result};
use crate::options::Options;

/// A caller-supplied codec for a host type whose wire format is outside the
/// primitive table.
///
/// The engine delegates `Custom` fields entirely to this trait: packing,
/// unpacking (with the resolved length) and sizing. `clone_box`, `eq_codec`
/// and `as_any` give boxed codec values ordinary clone and equality
/// semantics; implement them as
///
/// ```ignore
/// fn clone_box(&self) -> Box<dyn CustomCodec> { Box::new(self.clone()) }
/// fn eq_codec(&self, other: &dyn Any) -> bool {
///     other.downcast_ref::<Self>() == Some(self)
/// }
/// fn as_any(&self) -> &dyn Any { self }
/// ```
pub trait CustomCodec: fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn pack(&self, w: &mut dyn Write, opts: &Options) -> Result<usize>;
    fn unpack(&mut self, r: &mut dyn Read, len: usize, opts: &Options) -> Result<()>;
    fn size(&self, opts: &Options) -> usize;

    fn clone_box(&self) -> Box<dyn CustomCodec>;
    fn eq_codec(&self, other: &dyn Any) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn CustomCodec> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for Box<dyn CustomCodec> {
    fn eq(&self, other: &Self) -> bool {
        self.eq_codec(other.as_any())
    }
}

/// Produces a fresh zero instance of a registered codec.
pub type CustomFactory = fn() -> Box<dyn CustomCodec>;

fn registry() -> &'static RwLock<HashMap<&'static str, CustomFactory>> {
    static REGISTRY: OnceLock<RwLock<HashMap<&'static str, CustomFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a codec factory under a type tag. A later registration for the
/// same tag replaces the earlier one.
pub fn register_custom(tag: &'static str, factory: CustomFactory) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(tag, factory);
}

pub(crate) fn instantiate(tag: &str) -> Result<Box<dyn CustomCodec>> {
    let reg = registry().read().unwrap_or_else(PoisonError::into_inner);
    match reg.get(tag) {
        Some(factory) => Ok(factory()),
        None => Err(Error::TypeMismatch(format!(
            "no custom codec registered for `{tag}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Marker(u8);

    impl fmt::Display for Marker {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "marker:{}", self.0)
        }
    }

    impl CustomCodec for Marker {
        fn pack(&self, w: &mut dyn Write, _opts: &Options) -> Result<usize> {
            w.write_all(&[self.0])?;
            Ok(1)
        }

        fn unpack(&mut self, r: &mut dyn Read, _len: usize, _opts: &Options) -> Result<()> {
            let mut byte = [0u8; 1];
            r.read_exact(&mut byte).map_err(Error::from_io)?;
            self.0 = byte[0];
            Ok(())
        }

        fn size(&self, _opts: &Options) -> usize {
            1
        }

        fn clone_box(&self) -> Box<dyn CustomCodec> {
            Box::new(self.clone())
        }

        fn eq_codec(&self, other: &dyn Any) -> bool {
            other.downcast_ref::<Marker>() == Some(self)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_registry_instantiates() {
        register_custom("marker", || Box::<Marker>::default());
        let codec = instantiate("marker").unwrap();
        assert_eq!(codec.size(&Options::default()), 1);
    }

    #[test]
    fn test_unknown_tag_is_type_mismatch() {
        assert!(matches!(
            instantiate("no-such-tag"),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_boxed_equality() {
        let a: Box<dyn CustomCodec> = Box::new(Marker(7));
        let b: Box<dyn CustomCodec> = Box::new(Marker(7));
        let c: Box<dyn CustomCodec> = Box::new(Marker(9));
        assert!(a == b);
        assert!(a != c);
    }
}

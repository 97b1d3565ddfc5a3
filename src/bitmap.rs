//! Symbolic bitmaps: sets of named flags that travel as fixed-width integers.
//!
//! A [SymbolMap] associates symbol names with 64-bit values, either as bit
//! positions ([SymbolMap::bitmap]) or verbatim ([SymbolMap::enumeration]).
//! A [Bitmap] holds the symbols a record currently carries; its integer wire
//! form is a pure function of the symbols and the map, with case-insensitive
//! lookup.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{Error, Result};

/// Mapping from symbolic names to 64-bit values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolMap {
    entries: BTreeMap<String, u64>,
}

impl SymbolMap {
    /// Builds a map where each value is a bit position: `name -> 1 << value`.
    /// Positions of 64 or more map to zero.
    pub fn bitmap<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, u64)>,
    {
        SymbolMap {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), if v < 64 { 1u64 << v } else { 0 }))
                .collect(),
        }
    }

    /// Builds a map where values are used verbatim.
    pub fn enumeration<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, u64)>,
    {
        SymbolMap {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Extends the map with the numeric range `lo..=hi` stepping by `step`:
    /// each integer is keyed by its decimal string form. Explicit entries win
    /// over range entries.
    pub fn with_range(mut self, lo: u64, hi: u64, step: u64) -> Self {
        if step == 0 {
            return self;
        }
        let mut n = lo;
        while n <= hi {
            self.entries.entry(n.to_string()).or_insert(n);
            match n.checked_add(step) {
                Some(next) => n = next,
                None => break,
            }
        }
        self
    }

    /// Exact-case lookup.
    pub fn get(&self, symbol: &str) -> Option<u64> {
        self.entries.get(symbol).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-folded copy used for symbol lookup.
    fn folded(&self) -> BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|(k, v)| (k.to_lowercase(), *v))
            .collect()
    }
}

/// An ordered, duplicate-free set of symbol names.
///
/// Created empty, populated from decoded text or decoded wire bytes, and
/// serialized back to either. Comparison is set equality, case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Bitmap {
    symbols: Vec<String>,
}

impl Bitmap {
    pub fn new() -> Self {
        Bitmap::default()
    }

    /// Builds a container from symbols, coalescing duplicates and keeping
    /// first-seen order.
    pub fn from_symbols<S, I>(symbols: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let mut bitmap = Bitmap::new();
        for symbol in symbols {
            bitmap.push(symbol);
        }
        bitmap
    }

    /// Decodes an integer against a symbol map.
    pub fn from_value(value: u64, map: &SymbolMap) -> Self {
        let mut bitmap = Bitmap::new();
        bitmap.assign(value, map);
        bitmap
    }

    /// Appends a symbol unless it is already present.
    pub fn push(&mut self, symbol: impl Into<String>) {
        let symbol = symbol.into();
        if !self.symbols.contains(&symbol) {
            self.symbols.push(symbol);
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Folds the symbols into their combined integer value.
    ///
    /// Lookup is case-insensitive and empty symbols are skipped; any other
    /// symbol missing from the map is an [Error::UnknownSymbol].
    pub fn value(&self, map: &SymbolMap) -> Result<u64> {
        let folded = map.folded();
        let mut n = 0u64;
        for symbol in &self.symbols {
            if symbol.is_empty() {
                continue;
            }
            match folded.get(&symbol.to_lowercase()) {
                Some(mask) => n |= mask,
                None => return Err(Error::UnknownSymbol(symbol.clone())),
            }
        }
        Ok(n)
    }

    /// Replaces the symbols with every map entry whose mask is fully set in
    /// `value`. A zero value yields an empty container.
    pub fn assign(&mut self, value: u64, map: &SymbolMap) {
        self.symbols.clear();
        if value == 0 {
            return;
        }
        for (symbol, mask) in map.iter() {
            if mask & value == mask {
                self.symbols.push(symbol.to_string());
            }
        }
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        let fold = |bitmap: &Bitmap| -> BTreeSet<String> {
            bitmap.symbols.iter().map(|s| s.to_lowercase()).collect()
        };
        fold(self) == fold(other)
    }
}

impl Eq for Bitmap {}

#[cfg(feature = "serde")]
mod serde_impls {
    //! Text-form contract: a container is loadable from either a single
    //! symbol or a sequence of symbols, and writes itself back the same way.

    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    use super::Bitmap;

    impl Serialize for Bitmap {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if self.symbols.len() == 1 {
                serializer.serialize_str(&self.symbols[0])
            } else {
                self.symbols.serialize(serializer)
            }
        }
    }

    impl<'de> Deserialize<'de> for Bitmap {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct SymbolsVisitor;

            impl<'de> Visitor<'de> for SymbolsVisitor {
                type Value = Bitmap;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str("a symbol or a list of symbols")
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Bitmap, E> {
                    let mut bitmap = Bitmap::new();
                    bitmap.push(v);
                    Ok(bitmap)
                }

                fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bitmap, A::Error> {
                    let mut bitmap = Bitmap::new();
                    while let Some(symbol) = seq.next_element::<String>()? {
                        bitmap.push(symbol);
                    }
                    Ok(bitmap)
                }
            }

            deserializer.deserialize_any(SymbolsVisitor)
        }
    }
}

use crate::error::{Error, Result};
use crate::mime::MimeDescriptor;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;

/// One content-addressed piece of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub hash: String,
    /// Inclusive byte range `(start, end)` within the assembled resource.
    pub range: (u64, u64),
}

impl Chunk {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.range.1.saturating_sub(self.range.0).saturating_add(1)
    }
}

/// A logical resource assembled from its chunks in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCatalogEntry {
    pub key: String,
    pub mime: MimeDescriptor,
    pub size: u64,
    pub chunks: Vec<Chunk>,
}

impl ResourceCatalogEntry {
    /// Sum of the chunk range lengths, `None` if it does not fit in a `u64`.
    pub fn declared_len(&self) -> Option<u64> {
        self.chunks
            .iter()
            .try_fold(0u64, |total, chunk| total.checked_add(chunk.len()))
    }
}

/// Manifest mapping resource keys to their chunk lists (`resources.json`).
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    entries: HashMap<String, ResourceCatalogEntry>,
}

impl ResourceCatalog {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let raw: HashMap<String, RawEntry> = serde_json::from_slice(bytes)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, entry) in raw {
            let mime = MimeDescriptor::parse(&entry.mime).map_err(|e| {
                Error::malformed(format!("resource {key} has an invalid mime: {e}"))
            })?;
            let chunks = entry
                .chunks
                .0
                .into_iter()
                .map(|(hash, range)| {
                    let (start, end) = range.bounds();
                    if end < start {
                        return Err(Error::malformed(format!(
                            "chunk {hash} of {key} has an inverted range [{start}, {end}]"
                        )));
                    }
                    if (end - start).checked_add(1).is_none() {
                        return Err(Error::malformed(format!(
                            "chunk {hash} of {key} spans more than u64::MAX bytes"
                        )));
                    }
                    Ok(Chunk {
                        hash,
                        range: (start, end),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let entry = ResourceCatalogEntry {
                key: key.clone(),
                mime,
                size: entry.size,
                chunks,
            };
            if entry.declared_len().is_none() {
                return Err(Error::malformed(format!(
                    "chunks of {key} add up to more than u64::MAX bytes"
                )));
            }
            entries.insert(key, entry);
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, entry: ResourceCatalogEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&ResourceCatalogEntry> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
struct RawEntry {
    mime: String,
    size: u64,
    chunks: OrderedChunks,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRange {
    Pair([u64; 2]),
    Object { range: [u64; 2] },
}

impl RawRange {
    fn bounds(&self) -> (u64, u64) {
        match self {
            RawRange::Pair([start, end]) | RawRange::Object { range: [start, end] } => {
                (*start, *end)
            }
        }
    }
}

/// Chunk map kept in document order, which is the concatenation order.
struct OrderedChunks(Vec<(String, RawRange)>);

impl<'de> Deserialize<'de> for OrderedChunks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ChunksVisitor;

        impl<'de> Visitor<'de> for ChunksVisitor {
            type Value = OrderedChunks;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of chunk hash to byte range")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut chunks: Vec<(String, RawRange)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((hash, range)) = map.next_entry::<String, RawRange>()? {
                    if chunks.iter().any(|(h, _)| *h == hash) {
                        return Err(de::Error::custom(format!("duplicate chunk {hash}")));
                    }
                    chunks.push((hash, range));
                }
                Ok(OrderedChunks(chunks))
            }
        }

        deserializer.deserialize_map(ChunksVisitor)
    }
}

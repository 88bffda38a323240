use std::cmp::Ordering;
use std::convert::TryFrom;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{Result, TextBpeError};

/// Internal handle for an interned symbol. Unrelated to vocabulary ids.
pub(crate) type SymbolId = u32;
/// Adjacent symbol pair `(left, right)`.
pub(crate) type Pair = (SymbolId, SymbolId);

/// Interns symbol byte strings so that equal bytes always map to the same id.
///
/// Pretokens are stored as id sequences, which keeps pretoken equality identical to
/// byte-content equality even when two merge paths build the same bytes.
#[derive(Debug, Clone)]
pub(crate) struct SymbolTable {
    bytes: Vec<Arc<[u8]>>,
    ids: FxHashMap<Arc<[u8]>, SymbolId>,
}

impl SymbolTable {
    /// Creates a table where ids `0..=255` are the single-byte symbols.
    pub(crate) fn with_byte_alphabet() -> Self {
        let mut table = Self {
            bytes: Vec::with_capacity(512),
            ids: FxHashMap::default(),
        };
        for byte in 0u8..=u8::MAX {
            let shared: Arc<[u8]> = Arc::from(&[byte][..]);
            table.ids.insert(Arc::clone(&shared), SymbolId::from(byte));
            table.bytes.push(shared);
        }
        table
    }

    /// Returns the id for `bytes`, allocating one if the bytes are new.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> Result<SymbolId> {
        if let Some(&id) = self.ids.get(bytes) {
            return Ok(id);
        }
        let id = SymbolId::try_from(self.bytes.len())
            .map_err(|_| TextBpeError::Internal("symbol table exceeded u32::MAX".into()))?;
        let shared: Arc<[u8]> = Arc::from(bytes);
        self.ids.insert(Arc::clone(&shared), id);
        self.bytes.push(shared);
        Ok(id)
    }

    /// Interns the concatenation of both sides of `pair`.
    pub(crate) fn fuse(&mut self, pair: Pair) -> Result<SymbolId> {
        let left = self.bytes(pair.0);
        let right = self.bytes(pair.1);
        let mut merged = Vec::with_capacity(left.len() + right.len());
        merged.extend_from_slice(left);
        merged.extend_from_slice(right);
        self.intern(&merged)
    }

    pub(crate) fn bytes(&self, id: SymbolId) -> &[u8] {
        &self.bytes[id as usize]
    }

    pub(crate) fn shared(&self, id: SymbolId) -> Arc<[u8]> {
        Arc::clone(&self.bytes[id as usize])
    }

    /// Orders pairs by `(left bytes, right bytes)`.
    ///
    /// This is the merge tie-break: among equally frequent pairs the greatest wins.
    pub(crate) fn compare_pairs(&self, a: Pair, b: Pair) -> Ordering {
        self.bytes(a.0)
            .cmp(self.bytes(b.0))
            .then_with(|| self.bytes(a.1).cmp(self.bytes(b.1)))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }
}

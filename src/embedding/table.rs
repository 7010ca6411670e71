//! Token → vector table

use crate::error::{display_bytes, KmervecError, Result};
use std::collections::HashMap;

/// Mapping from token (k-mer, segment, ...) to a fixed-dimension vector
///
/// Vectors are stored row-major in one buffer. Keys are unique and keep
/// insertion order, which is also the order used when the table is saved.
///
/// # Examples
///
/// ```
/// use kmervec::EmbeddingTable;
///
/// let mut table = EmbeddingTable::new(2)?;
/// table.insert(b"ACG", &[0.5, -1.0])?;
/// assert_eq!(table.get(b"ACG"), Some(&[0.5, -1.0][..]));
/// assert!(table.insert(b"CGT", &[1.0]).is_err());
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    dim: usize,
    tokens: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, usize>,
    vectors: Vec<f32>,
}

impl EmbeddingTable {
    /// Create an empty table for vectors of dimension `dim`
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(KmervecError::invalid("dimensions", "must be at least 1"));
        }
        Ok(Self {
            dim,
            tokens: Vec::new(),
            index: HashMap::new(),
            vectors: Vec::new(),
        })
    }

    /// Create an empty table with room for `capacity` rows
    pub fn with_capacity(dim: usize, capacity: usize) -> Result<Self> {
        let mut table = Self::new(dim)?;
        table.tokens.reserve(capacity);
        table.index.reserve(capacity);
        table.vectors.reserve(capacity * dim);
        Ok(table)
    }

    /// Insert or overwrite the vector for `token`
    pub fn insert(&mut self, token: &[u8], vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(KmervecError::DimensionMismatch {
                id: display_bytes(token),
                expected: self.dim,
                actual: vector.len(),
            });
        }
        match self.index.get(token) {
            Some(&row) => {
                self.vectors[row * self.dim..(row + 1) * self.dim].copy_from_slice(vector);
            }
            None => {
                self.index.insert(token.to_vec(), self.tokens.len());
                self.tokens.push(token.to_vec());
                self.vectors.extend_from_slice(vector);
            }
        }
        Ok(())
    }

    /// Copy every row of `other` into this table, overwriting shared keys
    pub fn extend_from(&mut self, other: &EmbeddingTable) -> Result<()> {
        for (token, vector) in other.iter() {
            self.insert(token, vector)?;
        }
        Ok(())
    }

    /// Vector for `token`
    pub fn get(&self, token: &[u8]) -> Option<&[f32]> {
        self.index.get(token).map(|&row| self.row(row))
    }

    /// Whether `token` has a vector
    pub fn contains(&self, token: &[u8]) -> bool {
        self.index.contains_key(token)
    }

    /// Vector dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in insertion order
    pub fn tokens(&self) -> impl Iterator<Item = &[u8]> {
        self.tokens.iter().map(Vec::as_slice)
    }

    /// `(token, vector)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[f32])> {
        self.tokens
            .iter()
            .enumerate()
            .map(move |(row, token)| (token.as_slice(), self.row(row)))
    }

    fn row(&self, row: usize) -> &[f32] {
        &self.vectors[row * self.dim..(row + 1) * self.dim]
    }
}

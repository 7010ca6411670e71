//! Skip-gram with negative sampling over random walks
//!
//! Walks are read once into an interned corpus. Tokens seen fewer than
//! `min_count` times are removed from the corpus before training, so they
//! neither get a vector nor occupy a context slot. The vocabulary is ordered
//! by descending frequency, ties broken by first appearance.
//!
//! # Hogwild updates
//!
//! With `workers > 1` the corpus is split into chunks trained concurrently
//! against shared weight matrices. Every weight is an `AtomicU32` holding
//! `f32` bits and is updated with a relaxed load followed by a relaxed
//! store, without any lock. Two threads touching the same weight at once
//! can lose one of the updates. The loss is rare and harmless for
//! stochastic gradient descent, but it makes multi-worker output depend on
//! thread scheduling. With `workers == 1` training is deterministic for a
//! fixed seed.

use crate::config::TrainerConfig;
use crate::embedding::table::EmbeddingTable;
use crate::error::{KmervecError, Result};
use crate::graph::AliasTable;
use crate::rng::derive_seed;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, info};

/// Sentences per unit of parallel work
const CHUNK_SENTENCES: usize = 256;

/// Dot products are clamped to this range before the sigmoid
const MAX_EXP: f32 = 6.0;

/// Exponent applied to token counts for the negative sampling distribution
const NEGATIVE_POWER: f64 = 0.75;

/// Context-window embedding trainer
///
/// # Examples
///
/// ```
/// use kmervec::config::TrainerConfig;
/// use kmervec::embedding::ContextEmbeddingTrainer;
///
/// let walks = vec![vec!["ACG", "CGT", "GTA"], vec!["CGT", "GTA", "TAC"]];
/// let trainer = ContextEmbeddingTrainer::new(TrainerConfig {
///     dimensions: 8,
///     workers: 1,
///     ..Default::default()
/// })?;
/// let table = trainer.train(walks)?;
/// assert_eq!(table.len(), 4);
/// assert_eq!(table.dim(), 8);
/// # Ok::<(), kmervec::KmervecError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ContextEmbeddingTrainer {
    config: TrainerConfig,
}

impl ContextEmbeddingTrainer {
    /// Create a trainer, validating the configuration
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Trainer settings
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train embeddings for every token of the walks seen at least
    /// `min_count` times
    pub fn train<I, W, T>(&self, walks: I) -> Result<EmbeddingTable>
    where
        I: IntoIterator<Item = W>,
        W: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let corpus = Corpus::build(walks, self.config.min_count)?;
        self.train_corpus(&corpus)
    }

    fn train_corpus(&self, corpus: &Corpus) -> Result<EmbeddingTable> {
        let cfg = &self.config;
        let dim = cfg.dimensions;
        let vocab_size = corpus.vocab.len();

        let weights: Vec<f64> = corpus
            .counts
            .iter()
            .map(|&c| (c as f64).powf(NEGATIVE_POWER))
            .collect();
        let negatives = AliasTable::new(&weights).ok_or(KmervecError::EmptyVocabulary {
            min_count: cfg.min_count,
            tokens: corpus.distinct_seen,
        })?;

        let state = TrainingState {
            syn0: SharedMatrix::uniform(vocab_size, dim, derive_seed(cfg.seed, &[u64::MAX])),
            syn1neg: SharedMatrix::zeros(vocab_size, dim),
            negatives,
            negative: cfg.negative,
            window: cfg.window,
            alpha: cfg.alpha,
            min_alpha: cfg.min_alpha,
            processed: AtomicU64::new(0),
            total: (corpus.token_count() * cfg.epochs).max(1) as u64,
        };

        info!(
            vocabulary = vocab_size,
            dropped = corpus.distinct_seen - vocab_size,
            tokens = corpus.token_count(),
            epochs = cfg.epochs,
            workers = cfg.workers,
            "training embeddings"
        );

        let pool = if cfg.workers > 1 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(cfg.workers)
                .build()
                .ok()
        } else {
            None
        };

        for epoch in 0..cfg.epochs {
            let run = |(chunk, sentences): (usize, &[Vec<u32>])| {
                let seed = derive_seed(cfg.seed, &[epoch as u64, chunk as u64]);
                state.train_chunk(sentences, seed);
            };
            match &pool {
                Some(pool) => pool.install(|| {
                    corpus
                        .sentences
                        .par_chunks(CHUNK_SENTENCES)
                        .enumerate()
                        .for_each(run)
                }),
                None => corpus
                    .sentences
                    .chunks(CHUNK_SENTENCES)
                    .enumerate()
                    .for_each(run),
            }
            debug!(epoch, learning_rate = state.learning_rate(), "epoch complete");
        }

        let vectors = state.syn0.into_values();
        let mut table = EmbeddingTable::with_capacity(dim, vocab_size)?;
        for (row, token) in corpus.vocab.iter().enumerate() {
            table.insert(token, &vectors[row * dim..(row + 1) * dim])?;
        }
        Ok(table)
    }
}

/// Walks rewritten as vocabulary indices
#[derive(Debug)]
struct Corpus {
    /// Tokens by vocabulary index
    vocab: Vec<Vec<u8>>,
    /// Frequency by vocabulary index
    counts: Vec<u64>,
    sentences: Vec<Vec<u32>>,
    /// Distinct tokens before frequency filtering
    distinct_seen: usize,
}

impl Corpus {
    fn build<I, W, T>(walks: I, min_count: usize) -> Result<Self>
    where
        I: IntoIterator<Item = W>,
        W: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        // First pass: intern in order of first appearance
        let mut interned: HashMap<Vec<u8>, u32> = HashMap::new();
        let mut seen: Vec<Vec<u8>> = Vec::new();
        let mut raw_counts: Vec<u64> = Vec::new();
        let mut raw_sentences: Vec<Vec<u32>> = Vec::new();

        for walk in walks {
            let mut sentence = Vec::new();
            for token in walk {
                let token = token.as_ref();
                let id = match interned.get(token) {
                    Some(&id) => id,
                    None => {
                        let id = seen.len() as u32;
                        interned.insert(token.to_vec(), id);
                        seen.push(token.to_vec());
                        raw_counts.push(0);
                        id
                    }
                };
                raw_counts[id as usize] += 1;
                sentence.push(id);
            }
            raw_sentences.push(sentence);
        }

        let mut kept: Vec<u32> = (0..seen.len() as u32)
            .filter(|&id| raw_counts[id as usize] >= min_count as u64)
            .collect();
        if kept.is_empty() {
            return Err(KmervecError::EmptyVocabulary {
                min_count,
                tokens: seen.len(),
            });
        }
        // Stable sort keeps first-appearance order among equal counts
        kept.sort_by(|&a, &b| raw_counts[b as usize].cmp(&raw_counts[a as usize]));

        let mut remap: Vec<Option<u32>> = vec![None; seen.len()];
        for (index, &id) in kept.iter().enumerate() {
            remap[id as usize] = Some(index as u32);
        }

        let sentences = raw_sentences
            .into_iter()
            .map(|s| s.into_iter().filter_map(|id| remap[id as usize]).collect::<Vec<_>>())
            .filter(|s| !s.is_empty())
            .collect();

        let distinct_seen = seen.len();
        let counts = kept.iter().map(|&id| raw_counts[id as usize]).collect();
        let mut seen: Vec<Option<Vec<u8>>> = seen.into_iter().map(Some).collect();
        let vocab = kept
            .iter()
            .filter_map(|&id| seen[id as usize].take())
            .collect();

        Ok(Self {
            vocab,
            counts,
            sentences,
            distinct_seen,
        })
    }

    fn token_count(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }
}

/// Row-major `f32` matrix with lock-free relaxed updates
struct SharedMatrix {
    dim: usize,
    cells: Vec<AtomicU32>,
}

impl SharedMatrix {
    fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            dim,
            cells: (0..rows * dim).map(|_| AtomicU32::new(0f32.to_bits())).collect(),
        }
    }

    fn uniform(rows: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 0.5 / dim as f32;
        Self {
            dim,
            cells: (0..rows * dim)
                .map(|_| AtomicU32::new(rng.random_range(-bound..bound).to_bits()))
                .collect(),
        }
    }

    #[inline]
    fn row(&self, row: usize) -> &[AtomicU32] {
        &self.cells[row * self.dim..(row + 1) * self.dim]
    }

    fn into_values(self) -> Vec<f32> {
        self.cells
            .into_iter()
            .map(|cell| f32::from_bits(cell.into_inner()))
            .collect()
    }
}

#[inline]
fn load(cell: &AtomicU32) -> f32 {
    f32::from_bits(cell.load(Ordering::Relaxed))
}

#[inline]
fn add(cell: &AtomicU32, delta: f32) {
    cell.store((load(cell) + delta).to_bits(), Ordering::Relaxed);
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-MAX_EXP, MAX_EXP)).exp())
}

/// Everything shared by the training workers
struct TrainingState {
    /// Input (token) vectors, the ones returned
    syn0: SharedMatrix,
    /// Output (context) vectors for negative sampling
    syn1neg: SharedMatrix,
    negatives: AliasTable,
    negative: usize,
    window: usize,
    alpha: f32,
    min_alpha: f32,
    processed: AtomicU64,
    total: u64,
}

impl TrainingState {
    /// Linearly decayed learning rate for the current progress
    fn learning_rate(&self) -> f32 {
        let progress = self.processed.load(Ordering::Relaxed) as f32 / self.total as f32;
        (self.alpha - (self.alpha - self.min_alpha) * progress).max(self.min_alpha)
    }

    fn train_chunk(&self, sentences: &[Vec<u32>], seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut neu1e = vec![0f32; self.syn0.dim];

        for sentence in sentences {
            let alpha = self.learning_rate();
            for (pos, &word) in sentence.iter().enumerate() {
                // Reduced window: effective span drawn from 1..=window
                let span = self.window - rng.random_range(0..self.window);
                let start = pos.saturating_sub(span);
                let end = (pos + span + 1).min(sentence.len());
                for (ctx_pos, &context) in sentence.iter().enumerate().take(end).skip(start) {
                    if ctx_pos != pos {
                        self.train_pair(word, context, alpha, &mut rng, &mut neu1e);
                    }
                }
            }
            self.processed
                .fetch_add(sentence.len() as u64, Ordering::Relaxed);
        }
    }

    /// One positive pair plus `negative` noise targets
    fn train_pair(&self, word: u32, context: u32, alpha: f32, rng: &mut StdRng, neu1e: &mut [f32]) {
        neu1e.fill(0.0);
        let l1 = self.syn0.row(context as usize);

        for draw in 0..=self.negative {
            let (target, label) = if draw == 0 {
                (word, 1.0)
            } else {
                let target = self.negatives.sample(rng) as u32;
                if target == word {
                    continue;
                }
                (target, 0.0)
            };
            let l2 = self.syn1neg.row(target as usize);
            let f: f32 = l1.iter().zip(l2).map(|(a, b)| load(a) * load(b)).sum();
            let g = (label - sigmoid(f)) * alpha;
            for (e, (a, b)) in neu1e.iter_mut().zip(l1.iter().zip(l2)) {
                *e += g * load(b);
                add(b, g * load(a));
            }
        }

        for (a, &e) in l1.iter().zip(neu1e.iter()) {
            add(a, e);
        }
    }
}

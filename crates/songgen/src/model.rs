//! Next-token scoring.

use std::collections::HashMap;

use crate::corpus::Corpus;

/// Unnormalized scores for the next pitch and duration token.
#[derive(Debug, Clone, PartialEq)]
pub struct Logits {
    pub pitch: Vec<f32>,
    pub dur: Vec<f32>,
}

/// Scores the next step given the preceding pitch and duration ids.
///
/// Implementations must return one score per vocabulary entry for each head.
pub trait SequenceModel: Send + Sync {
    fn name(&self) -> &str;

    fn pitch_vocab_size(&self) -> usize;

    fn dur_vocab_size(&self) -> usize;

    fn predict(&self, pitch_ctx: &[usize], dur_ctx: &[usize]) -> Logits;
}

/// Weight of the lower-order distribution mixed into every prediction.
const BACKOFF_WEIGHT: f32 = 0.1;

/// Counts of the token following each context, for every context length
/// from 0 (unigram) up to the model order.
#[derive(Debug, Clone)]
struct NgramTable {
    vocab_size: usize,
    order: usize,
    counts: Vec<HashMap<Vec<usize>, HashMap<usize, u32>>>,
}

impl NgramTable {
    fn train(sequence: &[usize], vocab_size: usize, order: usize) -> Self {
        let mut counts = vec![HashMap::new(); order + 1];
        for (i, &next) in sequence.iter().enumerate() {
            for (k, table) in counts.iter_mut().enumerate() {
                if k > i {
                    break;
                }
                let ctx = sequence[i - k..i].to_vec();
                *table
                    .entry(ctx)
                    .or_insert_with(HashMap::new)
                    .entry(next)
                    .or_insert(0) += 1;
            }
        }
        Self {
            vocab_size,
            order,
            counts,
        }
    }

    fn unigram(&self) -> Vec<f32> {
        let mut probs = vec![0.0f32; self.vocab_size];
        if let Some(row) = self.counts[0].get(&Vec::new()) {
            let total: u32 = row.values().sum();
            for (&tok, &count) in row {
                probs[tok] = count as f32 / total as f32;
            }
        }
        probs
    }

    /// Longest context seen in training backs off toward the unigram.
    fn score(&self, ctx: &[usize]) -> Vec<f32> {
        let mut probs = self.unigram();

        let max_k = self.order.min(ctx.len());
        for k in 1..=max_k {
            let key = &ctx[ctx.len() - k..];
            let Some(row) = self.counts[k].get(key) else {
                break;
            };
            let total: u32 = row.values().sum();
            let mut next = vec![0.0f32; self.vocab_size];
            for (&tok, &count) in row {
                next[tok] = count as f32 / total as f32;
            }
            for (p, lower) in next.iter_mut().zip(&probs) {
                *p = (1.0 - BACKOFF_WEIGHT) * *p + BACKOFF_WEIGHT * lower;
            }
            probs = next;
        }

        probs
            .into_iter()
            .map(|p| if p > 0.0 { p.ln() } else { f32::NEG_INFINITY })
            .collect()
    }
}

/// Back-off n-gram model trained from a corpus.
///
/// Pitch and duration heads are independent chains, each conditioned on up
/// to `order` previous tokens of its own kind.
#[derive(Debug, Clone)]
pub struct MarkovModel {
    pitch: NgramTable,
    dur: NgramTable,
}

impl MarkovModel {
    #[tracing::instrument(skip(corpus), fields(tokens = corpus.len()))]
    pub fn train(corpus: &Corpus, order: usize) -> Self {
        let model = Self {
            pitch: NgramTable::train(&corpus.pitch_ids, corpus.pitch_vocab.len(), order),
            dur: NgramTable::train(&corpus.dur_ids, corpus.dur_vocab.len(), order),
        };
        tracing::debug!(
            pitch_contexts = model.pitch.counts.iter().map(HashMap::len).sum::<usize>(),
            dur_contexts = model.dur.counts.iter().map(HashMap::len).sum::<usize>(),
            "markov model trained"
        );
        model
    }

    pub fn order(&self) -> usize {
        self.pitch.order
    }
}

impl SequenceModel for MarkovModel {
    fn name(&self) -> &str {
        "markov"
    }

    fn pitch_vocab_size(&self) -> usize {
        self.pitch.vocab_size
    }

    fn dur_vocab_size(&self) -> usize {
        self.dur.vocab_size
    }

    fn predict(&self, pitch_ctx: &[usize], dur_ctx: &[usize]) -> Logits {
        Logits {
            pitch: self.pitch.score(pitch_ctx),
            dur: self.dur.score(dur_ctx),
        }
    }
}

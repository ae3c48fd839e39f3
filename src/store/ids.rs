//! Short random identifiers for stored plots.

use rand::Rng;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

/// Length of a plot id.
pub(crate) const PLOT_ID_LEN: usize = 5;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Source of candidate ids.
pub(crate) trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random alphanumeric ids of a fixed length.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RandomIds {
    len: usize,
}

impl RandomIds {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new(PLOT_ID_LEN)
    }
}

impl IdGenerator for RandomIds {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// Hands out a fixed list of ids in order, cycling when exhausted.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct SequenceIds {
    ids: Vec<String>,
    next: AtomicUsize,
}

#[cfg(test)]
impl SequenceIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl IdGenerator for SequenceIds {
    fn generate(&self) -> String {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        self.ids[i % self.ids.len()].clone()
    }
}

/// Returns true if `id` has the shape of a generated plot id.
pub(crate) fn is_plot_id(id: &str) -> bool {
    id.len() == PLOT_ID_LEN && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

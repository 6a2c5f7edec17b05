use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::opt::codec::SolutionCodec;

/// Memoized fitness of every genome evaluated during one optimization run.
///
/// Genomes are keyed by the set of their quantized exit locations, so
/// permutations and genomes differing below the location precision share an
/// entry. Two threads missing on the same key at once both evaluate it; the
/// second store overwrites the first with an equivalent value.
#[derive(Debug)]
pub struct EvaluationCache {
    codec: SolutionCodec,
    entries: Mutex<HashMap<BTreeSet<i64>, f64>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EvaluationCache {
    pub fn new(codec: SolutionCodec) -> Self {
        Self {
            codec,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<BTreeSet<i64>, f64>> {
        // Entries are inserted whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lookup(&self, genes: &[f64]) -> Option<f64> {
        let found = self.entries().get(&self.codec.key(genes)).copied();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn store(&self, genes: &[f64], fitness: f64) {
        let key = self.codec.key(genes);
        self.entries().insert(key, fitness);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::perimeter::Perimeter;
    use crate::opt::codec::DEFAULT_PRECISION;

    fn cache() -> EvaluationCache {
        let codec =
            SolutionCodec::new(Perimeter::new(10.0, 5.0).unwrap(), 2.0, DEFAULT_PRECISION).unwrap();
        EvaluationCache::new(codec)
    }

    #[test]
    fn test_permutation_hits() {
        let c = cache();
        assert_eq!(c.lookup(&[0.2, 0.7]), None);
        c.store(&[0.2, 0.7], 1.5);
        assert_eq!(c.lookup(&[0.7, 0.2]), Some(1.5));
        assert_eq!(c.lookup(&[0.2, 0.7]), Some(1.5));
        assert_eq!(c.hits(), 2);
        assert_eq!(c.misses(), 1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_sub_precision_difference_hits() {
        let c = cache();
        c.store(&[0.5], 0.25);
        assert_eq!(c.lookup(&[0.5 + 1e-5]), Some(0.25));
        assert_eq!(c.lookup(&[0.6]), None);
        assert!(!c.is_empty());
    }
}

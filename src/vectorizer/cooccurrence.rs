use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    config::VectorizerConfig,
    error::{Result, VectorizerError},
    vectorizer::{signature::Signature, vocab::Vocabulary},
};

/// rare neighbors are folded into this token
pub const UNKNOWN_TOKEN: &str = "<UNK>";

/// Raw co-occurrence counts
/// center token -> neighbor token -> count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooccurrenceCounts {
    table: IndexMap<Box<str>, IndexMap<Box<str>, u64>>,
}

impl CooccurrenceCounts {
    pub fn new() -> Self {
        CooccurrenceCounts {
            table: IndexMap::new(),
        }
    }

    /// 存在しない組み合わせは 0 で初期化してから加算する
    #[inline]
    pub fn increment(&mut self, center: &str, neighbor: &str, by: u64) {
        let center_idx = match self.table.get_index_of(center) {
            Some(idx) => idx,
            None => self.table.insert_full(center.into(), IndexMap::new()).0,
        };
        let neighbors = &mut self.table[center_idx];
        let neighbor_idx = match neighbors.get_index_of(neighbor) {
            Some(idx) => idx,
            None => neighbors.insert_full(neighbor.into(), 0).0,
        };
        neighbors[neighbor_idx] += by;
    }

    #[inline]
    pub fn get(&self, center: &str, neighbor: &str) -> u64 {
        self.table
            .get(center)
            .and_then(|n| n.get(neighbor))
            .copied()
            .unwrap_or(0)
    }

    /// 中心tokenの近傍の出現回数合計
    #[inline]
    pub fn total(&self, center: &str) -> u64 {
        self.table
            .get(center)
            .map(|n| n.values().sum())
            .unwrap_or(0)
    }

    #[inline]
    pub fn neighbors(&self, center: &str) -> Option<&IndexMap<Box<str>, u64>> {
        self.table.get(center)
    }

    /// number of center tokens with at least one neighbor
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Add another table's counts into this one
    /// Addition is commutative so merge order does not change the totals
    pub fn merge(&mut self, other: CooccurrenceCounts) {
        for (center, neighbors) in other.table {
            for (neighbor, count) in neighbors {
                self.increment(&center, &neighbor, count);
            }
        }
    }

    /// Move every neighbor seen `threshold` times or fewer into `<UNK>`
    /// Returns the number of distinct folded neighbor tokens
    pub fn fold_rare(&mut self, vocab: &Vocabulary, threshold: u64) -> usize {
        if threshold == 0 {
            return 0;
        }
        let mut folded: IndexSet<Box<str>> = IndexSet::new();
        for neighbors in self.table.values_mut() {
            let rare: Vec<Box<str>> = neighbors
                .keys()
                .filter(|&k| &**k != UNKNOWN_TOKEN && vocab.is_rare(k, threshold))
                .cloned()
                .collect();
            if rare.is_empty() {
                continue;
            }
            let mut moved = 0;
            for token in rare {
                moved += neighbors.shift_remove(&token).unwrap_or(0);
                folded.insert(token);
            }
            *neighbors.entry(UNKNOWN_TOKEN.into()).or_insert(0) += moved;
        }
        folded.len()
    }
}

/// SignatureBuilder
/// 固定幅の窓で共起を数え、tokenごとに正規化したSignatureを作ります
///
/// # Examples
/// ```
/// use crv_vectorizer::{SignatureBuilder, Vocabulary};
/// let sentences = vec![vec!["a", "b", "c", "b"]];
/// let vocab = Vocabulary::from_sentences(&sentences);
/// let signatures = SignatureBuilder::new(1).unwrap().build(&vocab, &sentences);
/// let b = &signatures["b"];
/// assert!((b.get("c") - 2.0 / 3.0).abs() < 1e-12);
/// assert!((b.get("a") - 1.0 / 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureBuilder {
    window_size: usize,
    removal_threshold: u64,
}

impl SignatureBuilder {
    /// `window_size` は 1 以上
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(VectorizerError::InvalidConfig(
                "window_size must be at least 1".into(),
            ));
        }
        Ok(SignatureBuilder {
            window_size,
            removal_threshold: 0,
        })
    }

    pub fn from_config(config: &VectorizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.window_size)?.with_removal_threshold(config.removal_threshold))
    }

    /// Fold neighbors seen `threshold` times or fewer into `<UNK>`
    /// 0 disables folding
    pub fn with_removal_threshold(mut self, threshold: u64) -> Self {
        self.removal_threshold = threshold;
        self
    }

    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    #[inline]
    pub fn removal_threshold(&self) -> u64 {
        self.removal_threshold
    }
}

/// 数え上げ
impl SignatureBuilder {
    /// Count neighbors of every vocabulary token
    /// The window is clipped to the sentence bounds
    pub fn count<S, T>(&self, vocab: &Vocabulary, sentences: &[S]) -> CooccurrenceCounts
    where
        S: AsRef<[T]>,
        T: AsRef<str>,
    {
        let mut counts = CooccurrenceCounts::new();
        for sentence in sentences {
            self.count_sentence(vocab, sentence.as_ref(), &mut counts);
        }
        counts
    }

    /// Same result as `count`, with sentences split across the rayon pool
    pub fn par_count<S, T>(&self, vocab: &Vocabulary, sentences: &[S]) -> CooccurrenceCounts
    where
        S: AsRef<[T]> + Sync,
        T: AsRef<str>,
    {
        sentences
            .par_iter()
            .fold(CooccurrenceCounts::new, |mut counts, sentence| {
                self.count_sentence(vocab, sentence.as_ref(), &mut counts);
                counts
            })
            .reduce(CooccurrenceCounts::new, |mut a, b| {
                a.merge(b);
                a
            })
    }

    fn count_sentence<T>(&self, vocab: &Vocabulary, sentence: &[T], counts: &mut CooccurrenceCounts)
    where
        T: AsRef<str>,
    {
        let len = sentence.len();
        for center_pos in 0..len {
            let center = sentence[center_pos].as_ref();
            if !vocab.contains(center) {
                debug!(token = center, "skipping center token outside the vocabulary");
                continue;
            }
            let start = center_pos.saturating_sub(self.window_size);
            let end = (center_pos + self.window_size + 1).min(len);
            for pos in start..end {
                if pos == center_pos {
                    continue;
                }
                counts.increment(center, sentence[pos].as_ref(), 1);
            }
        }
    }
}

/// 正規化
impl SignatureBuilder {
    /// Divide each token's neighbor counts by their sum
    /// A token without neighbors gets an empty signature
    pub fn normalize(vocab: &Vocabulary, counts: &CooccurrenceCounts) -> IndexMap<Box<str>, Signature> {
        vocab
            .tokens()
            .map(|token| {
                let signature = match counts.neighbors(token) {
                    Some(neighbors) => {
                        let total: u64 = neighbors.values().sum();
                        if total == 0 {
                            Signature::new()
                        } else {
                            let total = total as f64;
                            neighbors
                                .iter()
                                .map(|(k, &c)| (k.clone(), c as f64 / total))
                                .collect()
                        }
                    }
                    None => Signature::new(),
                };
                (Box::<str>::from(token), signature)
            })
            .collect()
    }

    /// count, fold rare neighbors, normalize
    pub fn build<S, T>(&self, vocab: &Vocabulary, sentences: &[S]) -> IndexMap<Box<str>, Signature>
    where
        S: AsRef<[T]>,
        T: AsRef<str>,
    {
        let counts = self.count(vocab, sentences);
        self.finish(vocab, counts, sentences.len())
    }

    /// `build` on the rayon pool
    pub fn par_build<S, T>(&self, vocab: &Vocabulary, sentences: &[S]) -> IndexMap<Box<str>, Signature>
    where
        S: AsRef<[T]> + Sync,
        T: AsRef<str>,
    {
        let counts = self.par_count(vocab, sentences);
        self.finish(vocab, counts, sentences.len())
    }

    fn finish(
        &self,
        vocab: &Vocabulary,
        mut counts: CooccurrenceCounts,
        sentence_num: usize,
    ) -> IndexMap<Box<str>, Signature> {
        let folded = counts.fold_rare(vocab, self.removal_threshold);
        let signatures = Self::normalize(vocab, &counts);

        let strongest = signatures
            .values()
            .filter_map(|s| s.values().next())
            .fold(0.0_f64, f64::max);
        let empty = signatures.values().filter(|s| s.is_empty()).count();
        info!(
            sentences = sentence_num,
            tokens = signatures.len(),
            window = self.window_size,
            folded,
            empty,
            strongest,
            "signatures collected"
        );
        signatures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn abc() -> (Vocabulary, Vec<Vec<&'static str>>) {
        let sentences = vec![vec!["a", "b", "c", "b"]];
        let vocab = Vocabulary::from_counts([("a", 1), ("b", 2), ("c", 1)]);
        (vocab, sentences)
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(SignatureBuilder::new(0).is_err());
        let config = VectorizerConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(SignatureBuilder::from_config(&config).is_err());
    }

    #[test]
    fn raw_counts_for_single_sentence() {
        let (vocab, sentences) = abc();
        let counts = SignatureBuilder::new(1).unwrap().count(&vocab, &sentences);
        assert_eq!(counts.get("b", "a"), 1);
        assert_eq!(counts.get("b", "c"), 2);
        assert_eq!(counts.get("b", "b"), 0);
        assert_eq!(counts.total("b"), 3);
        assert_eq!(counts.get("a", "b"), 1);
        assert_eq!(counts.get("c", "b"), 2);
    }

    #[test]
    fn normalized_signature_for_b() {
        let (vocab, sentences) = abc();
        let signatures = SignatureBuilder::new(1).unwrap().build(&vocab, &sentences);
        let b = &signatures["b"];
        assert_eq!(b.len(), 2);
        assert!((b.get("c") - 0.667).abs() < 5e-4);
        assert!((b.get("a") - 0.333).abs() < 5e-4);
        let keys: Vec<&str> = b.keys().collect();
        assert_eq!(keys, vec!["c", "a"]);
    }

    #[test]
    fn window_is_clipped_at_sentence_bounds() {
        let sentences = vec![vec!["x", "y"], vec!["z"]];
        let vocab = Vocabulary::from_sentences(&sentences);
        let counts = SignatureBuilder::new(5).unwrap().count(&vocab, &sentences);
        assert_eq!(counts.get("x", "y"), 1);
        assert_eq!(counts.get("y", "x"), 1);
        // no wraparound into the next sentence
        assert_eq!(counts.get("y", "z"), 0);
        assert_eq!(counts.total("z"), 0);
    }

    #[test]
    fn counts_accumulate_across_sentences() {
        let sentences = vec![vec!["a", "b"], vec!["b", "a"], vec!["a", "c", "a"]];
        let vocab = Vocabulary::from_sentences(&sentences);
        let counts = SignatureBuilder::new(1).unwrap().count(&vocab, &sentences);
        assert_eq!(counts.get("a", "b"), 2);
        assert_eq!(counts.get("a", "c"), 2);
        assert_eq!(counts.get("c", "a"), 2);
    }

    #[test]
    fn signatures_sum_to_one() {
        let sentences = vec![
            vec!["<START>", "the", "cat", "sat", "on", "the", "mat", "<END>"],
            vec!["<START>", "a", "dog", "sat", "<END>"],
        ];
        let vocab = Vocabulary::from_sentences(&sentences);
        let signatures = SignatureBuilder::new(2).unwrap().build(&vocab, &sentences);
        assert_eq!(signatures.len(), vocab.len());
        for (token, sig) in &signatures {
            assert!((sig.sum() - 1.0).abs() < EPS, "{token} sums to {}", sig.sum());
        }
    }

    #[test]
    fn token_without_neighbors_gets_empty_signature() {
        let sentences = vec![vec!["alone"]];
        let vocab = Vocabulary::from_counts([("alone", 1), ("ghost", 3)]);
        let signatures = SignatureBuilder::new(2).unwrap().build(&vocab, &sentences);
        assert!(signatures["alone"].is_empty());
        assert!(signatures["ghost"].is_empty());
    }

    #[test]
    fn empty_corpus_is_not_an_error() {
        let sentences: Vec<Vec<String>> = Vec::new();
        let vocab = Vocabulary::from_sentences(&sentences);
        let signatures = SignatureBuilder::new(2).unwrap().build(&vocab, &sentences);
        assert!(signatures.is_empty());
    }

    #[test]
    fn centers_outside_vocabulary_are_skipped() {
        let sentences = vec![vec!["a", "oov", "a"]];
        let vocab = Vocabulary::from_counts([("a", 2)]);
        let counts = SignatureBuilder::new(1).unwrap().count(&vocab, &sentences);
        assert_eq!(counts.total("oov"), 0);
        assert_eq!(counts.get("a", "oov"), 2);
    }

    #[test]
    fn rare_neighbors_fold_into_unknown_before_normalizing() {
        let sentences = vec![
            vec!["a", "b", "a", "b"],
            vec!["a", "rare", "a"],
        ];
        let vocab = Vocabulary::from_sentences(&sentences);
        let builder = SignatureBuilder::new(1).unwrap().with_removal_threshold(1);
        let signatures = builder.build(&vocab, &sentences);
        let a = &signatures["a"];
        assert!(!a.contains_key("rare"));
        // a: b x3, rare x2
        assert!((a.get(UNKNOWN_TOKEN) - 0.4).abs() < EPS);
        assert!((a.get("b") - 0.6).abs() < EPS);
        assert!((a.sum() - 1.0).abs() < EPS);
        // the rare token keeps its own signature as a center
        assert!((signatures["rare"].get("a") - 1.0).abs() < EPS);
    }

    #[test]
    fn folding_merges_into_existing_unknown_bucket() {
        let mut counts = CooccurrenceCounts::new();
        counts.increment("a", UNKNOWN_TOKEN, 2);
        counts.increment("a", "r1", 1);
        counts.increment("a", "r2", 3);
        counts.increment("a", "common", 4);
        let vocab = Vocabulary::from_counts([("a", 9), ("r1", 1), ("r2", 1), ("common", 5), (UNKNOWN_TOKEN, 1)]);
        let folded = counts.fold_rare(&vocab, 1);
        assert_eq!(folded, 2);
        assert_eq!(counts.get("a", UNKNOWN_TOKEN), 6);
        assert_eq!(counts.get("a", "common"), 4);
        assert_eq!(counts.total("a"), 10);
    }

    #[test]
    fn zero_threshold_folds_nothing() {
        let (vocab, sentences) = abc();
        let builder = SignatureBuilder::new(1).unwrap();
        let mut counts = builder.count(&vocab, &sentences);
        let before = counts.clone();
        assert_eq!(counts.fold_rare(&vocab, 0), 0);
        assert_eq!(counts, before);
    }

    #[test]
    fn parallel_build_matches_sequential() {
        let sentences: Vec<Vec<String>> = (0..64)
            .map(|i| {
                (0..12)
                    .map(|j| format!("t{}", (i * 7 + j * 3) % 17))
                    .collect()
            })
            .collect();
        let vocab = Vocabulary::from_sentences(&sentences);
        let builder = SignatureBuilder::new(3).unwrap().with_removal_threshold(2);
        let seq = builder.build(&vocab, &sentences);
        let par = builder.par_build(&vocab, &sentences);
        assert_eq!(seq.len(), par.len());
        for (token, sig) in &seq {
            assert_eq!(sig, &par[token]);
            let a: Vec<&str> = sig.keys().collect();
            let b: Vec<&str> = par[token].keys().collect();
            assert_eq!(a, b);
        }
    }
}

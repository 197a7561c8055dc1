pub mod cooccurrence;
pub mod evaluate;
pub mod repr;
pub mod signature;
pub mod vocab;

use indexmap::{IndexMap, IndexSet};
use ndarray::{Array2, ArrayView2};
use tracing::{debug, info, warn};

use crate::{
    config::VectorizerConfig,
    error::{Result, VectorizerError},
    vectorizer::{
        cooccurrence::{SignatureBuilder, UNKNOWN_TOKEN},
        signature::Signature,
        vocab::Vocabulary,
    },
};

/// Dense projection of per-token signatures
///
/// 行は語彙のtoken、列はエンコーディング語彙のtoken
/// entry `(i, j)` is the weight of column token `j` in row token `i`'s signature
///
/// The matrix is owned by the instance and only handed out as a read-only view.
#[derive(Debug, Clone)]
pub struct Vectorizer {
    /// row tokens
    vocab: IndexSet<Box<str>>,
    /// column tokens
    encoding: IndexSet<Box<str>>,
    matrix: Array2<f64>,
}

/// 生成
impl Vectorizer {
    /// Adopt a precomputed matrix whose columns follow the row vocabulary
    pub fn from_matrix<I, K>(vocab: I, matrix: Array2<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<Box<str>>,
    {
        let vocab: IndexSet<Box<str>> = vocab.into_iter().map(Into::into).collect();
        let encoding = vocab.clone();
        Self::with_parts(vocab, encoding, matrix)
    }

    /// Adopt a precomputed matrix with its own column vocabulary
    pub fn from_matrix_with_encoding<I, K, E, L>(vocab: I, encoding: E, matrix: Array2<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<Box<str>>,
        E: IntoIterator<Item = L>,
        L: Into<Box<str>>,
    {
        let vocab = vocab.into_iter().map(Into::into).collect();
        let encoding = encoding.into_iter().map(Into::into).collect();
        Self::with_parts(vocab, encoding, matrix)
    }

    fn with_parts(vocab: IndexSet<Box<str>>, encoding: IndexSet<Box<str>>, matrix: Array2<f64>) -> Result<Self> {
        let expected = [vocab.len(), encoding.len()];
        if matrix.shape() != &expected[..] {
            return Err(VectorizerError::ShapeMismatch {
                expected: expected.to_vec(),
                found: matrix.shape().to_vec(),
                dtype: "f64",
            });
        }
        Ok(Vectorizer {
            vocab,
            encoding,
            matrix,
        })
    }

    /// Project signatures onto the row vocabulary's own columns
    pub fn from_signatures<I, K>(vocab: I, signatures: &IndexMap<Box<str>, Signature>) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<Box<str>>,
    {
        let vocab: IndexSet<Box<str>> = vocab.into_iter().map(Into::into).collect();
        let encoding = vocab.clone();
        Self::project(vocab, encoding, signatures)
    }

    /// Project signatures onto an explicit column vocabulary
    /// Signature keys outside `encoding` are dropped
    pub fn from_signatures_with_encoding<I, K, E, L>(
        vocab: I,
        encoding: E,
        signatures: &IndexMap<Box<str>, Signature>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<Box<str>>,
        E: IntoIterator<Item = L>,
        L: Into<Box<str>>,
    {
        let vocab = vocab.into_iter().map(Into::into).collect();
        let encoding = encoding.into_iter().map(Into::into).collect();
        Self::project(vocab, encoding, signatures)
    }

    fn project(
        vocab: IndexSet<Box<str>>,
        encoding: IndexSet<Box<str>>,
        signatures: &IndexMap<Box<str>, Signature>,
    ) -> Result<Self> {
        let mut matrix = allocate_matrix(vocab.len(), encoding.len())?;
        let mut dropped = 0usize;
        for (row, token) in vocab.iter().enumerate() {
            let Some(signature) = signatures.get(token) else {
                continue;
            };
            for (key, val) in signature.iter() {
                match encoding.get_index_of(key) {
                    Some(col) => matrix[[row, col]] = val,
                    None => dropped += 1,
                }
            }
        }
        debug!(
            rows = vocab.len(),
            cols = encoding.len(),
            dropped,
            "projected signatures into dense matrix"
        );
        Ok(Vectorizer {
            vocab,
            encoding,
            matrix,
        })
    }

    /// Count, normalize and project in one pass
    ///
    /// 列は `removal_threshold` より多く出現したtoken
    /// When folding is active the `<UNK>` column is appended so folded weight survives
    pub fn build<S, T>(vocab: &Vocabulary, sentences: &[S], config: &VectorizerConfig) -> Result<Self>
    where
        S: AsRef<[T]> + Sync,
        T: AsRef<str>,
    {
        let builder = SignatureBuilder::from_config(config)?;
        let signatures = if config.parallel {
            builder.par_build(vocab, sentences)
        } else {
            builder.build(vocab, sentences)
        };

        let mut encoding = vocab.encoding_tokens(config.removal_threshold);
        let has_unknown_column = encoding.iter().any(|t| &**t == UNKNOWN_TOKEN);
        if config.removal_threshold > 0
            && !has_unknown_column
            && signatures.values().any(|s| s.contains_key(UNKNOWN_TOKEN))
        {
            encoding.push(UNKNOWN_TOKEN.into());
        }

        let vectorizer = Self::from_signatures_with_encoding(vocab.tokens(), encoding, &signatures)?;
        info!(
            tokens = vectorizer.vocab_size(),
            signature_tokens = vectorizer.encoding_size(),
            "vectorizer created"
        );
        Ok(vectorizer)
    }
}

/// 情報の取得
impl Vectorizer {
    /// number of rows
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// number of columns
    #[inline]
    pub fn encoding_size(&self) -> usize {
        self.encoding.len()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.dim()
    }

    #[inline]
    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    #[inline]
    pub fn vocab_tokens(&self) -> impl Iterator<Item = &str> {
        self.vocab.iter().map(|k| k.as_ref())
    }

    #[inline]
    pub fn encoding_tokens(&self) -> impl Iterator<Item = &str> {
        self.encoding.iter().map(|k| k.as_ref())
    }

    #[inline]
    pub fn row_index(&self, token: &str) -> Option<usize> {
        self.vocab.get_index_of(token)
    }

    #[inline]
    pub fn column_index(&self, token: &str) -> Option<usize> {
        self.encoding.get_index_of(token)
    }
}

/// Zero matrix, or `MatrixTooLarge` when the buffer cannot be reserved
fn allocate_matrix(rows: usize, cols: usize) -> Result<Array2<f64>> {
    let too_large = || {
        warn!(rows, cols, "dense matrix does not fit in memory");
        VectorizerError::MatrixTooLarge { rows, cols }
    };
    let len = rows.checked_mul(cols).ok_or_else(too_large)?;
    len.checked_mul(std::mem::size_of::<f64>())
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .ok_or_else(too_large)?;

    let mut buf: Vec<f64> = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| too_large())?;
    buf.resize(len, 0.0);
    Array2::from_shape_vec((rows, cols), buf).map_err(|_| too_large())
}

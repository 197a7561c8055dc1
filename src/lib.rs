/// This crate builds co-occurrence signatures for tokens and rates tokens against each other.
pub mod config;
pub mod error;
pub mod utils;
pub mod vectorizer;

/// Signature
/// A sparse mapping from token to weight.
/// For a vocabulary token it holds the relative frequency of every token seen
/// within the co-occurrence window around it.
///
/// Absent tokens read as 0.
/// Supports element-wise arithmetic with scalars and with other signatures:
/// - add / sub: union of keys
/// - mul / div / min: intersection of keys
/// - pow: union of keys
///
/// Every operation returns a new value; only `set` and `remove` mutate.
pub use vectorizer::signature::Signature;

/// Vocabulary
/// Ordered unique tokens with their corpus counts.
/// The position of a token is its row in the dense matrix.
pub use vectorizer::vocab::Vocabulary;

/// Signature Builder
/// Counts co-occurrences within a symmetric window over tokenized sentences,
/// optionally folds rare neighbors into `<UNK>`, and normalizes each token's
/// neighbor counts into a `Signature` whose weights sum to 1.
///
/// `par_build` splits the sentences over the rayon pool and gives the same result
/// as `build`.
pub use vectorizer::cooccurrence::{CooccurrenceCounts, SignatureBuilder, UNKNOWN_TOKEN};

/// Vectorizer
/// The top-level struct of this crate.
/// It projects the signatures of a vocabulary into the rows of a dense matrix
/// and converts between token representations:
/// - token name
/// - row index
/// - dense vector
/// - signature
///
/// The matrix columns follow the encoding vocabulary, which is the row vocabulary
/// unless given explicitly.
/// Allocating a matrix that does not fit in memory fails with `MatrixTooLarge`;
/// the per-token signatures stay usable in that case.
pub use vectorizer::Vectorizer;

/// Token representation accepted by the `Vectorizer` conversions,
/// and the output modes of `Vectorizer::vectorize`.
pub use vectorizer::repr::{Encoded, Repr, VectorizeMode};

/// Rating Strategy and Ratings
/// Five strategies comparing a query vector with matrix rows:
/// - min: Σ min(r, q)
/// - diff: 1 − Σ |r − q|
/// - mult: dot product
/// - min/max: Σ min / max, 0 where the max is 0
/// - sqrt: (Σ sqrt(r q))²
///
/// `Ratings` holds the rank of every vocabulary token, best first.
pub use vectorizer::evaluate::rating::{RatingStrategy, Ratings};

/// Build configuration, loadable from JSON
pub use config::VectorizerConfig;

pub use error::{Result, VectorizerError};

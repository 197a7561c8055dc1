/// Errors raised by signature projection, conversion and rating
#[derive(Debug, thiserror::Error)]
pub enum VectorizerError {
    /// 受け付けない表現が渡された
    #[error("invalid input kind to be {expected}, was {found}")]
    InvalidKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown token `{0}`")]
    UnknownToken(Box<str>),

    #[error("index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    /// 次元が合わない
    /// both shapes and the element type are reported
    #[error("cannot use array of shape {found:?} ({dtype}) where shape {expected:?} ({dtype}) is required")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
        dtype: &'static str,
    },

    #[error(
        "matrix of {rows}x{cols} is too large to allocate; \
         work with the per-token signatures from SignatureBuilder instead"
    )]
    MatrixTooLarge { rows: usize, cols: usize },

    #[error("cannot average zero inputs")]
    EmptyAverage,

    #[error("unknown rating strategy `{0}` (expected one of: min, diff, mult, min/max, sqrt)")]
    UnknownStrategy(String),

    #[error("unknown vectorize mode `{0}` (expected one of: vec, int, str, 1hot, crv)")]
    UnknownMode(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VectorizerError>;

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use ndarray::{ArrayView1, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, VectorizerError},
    utils::sort::sort_score_desc,
    vectorizer::{repr::Repr, Vectorizer},
};

/// Enum for rating strategies
/// 行ベクトル `r` とクエリ `q` を比較する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingStrategy {
    /// Σ min(r, q)
    Min,
    /// 1 − Σ |r − q|
    Diff,
    /// Dot product
    Mult,
    /// Σ min(r, q) / max(r, q)
    /// columns where both are zero contribute 0
    MinMax,
    /// (Σ sqrt(r q))²
    /// negative products count as 0
    Sqrt,
}

impl RatingStrategy {
    pub const ALL: [RatingStrategy; 5] = [
        RatingStrategy::Min,
        RatingStrategy::Diff,
        RatingStrategy::Mult,
        RatingStrategy::MinMax,
        RatingStrategy::Sqrt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RatingStrategy::Min => "min",
            RatingStrategy::Diff => "diff",
            RatingStrategy::Mult => "mult",
            RatingStrategy::MinMax => "min/max",
            RatingStrategy::Sqrt => "sqrt",
        }
    }

    /// Score one row against the query
    /// 長さが違えば `ShapeMismatch`
    pub fn score(&self, row: ArrayView1<'_, f64>, query: ArrayView1<'_, f64>) -> Result<f64> {
        ensure_same_len(row.len(), query)?;
        Ok(self.score_unchecked(row, query))
    }

    /// # Panics
    /// if `row` and `query` differ in length
    #[inline]
    pub(crate) fn score_unchecked(&self, row: ArrayView1<'_, f64>, query: ArrayView1<'_, f64>) -> f64 {
        let zip = Zip::from(row).and(query);
        match self {
            RatingStrategy::Min => zip.fold(0.0, |acc, &r, &q| acc + r.min(q)),
            RatingStrategy::Diff => 1.0 - zip.fold(0.0, |acc, &r, &q| acc + (r - q).abs()),
            RatingStrategy::Mult => row.dot(&query),
            RatingStrategy::MinMax => zip.fold(0.0, |acc, &r, &q| {
                let max = r.max(q);
                if max == 0.0 {
                    acc
                } else {
                    acc + r.min(q) / max
                }
            }),
            RatingStrategy::Sqrt => {
                let root = zip.fold(0.0, |acc, &r, &q| acc + (r * q).max(0.0).sqrt());
                root * root
            }
        }
    }
}

impl FromStr for RatingStrategy {
    type Err = VectorizerError;

    fn from_str(s: &str) -> Result<Self> {
        RatingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| VectorizerError::UnknownStrategy(s.to_string()))
    }
}

impl fmt::Display for RatingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structure to store rank results
/// スコアの降順、同値ならtokenの昇順
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ratings {
    /// (token, score)
    pub list: Vec<(Box<str>, f64)>,
}

impl Ratings {
    pub fn new(mut list: Vec<(Box<str>, f64)>) -> Self {
        sort_score_desc(&mut list);
        Ratings { list }
    }

    /// tokenのスコア
    pub fn get(&self, token: &str) -> Option<f64> {
        self.list
            .iter()
            .find(|(t, _)| t.as_ref() == token)
            .map(|&(_, score)| score)
    }

    /// 上位 n 件
    #[inline]
    pub fn top(&self, n: usize) -> &[(Box<str>, f64)] {
        &self.list[..n.min(self.list.len())]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.list.iter().map(|(t, s)| (t.as_ref(), *s))
    }

    pub fn into_map(self) -> IndexMap<Box<str>, f64> {
        self.list.into_iter().collect()
    }
}

/// one `token: score` per line
impl fmt::Display for Ratings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (token, score) in &self.list {
            writeln!(f, "{}: {:.6}", token, score)?;
        }
        Ok(())
    }
}

/// 評価
impl Vectorizer {
    /// Rate every vocabulary token against the query
    ///
    /// The query may be any representation; it is first converted to a dense vector.
    pub fn rate_tokens<'a>(&self, query: impl Into<Repr<'a>>, strategy: RatingStrategy) -> Result<Ratings> {
        let query = self.to_vector(query)?;
        ensure_same_len(self.encoding_size(), query.view())?;
        let q = query.view();
        let scores = match strategy {
            RatingStrategy::Mult => self.matrix.dot(&q),
            _ => Zip::from(self.matrix.rows()).par_map_collect(|row| strategy.score_unchecked(row, q)),
        };
        debug!(strategy = strategy.name(), rows = scores.len(), "rated tokens");
        let list = self
            .vocab
            .iter()
            .cloned()
            .zip(scores.iter().copied())
            .collect();
        Ok(Ratings::new(list))
    }

    /// `rate_tokens` with the strategy given by name
    pub fn rate_tokens_by_name<'a>(&self, query: impl Into<Repr<'a>>, strategy: &str) -> Result<Ratings> {
        self.rate_tokens(query, strategy.parse()?)
    }

    /// Rate each token of a sequence in order
    /// 重複もそのまま残る
    pub fn rate_sequence<'a, T>(
        &self,
        query: impl Into<Repr<'a>>,
        sequence: &[T],
        strategy: RatingStrategy,
    ) -> Result<Vec<(Box<str>, f64)>>
    where
        T: AsRef<str>,
    {
        let query = self.to_vector(query)?;
        sequence
            .iter()
            .map(|token| {
                let token = token.as_ref();
                let row = self.row(token)?;
                Ok((token.into(), strategy.score(row, query.view())?))
            })
            .collect()
    }
}

fn ensure_same_len(expected: usize, query: ArrayView1<'_, f64>) -> Result<()> {
    if query.len() != expected {
        return Err(VectorizerError::ShapeMismatch {
            expected: vec![expected],
            found: query.shape().to_vec(),
            dtype: "f64",
        });
    }
    Ok(())
}

use std::str::FromStr;

use indexmap::IndexMap;
use ndarray::{Array1, ArrayView1};

use crate::{
    error::{Result, VectorizerError},
    vectorizer::{signature::Signature, Vectorizer},
};

/// Token の表現
/// 名前、行インデックス、密ベクトル、signature のいずれか
#[derive(Debug, Clone, Copy)]
pub enum Repr<'a> {
    Token(&'a str),
    Index(usize),
    Dense(ArrayView1<'a, f64>),
    Signature(&'a Signature),
}

impl Repr<'_> {
    /// エラーメッセージ用の名前
    pub fn kind(&self) -> &'static str {
        match self {
            Repr::Token(_) => "token",
            Repr::Index(_) => "index",
            Repr::Dense(_) => "dense vector",
            Repr::Signature(_) => "signature",
        }
    }
}

impl<'a> From<&'a str> for Repr<'a> {
    #[inline]
    fn from(token: &'a str) -> Self {
        Repr::Token(token)
    }
}

impl<'a> From<&'a String> for Repr<'a> {
    #[inline]
    fn from(token: &'a String) -> Self {
        Repr::Token(token.as_str())
    }
}

impl<'a> From<&'a Box<str>> for Repr<'a> {
    #[inline]
    fn from(token: &'a Box<str>) -> Self {
        Repr::Token(token)
    }
}

impl From<usize> for Repr<'_> {
    #[inline]
    fn from(index: usize) -> Self {
        Repr::Index(index)
    }
}

impl<'a> From<ArrayView1<'a, f64>> for Repr<'a> {
    #[inline]
    fn from(vector: ArrayView1<'a, f64>) -> Self {
        Repr::Dense(vector)
    }
}

impl<'a> From<&'a Array1<f64>> for Repr<'a> {
    #[inline]
    fn from(vector: &'a Array1<f64>) -> Self {
        Repr::Dense(vector.view())
    }
}

impl<'a> From<&'a Signature> for Repr<'a> {
    #[inline]
    fn from(signature: &'a Signature) -> Self {
        Repr::Signature(signature)
    }
}

/// `vectorize` の出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorizeMode {
    /// 行ベクトル
    Vector,
    Index,
    Token,
    OneHot,
    /// 行の非ゼロ要素
    Signature,
}

impl FromStr for VectorizeMode {
    type Err = VectorizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vec" => Ok(VectorizeMode::Vector),
            "int" => Ok(VectorizeMode::Index),
            "str" => Ok(VectorizeMode::Token),
            "1hot" => Ok(VectorizeMode::OneHot),
            "crv" => Ok(VectorizeMode::Signature),
            other => Err(VectorizerError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    Vector(Array1<f64>),
    Index(usize),
    Token(Box<str>),
    OneHot(Array1<f64>),
    Signature(Signature),
}

/// 表現の変換
impl Vectorizer {
    /// 行インデックスへ
    /// accepts a token or an index
    pub fn to_index<'a>(&self, item: impl Into<Repr<'a>>) -> Result<usize> {
        match item.into() {
            Repr::Token(token) => self
                .row_index(token)
                .ok_or_else(|| VectorizerError::UnknownToken(token.into())),
            Repr::Index(index) if index < self.vocab_size() => Ok(index),
            Repr::Index(index) => Err(VectorizerError::IndexOutOfRange {
                index,
                len: self.vocab_size(),
            }),
            other => Err(VectorizerError::InvalidKind {
                expected: "token or index",
                found: other.kind(),
            }),
        }
    }

    /// token 名へ
    /// accepts a token or an index
    pub fn to_token<'a>(&self, item: impl Into<Repr<'a>>) -> Result<&str> {
        let index = self.to_index(item)?;
        self.vocab
            .get_index(index)
            .map(|t| t.as_ref())
            .ok_or(VectorizerError::IndexOutOfRange {
                index,
                len: self.vocab_size(),
            })
    }

    /// 行列の一行を借用する
    pub fn row<'a>(&self, item: impl Into<Repr<'a>>) -> Result<ArrayView1<'_, f64>> {
        let index = self.to_index(item)?;
        Ok(self.matrix.row(index))
    }

    /// 密ベクトルへ
    ///
    /// - token, index: the matrix row
    /// - dense: checked against the column count and copied
    /// - signature: scattered onto the columns, keys outside the encoding vocabulary are dropped
    pub fn to_vector<'a>(&self, item: impl Into<Repr<'a>>) -> Result<Array1<f64>> {
        match item.into() {
            Repr::Dense(vector) => {
                self.check_dense(vector)?;
                Ok(vector.to_owned())
            }
            Repr::Signature(signature) => {
                let mut out = Array1::zeros(self.encoding_size());
                for (key, val) in signature.iter() {
                    if let Some(col) = self.column_index(key) {
                        out[col] = val;
                    }
                }
                Ok(out)
            }
            other => self.row(other).map(|row| row.to_owned()),
        }
    }

    /// Signature へ
    /// 非ゼロの列だけを残す
    ///
    /// A signature passed through `to_vector` and back keeps its keys inside the
    /// encoding vocabulary, except keys whose weight is exactly 0.
    pub fn to_signature<'a>(&self, item: impl Into<Repr<'a>>) -> Result<Signature> {
        let vector: Array1<f64> = match item.into() {
            Repr::Signature(signature) => return Ok(signature.clone()),
            other => self.to_vector(other)?,
        };
        let vals: IndexMap<Box<str>, f64> = self
            .encoding
            .iter()
            .zip(vector.iter())
            .filter(|(_, &v)| v != 0.0)
            .map(|(k, &v)| (k.clone(), v))
            .collect();
        Ok(Signature::from_map(vals))
    }

    /// 語彙サイズの one-hot ベクトル
    pub fn one_hot<'a>(&self, item: impl Into<Repr<'a>>) -> Result<Array1<f64>> {
        let index = self.to_index(item)?;
        let mut out = Array1::zeros(self.vocab_size());
        out[index] = 1.0;
        Ok(out)
    }

    /// 密ベクトルの平均
    pub fn average<'a, I, R>(&self, items: I) -> Result<Array1<f64>>
    where
        I: IntoIterator<Item = R>,
        R: Into<Repr<'a>>,
    {
        let mut sum: Array1<f64> = Array1::zeros(self.encoding_size());
        let mut n = 0usize;
        for item in items {
            sum += &self.to_vector(item)?;
            n += 1;
        }
        if n == 0 {
            return Err(VectorizerError::EmptyAverage);
        }
        Ok(sum / n as f64)
    }

    pub fn vectorize<'a>(&self, item: impl Into<Repr<'a>>, mode: VectorizeMode) -> Result<Encoded> {
        let item = item.into();
        Ok(match mode {
            VectorizeMode::Vector => Encoded::Vector(self.to_vector(item)?),
            VectorizeMode::Index => Encoded::Index(self.to_index(item)?),
            VectorizeMode::Token => Encoded::Token(self.to_token(item)?.into()),
            VectorizeMode::OneHot => Encoded::OneHot(self.one_hot(item)?),
            VectorizeMode::Signature => Encoded::Signature(self.to_signature(item)?),
        })
    }

    /// 複数の入力を同じ形式で変換
    /// 最初のエラーで止まる
    pub fn vectorize_all<'a, I, R>(&self, items: I, mode: VectorizeMode) -> Result<Vec<Encoded>>
    where
        I: IntoIterator<Item = R>,
        R: Into<Repr<'a>>,
    {
        items
            .into_iter()
            .map(|item| self.vectorize(item, mode))
            .collect()
    }

    fn check_dense(&self, vector: ArrayView1<'_, f64>) -> Result<()> {
        if vector.len() != self.encoding_size() {
            return Err(VectorizerError::ShapeMismatch {
                expected: vec![self.encoding_size()],
                found: vector.shape().to_vec(),
                dtype: "f64",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn vectorizer() -> Vectorizer {
        Vectorizer::from_matrix_with_encoding(
            ["a", "b", "c"],
            ["a", "b"],
            array![[0.0, 1.0], [0.5, 0.5], [0.25, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn index_and_token_round_trip() {
        let v = vectorizer();
        for i in 0..v.vocab_size() {
            let token = v.to_token(i).unwrap();
            assert_eq!(v.to_index(token).unwrap(), i);
        }
        assert_eq!(v.to_token("b").unwrap(), "b");
    }

    #[test]
    fn unknown_and_out_of_range_inputs() {
        let v = vectorizer();
        assert!(matches!(
            v.to_index("zzz"),
            Err(VectorizerError::UnknownToken(_))
        ));
        assert!(matches!(
            v.to_index(3usize),
            Err(VectorizerError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn dense_input_is_not_an_index() {
        let v = vectorizer();
        let vec = array![0.0, 1.0];
        match v.to_index(&vec) {
            Err(VectorizerError::InvalidKind { found, .. }) => assert_eq!(found, "dense vector"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn to_vector_from_every_repr() {
        let v = vectorizer();
        assert_eq!(v.to_vector("b").unwrap(), array![0.5, 0.5]);
        assert_eq!(v.to_vector(2usize).unwrap(), array![0.25, 0.0]);
        let dense = array![3.0, 4.0];
        assert_eq!(v.to_vector(&dense).unwrap(), dense);
        let sig: Signature = [("b", 2.0), ("outside", 9.0)].into_iter().collect();
        assert_eq!(v.to_vector(&sig).unwrap(), array![0.0, 2.0]);
    }

    #[test]
    fn wrong_dense_shape_is_rejected() {
        let v = vectorizer();
        let dense = array![1.0, 2.0, 3.0];
        match v.to_vector(&dense) {
            Err(VectorizerError::ShapeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, vec![2]);
                assert_eq!(found, vec![3]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn signature_keeps_nonzero_columns() {
        let v = vectorizer();
        let sig = v.to_signature("c").unwrap();
        assert_eq!(sig.len(), 1);
        assert_eq!(sig.get("a"), 0.25);
        let sig = v.to_signature("b").unwrap();
        assert_eq!(sig.len(), 2);
    }

    #[test]
    fn signature_round_trips_through_dense() {
        let v = vectorizer();
        let sig: Signature = [("b", 0.5), ("a", 0.25), ("outside", 9.0)].into_iter().collect();
        let dense = v.to_vector(&sig).unwrap();
        let back = v.to_signature(&dense).unwrap();
        let expected: Signature = [("a", 0.25), ("b", 0.5)].into_iter().collect();
        assert_eq!(back, expected);
        assert!(!back.contains_key("outside"));

        let zeroed: Signature = [("a", 0.0), ("b", 0.5)].into_iter().collect();
        let back = v.to_signature(&v.to_vector(&zeroed).unwrap()).unwrap();
        assert!(!back.contains_key("a"));
        assert_eq!(back.get("b"), 0.5);
    }

    #[test]
    fn dense_signature_input_is_shape_checked() {
        let v = vectorizer();
        let dense = array![1.0, 2.0, 3.0];
        assert!(matches!(
            v.to_signature(&dense),
            Err(VectorizerError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn one_hot_has_vocabulary_length() {
        let v = vectorizer();
        assert_eq!(v.one_hot("c").unwrap(), array![0.0, 0.0, 1.0]);
    }

    #[test]
    fn average_of_rows() {
        let v = vectorizer();
        let avg = v.average(["a", "b"]).unwrap();
        assert_eq!(avg, array![0.25, 0.75]);
        let none: [&str; 0] = [];
        assert!(matches!(v.average(none), Err(VectorizerError::EmptyAverage)));
    }

    #[test]
    fn mode_names() {
        assert_eq!("vec".parse::<VectorizeMode>().unwrap(), VectorizeMode::Vector);
        assert_eq!("1hot".parse::<VectorizeMode>().unwrap(), VectorizeMode::OneHot);
        assert_eq!("crv".parse::<VectorizeMode>().unwrap(), VectorizeMode::Signature);
        assert!(matches!(
            "bogus".parse::<VectorizeMode>(),
            Err(VectorizerError::UnknownMode(_))
        ));
    }

    #[test]
    fn vectorize_all_stops_at_first_error() {
        let v = vectorizer();
        let out = v.vectorize_all(["a", "c"], VectorizeMode::Index).unwrap();
        assert_eq!(out, vec![Encoded::Index(0), Encoded::Index(2)]);
        assert!(v.vectorize_all(["a", "nope"], VectorizeMode::Token).is_err());
        let out = v.vectorize(1usize, VectorizeMode::Token).unwrap();
        assert_eq!(out, Encoded::Token("b".into()));
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::sort::sort_count_desc;

/// Vocabulary 構造体
/// 順序付きのユニークなtokenと、そのコーパス内の出現回数を管理します
/// tokenの位置がそのまま行列の行インデックスになります
///
/// # Examples
/// ```
/// use crv_vectorizer::Vocabulary;
/// let sentences = vec![vec!["a", "b", "c", "b"]];
/// let vocab = Vocabulary::from_sentences(&sentences);
/// assert_eq!(vocab.token(0), Some("b"));
/// assert_eq!(vocab.count("b"), 2);
/// assert_eq!(vocab.index_of("c"), Some(2));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(from = "TokenCounts")]
pub struct Vocabulary {
    #[serde(with = "indexmap::map::serde_seq")]
    token_count: IndexMap<Box<str>, u64>,
    /// 読み込み時は `token_count` から再計算
    total_count: u64,
}

/// Deserialized form of `Vocabulary`
/// a stored `total_count` is ignored
#[derive(Deserialize)]
struct TokenCounts {
    #[serde(with = "indexmap::map::serde_seq")]
    token_count: IndexMap<Box<str>, u64>,
}

impl From<TokenCounts> for Vocabulary {
    fn from(raw: TokenCounts) -> Self {
        let total_count = raw.token_count.values().sum();
        Vocabulary {
            token_count: raw.token_count,
            total_count,
        }
    }
}

/// 生成
impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary {
            token_count: IndexMap::new(),
            total_count: 0,
        }
    }

    /// Count every token of every sentence
    /// Ordered by descending count, ties by ascending token
    pub fn from_sentences<S, T>(sentences: &[S]) -> Self
    where
        S: AsRef<[T]>,
        T: AsRef<str>,
    {
        let mut vocab = Vocabulary::new();
        for sentence in sentences {
            vocab.add_tokens(sentence.as_ref());
        }
        sort_count_desc(&mut vocab.token_count);
        vocab
    }

    /// Keep the caller's token order
    /// A repeated token accumulates its counts at its first position
    pub fn from_counts<I, K>(counts: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<Box<str>>,
    {
        let mut vocab = Vocabulary::new();
        for (token, count) in counts {
            *vocab.token_count.entry(token.into()).or_insert(0) += count;
            vocab.total_count += count;
        }
        vocab
    }

    /// tokenを追加する
    #[inline]
    pub fn add_token(&mut self, token: &str) -> &mut Self {
        let count = self.token_count.entry(token.into()).or_insert(0);
        *count += 1;
        self.total_count += 1;
        self
    }

    /// 複数のtokenを追加する
    #[inline]
    pub fn add_tokens<T>(&mut self, tokens: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for token in tokens {
            self.add_token(token.as_ref());
        }
        self
    }
}

/// 情報の取得
impl Vocabulary {
    #[inline]
    pub fn len(&self) -> usize {
        self.token_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token_count.is_empty()
    }

    /// tokenの出現回数
    /// 存在しなければ 0
    #[inline]
    pub fn count(&self, token: &str) -> u64 {
        self.token_count.get(token).copied().unwrap_or(0)
    }

    /// 全tokenのカウントの合計
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// share of the token among all token occurrences
    #[inline]
    pub fn ratio(&self, token: &str) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.count(token) as f64 / self.total_count as f64
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.token_count.contains_key(token)
    }

    /// 行インデックス
    #[inline]
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.token_count.get_index_of(token)
    }

    #[inline]
    pub fn token(&self, index: usize) -> Option<&str> {
        self.token_count.get_index(index).map(|(k, _)| k.as_ref())
    }

    #[inline]
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.token_count.keys().map(|k| k.as_ref())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.token_count.iter().map(|(k, &c)| (k.as_ref(), c))
    }

    /// Tokens seen more than `threshold` times
    /// Ordered by descending count, ties by ascending token
    pub fn encoding_tokens(&self, threshold: u64) -> Vec<Box<str>> {
        let mut kept: IndexMap<Box<str>, u64> = self
            .token_count
            .iter()
            .filter(|(_, &c)| c > threshold)
            .map(|(k, &c)| (k.clone(), c))
            .collect();
        sort_count_desc(&mut kept);
        kept.into_keys().collect()
    }

    /// 出現回数が `threshold` 以下のtoken
    #[inline]
    pub fn is_rare(&self, token: &str, threshold: u64) -> bool {
        self.count(token) <= threshold
    }
}

pub mod ops;

use std::{fmt, ops::Index};

use indexmap::IndexMap;
use num::Float;
use serde::{Deserialize, Serialize};

use crate::utils::sort::{cmp_abs_desc, sort_abs_desc};

/// Signature 構造体
/// tokenから重みへの疎な写像です
/// 共起の相対頻度を表し、要素ごとの演算をサポートします
///
/// 存在しないtokenは 0 として読まれます
///
/// # Examples
/// ```
/// use crv_vectorizer::Signature;
/// let a: Signature = [("x", 1.0), ("y", 2.0)].into_iter().collect();
/// let b: Signature = [("y", 3.0), ("z", 4.0)].into_iter().collect();
///
/// let sum = &a + &b;       // union of keys
/// let prod = &a * &b;      // intersection of keys
/// assert_eq!(sum.get("z"), 4.0);
/// assert_eq!(prod.len(), 1);
/// assert_eq!(a.get("missing"), 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature<N = f64>
where
    N: Float,
{
    vals: IndexMap<Box<str>, N>,
    /// `Index` の参照先
    #[serde(skip, default = "N::zero")]
    zero: N,
}

/// 生成
impl<N> Signature<N>
where
    N: Float,
{
    #[inline]
    pub fn new() -> Self {
        Signature {
            vals: IndexMap::new(),
            zero: N::zero(),
        }
    }

    /// Build from a raw map, reordering by descending absolute value
    #[inline]
    pub fn from_map(mut vals: IndexMap<Box<str>, N>) -> Self {
        sort_abs_desc(&mut vals);
        Signature {
            vals,
            zero: N::zero(),
        }
    }

    /// Apply `f` to every value, keeping the key set
    #[inline]
    pub(crate) fn map_values<F>(&self, f: F) -> Self
    where
        F: Fn(N) -> N,
    {
        self.vals.iter().map(|(k, &v)| (k.clone(), f(v))).collect()
    }
}

/// 値の取得、設定、削除
impl<N> Signature<N>
where
    N: Float,
{
    /// tokenの重みを取得します
    /// 存在しなければ 0
    #[inline]
    pub fn get(&self, token: &str) -> N {
        self.vals.get(token).copied().unwrap_or(self.zero)
    }

    /// 重みを設定します
    /// 既存なら上書きし古い値を返す、新規なら末尾に追加
    #[inline]
    pub fn set(&mut self, token: &str, value: N) -> Option<N> {
        self.vals.insert(token.into(), value)
    }

    /// tokenを削除して値を返す
    /// 存在しなければ None
    #[inline]
    pub fn remove(&mut self, token: &str) -> Option<N> {
        self.vals.shift_remove(token)
    }

    #[inline]
    pub fn contains_key(&self, token: &str) -> bool {
        self.vals.contains_key(token)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// Keys in insertion order
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vals.keys().map(|k| k.as_ref())
    }

    #[inline]
    pub fn values(&self) -> impl Iterator<Item = N> + '_ {
        self.vals.values().copied()
    }

    /// `(token, weight)` in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, N)> {
        self.vals.iter().map(|(k, &v)| (k.as_ref(), v))
    }

    #[inline]
    pub fn as_map(&self) -> &IndexMap<Box<str>, N> {
        &self.vals
    }

    #[inline]
    pub fn into_map(self) -> IndexMap<Box<str>, N> {
        self.vals
    }

    /// 全ての重みの合計
    #[inline]
    pub fn sum(&self) -> N {
        self.vals.values().fold(N::zero(), |acc, &v| acc + v)
    }

    /// Entries by descending absolute value, ties by ascending token
    /// Independent of the current insertion order
    pub fn sorted_entries(&self) -> Vec<(&str, N)> {
        let mut entries: Vec<(&str, N)> = self.iter().collect();
        entries.sort_by(|a, b| cmp_abs_desc(*a, *b));
        entries
    }
}

impl<N> Default for Signature<N>
where
    N: Float,
{
    #[inline]
    fn default() -> Self {
        Signature::new()
    }
}

/// 順序は無視して比較
impl<N> PartialEq for Signature<N>
where
    N: Float,
{
    fn eq(&self, other: &Self) -> bool {
        self.vals == other.vals
    }
}

impl<N> Index<&str> for Signature<N>
where
    N: Float,
{
    type Output = N;

    #[inline]
    fn index(&self, token: &str) -> &Self::Output {
        self.vals.get(token).unwrap_or(&self.zero)
    }
}

impl<K, N> FromIterator<(K, N)> for Signature<N>
where
    K: Into<Box<str>>,
    N: Float,
{
    fn from_iter<I: IntoIterator<Item = (K, N)>>(iter: I) -> Self {
        let vals = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Signature::from_map(vals)
    }
}

impl<N> From<IndexMap<Box<str>, N>> for Signature<N>
where
    N: Float,
{
    #[inline]
    fn from(vals: IndexMap<Box<str>, N>) -> Self {
        Signature::from_map(vals)
    }
}

impl<'a, N> IntoIterator for &'a Signature<N>
where
    N: Float,
{
    type Item = (&'a Box<str>, &'a N);
    type IntoIter = indexmap::map::Iter<'a, Box<str>, N>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.vals.iter()
    }
}

impl<N> Signature<N>
where
    N: Float,
{
    /// 表示する最大件数
    pub const PRINT_CUTOFF: usize = 20;
    pub const PRINT_ROUND_DIGITS: usize = 2;
}

/// `{}` shows the strongest entries and a count of the rest
/// `{:#}` shows every entry
impl<N> fmt::Display for Signature<N>
where
    N: Float + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.sorted_entries();
        let cutoff = if f.alternate() {
            entries.len()
        } else {
            Self::PRINT_CUTOFF
        };
        write!(f, "{{")?;
        for (token, val) in entries.iter().take(cutoff) {
            let sign = if *val >= N::zero() { '+' } else { '-' };
            let token = if *token == "\n" { "\\n" } else { token };
            write!(
                f,
                " {} {:.*}\u{22C5}{}",
                sign,
                Self::PRINT_ROUND_DIGITS,
                val.abs(),
                token
            )?;
        }
        if entries.len() > cutoff {
            write!(f, " + {} others", entries.len() - cutoff)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(pairs: &[(&str, f64)]) -> Signature {
        pairs.iter().map(|&(k, v)| (k, v)).collect()
    }

    #[test]
    fn absent_key_reads_zero() {
        let s = sig(&[("a", 0.25)]);
        assert_eq!(s.get("nope"), 0.0);
        assert_eq!(s["nope"], 0.0);
        assert_eq!(s["a"], 0.25);
        assert!(Signature::<f32>::new().get("x") == 0.0);
    }

    #[test]
    fn construction_orders_by_abs_desc() {
        let s = sig(&[("b", 0.1), ("a", -0.7), ("c", 0.7)]);
        let keys: Vec<&str> = s.keys().collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
    }

    #[test]
    fn set_and_remove() {
        let mut s = sig(&[("a", 1.0)]);
        assert_eq!(s.set("a", 2.0), Some(1.0));
        assert_eq!(s.set("z", 0.5), None);
        assert_eq!(s.keys().last(), Some("z"));
        assert_eq!(s.remove("a"), Some(2.0));
        assert_eq!(s.remove("a"), None);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn equality_ignores_order() {
        let mut a = Signature::new();
        a.set("x", 1.0);
        a.set("y", 2.0);
        let b = sig(&[("y", 2.0), ("x", 1.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn display_does_not_touch_iteration_order() {
        let mut s = Signature::new();
        s.set("low", 0.1);
        s.set("high", 0.9);
        assert_eq!(s.to_string(), "{ + 0.90\u{22C5}high + 0.10\u{22C5}low}");
        let keys: Vec<&str> = s.keys().collect();
        assert_eq!(keys, vec!["low", "high"]);
    }

    #[test]
    fn display_truncates_with_summary() {
        let s: Signature = (0..25).map(|i| (format!("t{i:02}"), i as f64)).collect();
        let short = s.to_string();
        assert!(short.ends_with(" + 5 others}"));
        assert!(short.contains("24.00\u{22C5}t24"));
        assert!(!short.contains("t00"));
        let full = format!("{s:#}");
        assert!(full.contains("t00"));
        assert!(!full.contains("others"));
    }

    #[test]
    fn display_marks_negative_and_newline() {
        let s = sig(&[("\n", -0.5)]);
        assert_eq!(s.to_string(), "{ - 0.50\u{22C5}\\n}");
    }

    #[test]
    fn exactly_cutoff_entries_has_no_summary() {
        let s: Signature = (0..20).map(|i| (format!("t{i}"), 1.0)).collect();
        assert!(!s.to_string().contains("others"));
    }

    #[test]
    fn sum_of_values() {
        let s = sig(&[("a", 0.25), ("b", 0.75)]);
        assert!((s.sum() - 1.0).abs() < 1e-12);
    }
}

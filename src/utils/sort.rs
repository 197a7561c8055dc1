use std::cmp::Ordering;

use indexmap::IndexMap;
use num::Float;

/// 絶対値の降順、同値ならtokenの昇順
/// NaN sorts before every number
#[inline]
pub fn cmp_abs_desc<N: Float>(a: (&str, N), b: (&str, N)) -> Ordering {
    let (x, y) = (a.1.abs(), b.1.abs());
    let by_abs = match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
    };
    by_abs.then_with(|| a.0.cmp(b.0))
}

/// 値の降順、同値ならtokenの昇順
#[inline]
pub fn cmp_score_desc(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Reorder a token map in place by descending absolute value
#[inline]
pub fn sort_abs_desc<N: Float>(map: &mut IndexMap<Box<str>, N>) {
    map.sort_by(|k1, v1, k2, v2| cmp_abs_desc((k1, *v1), (k2, *v2)));
}

/// Reorder a token count map in place by descending count
#[inline]
pub fn sort_count_desc(map: &mut IndexMap<Box<str>, u64>) {
    map.sort_by(|k1, v1, k2, v2| v2.cmp(v1).then_with(|| k1.cmp(k2)));
}

/// Sort `(token, score)` pairs by descending score
#[inline]
pub fn sort_score_desc(list: &mut [(Box<str>, f64)]) {
    list.sort_by(|a, b| cmp_score_desc((&a.0, a.1), (&b.0, b.1)));
}

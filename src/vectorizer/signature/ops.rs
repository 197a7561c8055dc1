use std::ops::{Add, Div, Mul, Neg, Sub};

use indexmap::IndexMap;
use num::{pow::Pow, Float};

use super::Signature;

/// 要素ごとの演算
///
/// key domain per operator:
/// - `add` / `sub` / `pow`: union, an absent side reads as 0
/// - `mul` / `div` / `min`: intersection, one-sided keys are dropped
impl<N> Signature<N>
where
    N: Float,
{
    /// 和集合で `f(self, other)`
    fn union_with<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(N, N) -> N,
    {
        let mut out: IndexMap<Box<str>, N> = IndexMap::with_capacity(self.len() + other.len());
        for (k, &v) in self.vals.iter() {
            out.insert(k.clone(), f(v, other.get(k)));
        }
        for (k, &v) in other.vals.iter() {
            if !self.vals.contains_key(k) {
                out.insert(k.clone(), f(N::zero(), v));
            }
        }
        Signature::from_map(out)
    }

    /// 積集合で `f(self, other)`
    fn intersect_with<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(N, N) -> N,
    {
        self.vals
            .iter()
            .filter_map(|(k, &v)| other.vals.get(k).map(|&o| (k.clone(), f(v, o))))
            .collect()
    }

    #[inline]
    pub fn add(&self, other: &Self) -> Self {
        self.union_with(other, |a, b| a + b)
    }

    #[inline]
    pub fn add_scalar(&self, s: N) -> Self {
        self.map_values(|v| v + s)
    }

    #[inline]
    pub fn sub(&self, other: &Self) -> Self {
        self.union_with(other, |a, b| a - b)
    }

    /// `other - self`
    #[inline]
    pub fn sub_rev(&self, other: &Self) -> Self {
        other.sub(self)
    }

    #[inline]
    pub fn sub_scalar(&self, s: N) -> Self {
        self.map_values(|v| v - s)
    }

    /// `s - value`
    #[inline]
    pub fn sub_scalar_rev(&self, s: N) -> Self {
        self.map_values(|v| s - v)
    }

    #[inline]
    pub fn mul(&self, other: &Self) -> Self {
        self.intersect_with(other, |a, b| a * b)
    }

    #[inline]
    pub fn mul_scalar(&self, s: N) -> Self {
        self.map_values(|v| v * s)
    }

    #[inline]
    pub fn div(&self, other: &Self) -> Self {
        self.intersect_with(other, |a, b| a / b)
    }

    /// `other / self`
    #[inline]
    pub fn div_rev(&self, other: &Self) -> Self {
        other.div(self)
    }

    #[inline]
    pub fn div_scalar(&self, s: N) -> Self {
        self.map_values(|v| v / s)
    }

    /// `s / value`
    #[inline]
    pub fn div_scalar_rev(&self, s: N) -> Self {
        self.map_values(|v| s / v)
    }

    #[inline]
    pub fn pow(&self, other: &Self) -> Self {
        self.union_with(other, |a, b| a.powf(b))
    }

    /// `other ^ self`
    #[inline]
    pub fn pow_rev(&self, other: &Self) -> Self {
        other.pow(self)
    }

    #[inline]
    pub fn pow_scalar(&self, s: N) -> Self {
        self.map_values(|v| v.powf(s))
    }

    /// `s ^ value`
    #[inline]
    pub fn pow_scalar_rev(&self, s: N) -> Self {
        self.map_values(|v| s.powf(v))
    }

    #[inline]
    pub fn abs(&self) -> Self {
        self.map_values(|v| v.abs())
    }

    /// 全ての値を `s` 以下に切り詰める
    #[inline]
    pub fn min_scalar(&self, s: N) -> Self {
        self.map_values(|v| v.min(s))
    }

    /// 積集合での要素ごとの最小値
    #[inline]
    pub fn min(&self, other: &Self) -> Self {
        self.intersect_with(other, |a, b| a.min(b))
    }
}

/// signature ⊕ signature
macro_rules! impl_signature_op {
    ($trait:ident, $method:ident, $named:ident) => {
        impl<'a, N> $trait<&'a Signature<N>> for &'a Signature<N>
        where
            N: Float,
        {
            type Output = Signature<N>;

            #[inline]
            fn $method(self, other: &'a Signature<N>) -> Signature<N> {
                Signature::$named(self, other)
            }
        }

        impl<N> $trait<Signature<N>> for Signature<N>
        where
            N: Float,
        {
            type Output = Signature<N>;

            #[inline]
            fn $method(self, other: Signature<N>) -> Signature<N> {
                Signature::$named(&self, &other)
            }
        }
    };
}

impl_signature_op!(Add, add, add);
impl_signature_op!(Sub, sub, sub);
impl_signature_op!(Mul, mul, mul);
impl_signature_op!(Div, div, div);
impl_signature_op!(Pow, pow, pow);

/// signature ⊕ scalar と scalar ⊕ signature
macro_rules! impl_scalar_ops {
    ($($n:ty),*) => {$(
        impl_scalar_ops!(@op $n, Add, add, add_scalar, add_scalar);
        impl_scalar_ops!(@op $n, Sub, sub, sub_scalar, sub_scalar_rev);
        impl_scalar_ops!(@op $n, Mul, mul, mul_scalar, mul_scalar);
        impl_scalar_ops!(@op $n, Div, div, div_scalar, div_scalar_rev);
        impl_scalar_ops!(@op $n, Pow, pow, pow_scalar, pow_scalar_rev);
    )*};
    (@op $n:ty, $trait:ident, $method:ident, $fwd:ident, $rev:ident) => {
        impl $trait<$n> for &Signature<$n> {
            type Output = Signature<$n>;

            #[inline]
            fn $method(self, s: $n) -> Signature<$n> {
                self.$fwd(s)
            }
        }

        impl $trait<$n> for Signature<$n> {
            type Output = Signature<$n>;

            #[inline]
            fn $method(self, s: $n) -> Signature<$n> {
                self.$fwd(s)
            }
        }

        impl $trait<&Signature<$n>> for $n {
            type Output = Signature<$n>;

            #[inline]
            fn $method(self, sig: &Signature<$n>) -> Signature<$n> {
                sig.$rev(self)
            }
        }

        impl $trait<Signature<$n>> for $n {
            type Output = Signature<$n>;

            #[inline]
            fn $method(self, sig: Signature<$n>) -> Signature<$n> {
                sig.$rev(self)
            }
        }
    };
}

impl_scalar_ops!(f32, f64);

impl<N> Neg for &Signature<N>
where
    N: Float,
{
    type Output = Signature<N>;

    #[inline]
    fn neg(self) -> Signature<N> {
        self.map_values(|v| -v)
    }
}

impl<N> Neg for Signature<N>
where
    N: Float,
{
    type Output = Signature<N>;

    #[inline]
    fn neg(self) -> Signature<N> {
        -&self
    }
}

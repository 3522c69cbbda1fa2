use core::fmt::Debug;
use num_complex::Complex;
use num_traits::{Float, Num, One, Zero};

/// Trait for types that can be used as buffer elements.
///
/// Blanket-implemented for all types satisfying the bounds. `Send + Sync`
/// is required so buffers can be partitioned across worker threads.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num + Send + Sync + 'static {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num + Send + Sync + 'static> Scalar for T {}

/// Trait for real floating-point elements.
///
/// Implies `LinalgScalar<Real = Self>` since real floats are their own real type.
pub trait FloatScalar: Scalar + Float + LinalgScalar<Real = Self> {}

impl<T: Scalar + Float + LinalgScalar<Real = T>> FloatScalar for T {}

/// Trait for elements that support the decompositions in this crate.
///
/// Covers real floats (`f32`, `f64`) and complex numbers (`Complex<f32>`,
/// `Complex<f64>`). Every algorithm body is written once against this trait;
/// conjugation and modulus collapse to the identity and `abs` for reals.
pub trait LinalgScalar: Scalar {
    /// The real component type (`Self` for reals, `T` for `Complex<T>`).
    type Real: FloatScalar;

    /// Absolute value / modulus: `|z|` for complex, `.abs()` for real.
    fn modulus(self) -> Self::Real;

    /// Complex conjugate (identity for reals).
    fn conj(self) -> Self;

    /// Real part.
    fn re(self) -> Self::Real;

    /// Imaginary part (zero for reals).
    fn im(self) -> Self::Real;

    /// Square root.
    fn lsqrt(self) -> Self;

    /// Raise to a power of the same kind (`powf` / `powc`).
    fn lpow(self, exponent: Self) -> Self;

    /// Machine epsilon of the underlying real type.
    fn lepsilon() -> Self::Real;

    /// Promote a real value into `Self`.
    fn from_real(r: Self::Real) -> Self;

    /// View the value as a complex number.
    fn to_complex(self) -> Complex<Self::Real>;

    /// Squared modulus without the square root.
    #[inline]
    fn modulus_sqr(self) -> Self::Real {
        (self * self.conj()).re()
    }

    /// Unit-modulus phase of `self`, or one when `self` is zero.
    ///
    /// For reals this is the sign, with `+1` at zero.
    #[inline]
    fn phase(self) -> Self {
        let m = self.modulus();
        if m == <Self::Real as Zero>::zero() {
            Self::one()
        } else {
            self / Self::from_real(m)
        }
    }
}

macro_rules! impl_linalg_scalar_real {
    ($($t:ty),*) => {
        $(
            impl LinalgScalar for $t {
                type Real = $t;

                #[inline] fn modulus(self) -> $t { Float::abs(self) }
                #[inline] fn conj(self) -> $t { self }
                #[inline] fn re(self) -> $t { self }
                #[inline] fn im(self) -> $t { 0.0 }
                #[inline] fn lsqrt(self) -> $t { Float::sqrt(self) }
                #[inline] fn lpow(self, exponent: $t) -> $t { Float::powf(self, exponent) }
                #[inline] fn lepsilon() -> $t { <$t as Float>::epsilon() }
                #[inline] fn from_real(r: $t) -> $t { r }
                #[inline] fn to_complex(self) -> Complex<$t> { Complex::new(self, 0.0) }
            }
        )*
    };
}

impl_linalg_scalar_real!(f32, f64);

impl<T: FloatScalar> LinalgScalar for Complex<T> {
    type Real = T;

    #[inline]
    fn modulus(self) -> T {
        self.norm()
    }

    #[inline]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }

    #[inline]
    fn re(self) -> T {
        self.re
    }

    #[inline]
    fn im(self) -> T {
        self.im
    }

    #[inline]
    fn lsqrt(self) -> Self {
        self.sqrt()
    }

    #[inline]
    fn lpow(self, exponent: Self) -> Self {
        self.powc(exponent)
    }

    #[inline]
    fn lepsilon() -> T {
        T::epsilon()
    }

    #[inline]
    fn from_real(r: T) -> Self {
        Complex::new(r, T::zero())
    }

    #[inline]
    fn to_complex(self) -> Complex<T> {
        self
    }

    #[inline]
    fn modulus_sqr(self) -> T {
        self.norm_sqr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_phase_is_sign() {
        assert_eq!((-3.0_f64).phase(), -1.0);
        assert_eq!(2.5_f64.phase(), 1.0);
        assert_eq!(0.0_f64.phase(), 1.0);
    }

    #[test]
    fn complex_phase_has_unit_modulus() {
        let z = Complex::new(3.0_f64, -4.0);
        let p = z.phase();
        assert!((p.modulus() - 1.0).abs() < 1e-15);
        assert!((p * Complex::from_real(5.0) - z).norm() < 1e-14);
        assert_eq!(Complex::new(0.0_f64, 0.0).phase(), Complex::new(1.0, 0.0));
    }

    #[test]
    fn modulus_sqr_matches_product_with_conjugate() {
        let z = Complex::new(1.5_f32, 2.0);
        assert!((z.modulus_sqr() - 6.25).abs() < 1e-6);
        assert_eq!((-2.0_f32).modulus_sqr(), 4.0);
    }
}

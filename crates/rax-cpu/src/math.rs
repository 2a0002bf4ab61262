//! Element-wise arithmetic for CPU backend
//!
//! Integer kernels run in `i128` and wrap to the dtype's width afterwards, so overflow
//! matches two's-complement hardware.

use crate::array::{default_float, x64};
use crate::broadcast::broadcast_binary_op;
use crate::CpuArray;
use num_complex::Complex64;
use rax_core::{
    result_type, Array, BinaryOps, DType, DTypeKind, Operand, RaxError, Result, UnaryOps,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arith {
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Rem,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    Maximum,
    Minimum,
}

impl Arith {
    fn name(self) -> &'static str {
        match self {
            Arith::Add => "add",
            Arith::Sub => "subtract",
            Arith::Mul => "multiply",
            Arith::TrueDiv => "true_divide",
            Arith::FloorDiv => "floor_divide",
            Arith::Rem => "remainder",
            Arith::Pow => "power",
            Arith::Shl => "left_shift",
            Arith::Shr => "right_shift",
            Arith::BitAnd => "bitwise_and",
            Arith::BitXor => "bitwise_xor",
            Arith::BitOr => "bitwise_or",
            Arith::Maximum => "maximum",
            Arith::Minimum => "minimum",
        }
    }

    /// Checks that `dtype` supports this operation.
    pub(crate) fn check(self, dtype: DType) -> Result<()> {
        let ok = match (self, dtype.kind()) {
            (Arith::Shl | Arith::Shr, kind) => {
                matches!(kind, DTypeKind::SignedInt | DTypeKind::UnsignedInt)
            }
            (Arith::BitAnd | Arith::BitXor | Arith::BitOr, kind) => {
                !matches!(kind, DTypeKind::Float | DTypeKind::Complex)
            }
            (Arith::Sub | Arith::FloorDiv | Arith::Rem | Arith::Pow, DTypeKind::Bool) => false,
            (Arith::FloorDiv | Arith::Rem | Arith::Maximum | Arith::Minimum, DTypeKind::Complex) => {
                false
            }
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(RaxError::UnsupportedDType {
                op: self.name(),
                dtype,
            })
        }
    }

    /// Dtype of the result when both operands have been promoted to `dtype`.
    pub(crate) fn output_dtype(self, dtype: DType) -> DType {
        match self {
            Arith::TrueDiv if !dtype.is_inexact() => default_float(),
            _ => dtype,
        }
    }
}

/// Wraps an exact integer result into `dtype`.
pub(crate) fn wrap_int(dtype: DType, v: i128) -> f64 {
    let bits = dtype.bits();
    let modulus = 1i128 << bits;
    let mut r = v.rem_euclid(modulus);
    if dtype.is_signed_integer() && r >= modulus / 2 {
        r -= modulus;
    }
    r as f64
}

fn nan_max(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.max(y)
    }
}

fn nan_min(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.min(y)
    }
}

fn int_kernel(op: Arith, dtype: DType, x: f64, y: f64) -> f64 {
    let (a, b) = (x as i128, y as i128);
    let bits = dtype.bits() as i128;
    let v = match op {
        Arith::Add => a + b,
        Arith::Sub => a - b,
        Arith::Mul => a.wrapping_mul(b),
        Arith::FloorDiv => {
            if b == 0 {
                0
            } else {
                a.div_euclid(b) - i128::from(b < 0 && a.rem_euclid(b) != 0)
            }
        }
        Arith::Rem => {
            if b == 0 {
                0
            } else {
                let r = a % b;
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            }
        }
        Arith::Pow => a.wrapping_pow(b.clamp(0, u32::MAX as i128) as u32),
        Arith::Shl => {
            if b < 0 || b >= bits {
                0
            } else {
                a << b
            }
        }
        Arith::Shr => {
            if b < 0 || b >= bits {
                if a < 0 {
                    -1
                } else {
                    0
                }
            } else {
                a >> b
            }
        }
        Arith::BitAnd => a & b,
        Arith::BitXor => a ^ b,
        Arith::BitOr => a | b,
        Arith::Maximum => a.max(b),
        Arith::Minimum => a.min(b),
        Arith::TrueDiv => return x / y,
    };
    wrap_int(dtype, v)
}

/// Applies `op` to two values already converted to the real dtype `dtype`.
pub(crate) fn apply_real(op: Arith, dtype: DType, x: f64, y: f64) -> f64 {
    match dtype.kind() {
        DTypeKind::SignedInt | DTypeKind::UnsignedInt => int_kernel(op, dtype, x, y),
        DTypeKind::Bool => {
            let (a, b) = (x != 0.0, y != 0.0);
            let v = match op {
                Arith::Add | Arith::BitOr | Arith::Maximum => a || b,
                Arith::Mul | Arith::BitAnd | Arith::Minimum => a && b,
                Arith::BitXor => a ^ b,
                Arith::TrueDiv => return x / y,
                _ => false,
            };
            f64::from(u8::from(v))
        }
        DTypeKind::Float | DTypeKind::Complex => match op {
            Arith::Add => x + y,
            Arith::Sub => x - y,
            Arith::Mul => x * y,
            Arith::TrueDiv => x / y,
            Arith::FloorDiv => (x / y).floor(),
            Arith::Rem => {
                let r = x % y;
                if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                    r + y
                } else {
                    r
                }
            }
            Arith::Pow => x.powf(y),
            Arith::Maximum => nan_max(x, y),
            Arith::Minimum => nan_min(x, y),
            _ => f64::NAN,
        },
    }
}

pub(crate) fn apply_complex(op: Arith, x: Complex64, y: Complex64) -> Complex64 {
    match op {
        Arith::Add => x + y,
        Arith::Sub => x - y,
        Arith::Mul => x * y,
        Arith::TrueDiv => x / y,
        Arith::Pow => {
            if y == Complex64::new(0.0, 0.0) {
                Complex64::new(1.0, 0.0)
            } else {
                x.powc(y)
            }
        }
        _ => Complex64::new(f64::NAN, f64::NAN),
    }
}

/// Promoted dtype and weak flag of two operands.
pub(crate) fn promote(a: &CpuArray, b: &CpuArray) -> (DType, bool) {
    result_type((a.dtype(), a.weak_type()), (b.dtype(), b.weak_type()), x64())
}

/// Element-wise `lhs OP rhs` with promotion and broadcasting.
pub(crate) fn binary(lhs: &CpuArray, rhs: &CpuArray, op: Arith) -> Result<CpuArray> {
    let (dtype, weak) = promote(lhs, rhs);
    op.check(dtype)?;
    let out = op.output_dtype(dtype);
    let (a, b) = (lhs.cast_to(out, weak), rhs.cast_to(out, weak));

    if op == Arith::Pow && out.is_integer() && b.as_ndarray().iter().any(|&y| y < 0.0) {
        return Err(RaxError::InvalidArgument(
            "integers to negative integer powers are not allowed".to_string(),
        ));
    }

    if out.is_complex() {
        let values = broadcast_binary_op(&a.complex_ndarray(), &b.complex_ndarray(), |x, y| {
            apply_complex(op, x, y)
        })?;
        return Ok(CpuArray::from_complex(values, out, weak));
    }
    let values = broadcast_binary_op(a.as_ndarray(), b.as_ndarray(), |x, y| {
        apply_real(op, out, x, y)
    })?;
    Ok(CpuArray::from_parts(values, None, out, weak))
}

fn forward(lhs: &CpuArray, other: Operand<'_, CpuArray>, op: Arith) -> Result<CpuArray> {
    binary(lhs, &CpuArray::operand(other), op)
}

fn reflected(rhs: &CpuArray, other: Operand<'_, CpuArray>, op: Arith) -> Result<CpuArray> {
    binary(&CpuArray::operand(other), rhs, op)
}

macro_rules! impl_binary_ops {
    ($(($name:ident, $rname:ident, $op:expr)),* $(,)?) => {
        $(
            fn $name<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
            where
                Self: 'o,
            {
                forward(self, other.into(), $op)
            }

            fn $rname<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
            where
                Self: 'o,
            {
                reflected(self, other.into(), $op)
            }
        )*
    };
}

impl BinaryOps for CpuArray {
    impl_binary_ops!(
        (add, radd, Arith::Add),
        (sub, rsub, Arith::Sub),
        (mul, rmul, Arith::Mul),
        (true_div, rtrue_div, Arith::TrueDiv),
        (floor_div, rfloor_div, Arith::FloorDiv),
        (rem, rrem, Arith::Rem),
        (pow, rpow, Arith::Pow),
        (shl, rshl, Arith::Shl),
        (shr, rshr, Arith::Shr),
        (bitand, rbitand, Arith::BitAnd),
        (bitxor, rbitxor, Arith::BitXor),
        (bitor, rbitor, Arith::BitOr),
    );

    fn matmul<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o,
    {
        crate::linalg::matmul(self, &CpuArray::operand(other.into()))
    }

    fn rmatmul<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<Self>
    where
        Self: 'o,
    {
        crate::linalg::matmul(&CpuArray::operand(other.into()), self)
    }

    fn divmod<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<(Self, Self)>
    where
        Self: 'o,
    {
        let other = CpuArray::operand(other.into());
        Ok((
            binary(self, &other, Arith::FloorDiv)?,
            binary(self, &other, Arith::Rem)?,
        ))
    }

    fn rdivmod<'o>(&self, other: impl Into<Operand<'o, Self>>) -> Result<(Self, Self)>
    where
        Self: 'o,
    {
        let other = CpuArray::operand(other.into());
        Ok((
            binary(&other, self, Arith::FloorDiv)?,
            binary(&other, self, Arith::Rem)?,
        ))
    }
}

impl UnaryOps for CpuArray {
    fn neg(&self) -> Result<Self> {
        let dtype = self.dtype();
        if dtype.is_bool() {
            return Err(RaxError::UnsupportedDType {
                op: "negative",
                dtype,
            });
        }
        let data = if dtype.is_integer() {
            self.as_ndarray().mapv(|x| wrap_int(dtype, -(x as i128)))
        } else {
            self.as_ndarray().mapv(|x| -x)
        };
        let imag = self.imag_ndarray().map(|im| im.mapv(|x| -x));
        Ok(CpuArray::from_parts(data, imag, dtype, self.weak_type()))
    }

    fn pos(&self) -> Result<Self> {
        Ok(self.cast_to(self.dtype(), self.weak_type()))
    }

    fn abs(&self) -> Result<Self> {
        let dtype = self.dtype();
        match dtype.kind() {
            DTypeKind::Complex => {
                let magnitude = self.complex_ndarray().mapv(|z| z.norm());
                Ok(CpuArray::from_parts(
                    magnitude,
                    None,
                    dtype.component(),
                    self.weak_type(),
                ))
            }
            DTypeKind::SignedInt => {
                let data = self.as_ndarray().mapv(|x| wrap_int(dtype, (x as i128).abs()));
                Ok(CpuArray::from_parts(data, None, dtype, self.weak_type()))
            }
            DTypeKind::Float => Ok(CpuArray::from_parts(
                self.as_ndarray().mapv(f64::abs),
                None,
                dtype,
                self.weak_type(),
            )),
            DTypeKind::Bool | DTypeKind::UnsignedInt => self.pos(),
        }
    }

    fn invert(&self) -> Result<Self> {
        let dtype = self.dtype();
        let data = match dtype.kind() {
            DTypeKind::Bool => self.as_ndarray().mapv(|x| f64::from(u8::from(x == 0.0))),
            DTypeKind::SignedInt | DTypeKind::UnsignedInt => {
                self.as_ndarray().mapv(|x| wrap_int(dtype, !(x as i128)))
            }
            _ => return Err(RaxError::UnsupportedDType { op: "invert", dtype }),
        };
        Ok(CpuArray::from_parts(data, None, dtype, self.weak_type()))
    }
}

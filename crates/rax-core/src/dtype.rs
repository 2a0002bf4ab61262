//! Data types supported by rax
//!
//! Besides the element types themselves this module owns the promotion lattice used by
//! binary operations, including the handling of weakly typed operands, and the per-dtype
//! value conversions (rounding, wrapping, byte encoding) that backends apply to results.

use half::{bf16, f16};
use serde::{Deserialize, Serialize};

/// Supported data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    BFloat16,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

/// Coarse category of a dtype, ordered the way promotion climbs the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DTypeKind {
    Bool,
    UnsignedInt,
    SignedInt,
    Float,
    Complex,
}

impl DTypeKind {
    /// Position in the promotion lattice. Signed and unsigned integers share a rank.
    pub fn rank(self) -> u8 {
        match self {
            DTypeKind::Bool => 0,
            DTypeKind::UnsignedInt | DTypeKind::SignedInt => 1,
            DTypeKind::Float => 2,
            DTypeKind::Complex => 3,
        }
    }
}

impl DType {
    /// Size in bytes
    pub fn size(&self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 | DType::Float16 | DType::BFloat16 => 2,
            DType::Float32 | DType::Int32 | DType::UInt32 => 4,
            DType::Float64 | DType::Int64 | DType::UInt64 | DType::Complex64 => 8,
            DType::Complex128 => 16,
        }
    }

    pub fn bits(&self) -> u32 {
        (self.size() * 8) as u32
    }

    /// String representation (NumPy compatible)
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float16 => "float16",
            DType::BFloat16 => "bfloat16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        }
    }

    pub fn kind(&self) -> DTypeKind {
        match self {
            DType::Bool => DTypeKind::Bool,
            DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64 => DTypeKind::SignedInt,
            DType::UInt8 | DType::UInt16 | DType::UInt32 | DType::UInt64 => DTypeKind::UnsignedInt,
            DType::Float16 | DType::BFloat16 | DType::Float32 | DType::Float64 => DTypeKind::Float,
            DType::Complex64 | DType::Complex128 => DTypeKind::Complex,
        }
    }

    pub fn is_bool(&self) -> bool {
        self.kind() == DTypeKind::Bool
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind(), DTypeKind::SignedInt | DTypeKind::UnsignedInt)
    }

    pub fn is_signed_integer(&self) -> bool {
        self.kind() == DTypeKind::SignedInt
    }

    pub fn is_unsigned_integer(&self) -> bool {
        self.kind() == DTypeKind::UnsignedInt
    }

    pub fn is_floating(&self) -> bool {
        self.kind() == DTypeKind::Float
    }

    pub fn is_complex(&self) -> bool {
        self.kind() == DTypeKind::Complex
    }

    /// Floating or complex
    pub fn is_inexact(&self) -> bool {
        self.is_floating() || self.is_complex()
    }

    /// Real dtype of each complex component; identity for everything else.
    pub fn component(&self) -> DType {
        match self {
            DType::Complex64 => DType::Float32,
            DType::Complex128 => DType::Float64,
            other => *other,
        }
    }

    /// Complex dtype whose components can hold this real dtype without loss.
    pub fn to_complex(&self) -> DType {
        match self {
            DType::Float64 | DType::Complex128 | DType::Int64 | DType::UInt64 => DType::Complex128,
            _ => DType::Complex64,
        }
    }

    /// Smallest and largest representable values of an integer dtype.
    pub fn int_range(&self) -> Option<(f64, f64)> {
        let range = match self {
            DType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            DType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            DType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            DType::Int64 => (i64::MIN as f64, i64::MAX as f64),
            DType::UInt8 => (0.0, u8::MAX as f64),
            DType::UInt16 => (0.0, u16::MAX as f64),
            DType::UInt32 => (0.0, u32::MAX as f64),
            DType::UInt64 => (0.0, u64::MAX as f64),
            _ => return None,
        };
        Some(range)
    }

    /// Maps 64-bit types to their 32-bit counterparts when x64 mode is off.
    pub fn canonicalize(self, enable_x64: bool) -> DType {
        if enable_x64 {
            return self;
        }
        match self {
            DType::Int64 => DType::Int32,
            DType::UInt64 => DType::UInt32,
            DType::Float64 => DType::Float32,
            DType::Complex128 => DType::Complex64,
            other => other,
        }
    }

    /// Dtype that values of `kind` materialize as when nothing more specific is known.
    pub fn default_for(kind: DTypeKind, enable_x64: bool) -> DType {
        let wide = match kind {
            DTypeKind::Bool => DType::Bool,
            DTypeKind::SignedInt => DType::Int64,
            DTypeKind::UnsignedInt => DType::UInt64,
            DTypeKind::Float => DType::Float64,
            DTypeKind::Complex => DType::Complex128,
        };
        wide.canonicalize(enable_x64)
    }

    /// Rounds or wraps `x`, already a value of this dtype's kind, into its representable set.
    pub fn normalize(&self, x: f64) -> f64 {
        match self.kind() {
            DTypeKind::Bool => {
                if x != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            DTypeKind::SignedInt | DTypeKind::UnsignedInt => {
                if x.is_finite() {
                    self.wrap(x.trunc())
                } else {
                    self.saturate(x)
                }
            }
            DTypeKind::Float | DTypeKind::Complex => self.round_float(x),
        }
    }

    /// Converts a value of dtype `from` into this dtype.
    ///
    /// Inexact to integer conversions truncate toward zero and saturate; integer to integer
    /// conversions wrap around.
    pub fn cast_from(&self, from: DType, x: f64) -> f64 {
        if self.is_integer() && from.is_inexact() {
            return self.saturate(x.trunc());
        }
        self.normalize(x)
    }

    fn saturate(&self, x: f64) -> f64 {
        match self.int_range() {
            Some(_) if x.is_nan() => 0.0,
            Some((lo, hi)) => x.clamp(lo, hi),
            None => x,
        }
    }

    fn wrap(&self, x: f64) -> f64 {
        let bits = self.bits();
        if bits == 64 {
            // i64::MAX and u64::MAX round up to a power of two in f64; pin the ends
            if let Some((lo, hi)) = self.int_range() {
                if x >= hi {
                    return hi;
                }
                if self.is_signed_integer() && x <= lo {
                    return lo;
                }
            }
        }
        let modulus = 1i128 << bits;
        let mut r = (x as i128).rem_euclid(modulus);
        if self.is_signed_integer() && r >= modulus / 2 {
            r -= modulus;
        }
        r as f64
    }

    fn round_float(&self, x: f64) -> f64 {
        match self.component() {
            DType::Float16 => f16::from_f64(x).to_f64(),
            DType::BFloat16 => bf16::from_f64(x).to_f64(),
            DType::Float32 => x as f32 as f64,
            _ => x,
        }
    }

    /// Appends the native-endian encoding of one element.
    pub fn encode(&self, re: f64, im: f64, out: &mut Vec<u8>) {
        match self {
            DType::Bool => out.push(u8::from(re != 0.0)),
            DType::Int8 => out.extend_from_slice(&(re as i8).to_ne_bytes()),
            DType::Int16 => out.extend_from_slice(&(re as i16).to_ne_bytes()),
            DType::Int32 => out.extend_from_slice(&(re as i32).to_ne_bytes()),
            DType::Int64 => out.extend_from_slice(&(re as i64).to_ne_bytes()),
            DType::UInt8 => out.push(re as u8),
            DType::UInt16 => out.extend_from_slice(&(re as u16).to_ne_bytes()),
            DType::UInt32 => out.extend_from_slice(&(re as u32).to_ne_bytes()),
            DType::UInt64 => out.extend_from_slice(&(re as u64).to_ne_bytes()),
            DType::Float16 => out.extend_from_slice(&f16::from_f64(re).to_ne_bytes()),
            DType::BFloat16 => out.extend_from_slice(&bf16::from_f64(re).to_ne_bytes()),
            DType::Float32 => out.extend_from_slice(&(re as f32).to_ne_bytes()),
            DType::Float64 => out.extend_from_slice(&re.to_ne_bytes()),
            DType::Complex64 => {
                out.extend_from_slice(&(re as f32).to_ne_bytes());
                out.extend_from_slice(&(im as f32).to_ne_bytes());
            }
            DType::Complex128 => {
                out.extend_from_slice(&re.to_ne_bytes());
                out.extend_from_slice(&im.to_ne_bytes());
            }
        }
    }

    /// Decodes one native-endian element; `bytes` must hold exactly `self.size()` bytes.
    pub fn decode(&self, bytes: &[u8]) -> (f64, f64) {
        fn arr<const N: usize>(bytes: &[u8]) -> [u8; N] {
            let mut buf = [0u8; N];
            buf.copy_from_slice(&bytes[..N]);
            buf
        }
        match self {
            DType::Bool => (f64::from(u8::from(bytes[0] != 0)), 0.0),
            DType::Int8 => (i8::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::Int16 => (i16::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::Int32 => (i32::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::Int64 => (i64::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::UInt8 => (bytes[0] as f64, 0.0),
            DType::UInt16 => (u16::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::UInt32 => (u32::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::UInt64 => (u64::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::Float16 => (f16::from_ne_bytes(arr(bytes)).to_f64(), 0.0),
            DType::BFloat16 => (bf16::from_ne_bytes(arr(bytes)).to_f64(), 0.0),
            DType::Float32 => (f32::from_ne_bytes(arr(bytes)) as f64, 0.0),
            DType::Float64 => (f64::from_ne_bytes(arr(bytes)), 0.0),
            DType::Complex64 => (
                f32::from_ne_bytes(arr(&bytes[..4])) as f64,
                f32::from_ne_bytes(arr(&bytes[4..8])) as f64,
            ),
            DType::Complex128 => (
                f64::from_ne_bytes(arr(&bytes[..8])),
                f64::from_ne_bytes(arr(&bytes[8..16])),
            ),
        }
    }

    /// Python struct format character used by the buffer protocol.
    pub fn buffer_format(&self) -> Option<&'static str> {
        let format = match self {
            DType::Bool => "?",
            DType::Int8 => "b",
            DType::Int16 => "h",
            DType::Int32 => "i",
            DType::Int64 => "q",
            DType::UInt8 => "B",
            DType::UInt16 => "H",
            DType::UInt32 => "I",
            DType::UInt64 => "Q",
            DType::Float16 => "e",
            DType::Float32 => "f",
            DType::Float64 => "d",
            DType::Complex64 => "Zf",
            DType::Complex128 => "Zd",
            DType::BFloat16 => return None,
        };
        Some(format)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for DType {
    fn default() -> Self {
        DType::Float32
    }
}

/// Promotes two strongly typed dtypes.
pub fn promote_types(a: DType, b: DType) -> DType {
    use DTypeKind::*;

    if a == b {
        return a;
    }
    let (ka, kb) = (a.kind(), b.kind());
    if ka == Bool {
        return b;
    }
    if kb == Bool {
        return a;
    }
    match (ka, kb) {
        (SignedInt, SignedInt) | (UnsignedInt, UnsignedInt) => wider(a, b),
        (SignedInt, UnsignedInt) => mixed_int(a, b),
        (UnsignedInt, SignedInt) => mixed_int(b, a),
        (SignedInt | UnsignedInt, Float | Complex) => b,
        (Float | Complex, SignedInt | UnsignedInt) => a,
        (Float, Float) => {
            if a.size() == b.size() {
                // float16 and bfloat16 meet at float32
                DType::Float32
            } else {
                wider(a, b)
            }
        }
        (Complex, Complex) => wider(a, b),
        (Float, Complex) => wider(a.to_complex(), b),
        (Complex, Float) => wider(a, b.to_complex()),
        _ => unreachable!("bool handled above"),
    }
}

/// Promotes two operands, each tagged with its weak-type flag.
///
/// A weak operand adopts the other side's dtype when that side is at least as high in the
/// lattice. When the weak operand is of a higher kind, the result is the default dtype of
/// that kind (width-matched for float to complex) and stays weak.
///
/// The result is canonicalized, so mixed signed and unsigned 32-bit operands land on int32
/// rather than int64 when x64 mode is off.
pub fn result_type(a: (DType, bool), b: (DType, bool), enable_x64: bool) -> (DType, bool) {
    let ((da, wa), (db, wb)) = (a, b);
    let (dtype, weak) = match (wa, wb) {
        (false, false) => (promote_types(da, db), false),
        (true, true) => {
            let kind = if da.kind().rank() >= db.kind().rank() {
                da.kind()
            } else {
                db.kind()
            };
            (DType::default_for(kind, enable_x64), true)
        }
        (true, false) => weak_against_strong(da, db, enable_x64),
        (false, true) => weak_against_strong(db, da, enable_x64),
    };
    (dtype.canonicalize(enable_x64), weak)
}

fn weak_against_strong(weak: DType, strong: DType, enable_x64: bool) -> (DType, bool) {
    if weak.kind().rank() <= strong.kind().rank() {
        return (strong, false);
    }
    if weak.is_complex() && strong.is_floating() {
        return (strong.to_complex().canonicalize(enable_x64), true);
    }
    (DType::default_for(weak.kind(), enable_x64), true)
}

fn wider(a: DType, b: DType) -> DType {
    if a.size() >= b.size() {
        a
    } else {
        b
    }
}

fn mixed_int(signed: DType, unsigned: DType) -> DType {
    if signed.size() > unsigned.size() {
        return signed;
    }
    match unsigned {
        DType::UInt8 => DType::Int16,
        DType::UInt16 => DType::Int32,
        DType::UInt32 => DType::Int64,
        _ => DType::Float64,
    }
}

//! Fixed-width primitives and byte order.
//!
//! Chunks, inputs and outputs all move primitives through [`Primitive`], so
//! the swap logic lives here once instead of at every call site.

/// Byte order used to encode a multi-byte primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Network order, most significant byte first.
    #[default]
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// Byte order of the target platform.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// Returns the opposite byte order.
    pub const fn reversed(self) -> Self {
        match self {
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
        }
    }
}

/// Largest primitive width, in bytes.
pub(crate) const MAX_PRIMITIVE_SIZE: usize = 8;

/// A fixed-width value that can be stored in and loaded from a chunk.
pub trait Primitive: Copy + Sized {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decodes a value from the first `SIZE` bytes of `bytes`.
    ///
    /// Callers guarantee `bytes.len() >= SIZE`.
    fn decode(bytes: &[u8], order: ByteOrder) -> Self;

    /// Encodes the value into the first `SIZE` bytes of `out`.
    ///
    /// Callers guarantee `out.len() >= SIZE`.
    fn encode(self, out: &mut [u8], order: ByteOrder);
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn decode(bytes: &[u8], order: ByteOrder) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    match order {
                        ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
                        ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
                    }
                }

                #[inline]
                fn encode(self, out: &mut [u8], order: ByteOrder) {
                    let raw = match order {
                        ByteOrder::BigEndian => self.to_be_bytes(),
                        ByteOrder::LittleEndian => self.to_le_bytes(),
                    };
                    out[..Self::SIZE].copy_from_slice(&raw);
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

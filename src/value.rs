//! Typed values spanning one or more 16-bit registers
//!
//! Word devices hold 16-bit registers; wider values occupy consecutive
//! registers in little-endian byte order. [`WordElement`] is the conversion
//! seam the typed client read/write operations are generic over.

use crate::error::{McError, McResult};

/// A value type stored in one or more consecutive 16-bit registers.
///
/// Implementations define their fixed on-wire byte width and little-endian
/// conversion. `BYTE_LEN` is always a multiple of 2.
pub trait WordElement: Sized + Copy {
    /// On-wire byte width (a multiple of 2)
    const BYTE_LEN: usize;

    /// Number of 16-bit registers the value occupies.
    #[inline]
    fn register_count() -> u16 {
        (Self::BYTE_LEN / 2) as u16
    }

    /// Append the little-endian byte representation to `buf`.
    fn write_le(&self, buf: &mut Vec<u8>);

    /// Read a value from the first `BYTE_LEN` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> McResult<Self>;
}

macro_rules! impl_word_element {
    ($($ty:ty => $len:expr),+ $(,)?) => {
        $(
            impl WordElement for $ty {
                const BYTE_LEN: usize = $len;

                #[inline]
                fn write_le(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> McResult<Self> {
                    let chunk: [u8; $len] = bytes
                        .get(..$len)
                        .and_then(|s| s.try_into().ok())
                        .ok_or_else(|| {
                            McError::read(format!(
                                "Need {} bytes for {}, got {}",
                                $len,
                                stringify!($ty),
                                bytes.len()
                            ))
                        })?;
                    Ok(<$ty>::from_le_bytes(chunk))
                }
            }
        )+
    };
}

impl_word_element! {
    i16 => 2,
    u16 => 2,
    i32 => 4,
    u32 => 4,
    f32 => 4,
    f64 => 8,
}

/// Decode a packed slice of `T` values from a register payload.
pub fn decode_elements<T: WordElement>(bytes: &[u8], count: usize) -> McResult<Vec<T>> {
    let needed = count * T::BYTE_LEN;
    if bytes.len() < needed {
        return Err(McError::read(format!(
            "Payload is {} bytes but {} elements need {}",
            bytes.len(),
            count,
            needed
        )));
    }
    bytes[..needed]
        .chunks_exact(T::BYTE_LEN)
        .map(T::read_le)
        .collect()
}

/// Encode a slice of `T` values into a packed register payload.
pub fn encode_elements<T: WordElement>(values: &[T]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * T::BYTE_LEN);
    for v in values {
        v.write_le(&mut buf);
    }
    buf
}

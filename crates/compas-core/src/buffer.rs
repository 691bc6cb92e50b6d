//! Sample buffer codec: format conversion and mixing between PCM layouts.
//!
//! Conversions are *additive*: the scaled source is summed onto whatever the
//! destination already holds, so the same routines serve both plain copies
//! (into a cleared buffer) and mix-down paths. The scale factor between two
//! integer layouts is `(2^(db-1) - 1) / (2^(sb-1) - 1)`, recomputed on every
//! call from the bit widths rather than cached per pair.
//!
//! Out-of-range sums saturate to the destination's numeric range (the
//! behavior of Rust's float-to-int cast). Byte order is resolved against the
//! host and swapped only when it differs.

/// A complex sample: paired real and imaginary doubles.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    /// Real component.
    pub real: f64,
    /// Imaginary component.
    pub imag: f64,
}

/// Sample storage formats understood by the codec.
///
/// `S24` occupies an `i32` with 24 significant bits. `DoubleComplex` is a
/// pair of `f64` (real, imaginary) used for intermediate spectral-style
/// processing; cross-format conversions use its real component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 8-bit integer.
    S8,
    /// Signed 16-bit integer.
    S16,
    /// Signed 24-bit integer stored in an `i32`.
    S24,
    /// Signed 32-bit integer.
    S32,
    /// Signed 64-bit integer.
    S64,
    /// IEEE 754 single precision float.
    F32,
    /// IEEE 754 double precision float.
    F64,
    /// Paired real/imaginary doubles.
    DoubleComplex,
}

impl SampleFormat {
    /// Significant bits per sample.
    pub fn bits(self) -> u32 {
        match self {
            SampleFormat::S8 => 8,
            SampleFormat::S16 => 16,
            SampleFormat::S24 => 24,
            SampleFormat::S32 => 32,
            SampleFormat::S64 | SampleFormat::F64 | SampleFormat::DoubleComplex => 64,
            SampleFormat::F32 => 32,
        }
    }

    /// Whether samples are floating point (or complex).
    pub fn is_float(self) -> bool {
        matches!(
            self,
            SampleFormat::F32 | SampleFormat::F64 | SampleFormat::DoubleComplex
        )
    }
}

/// Byte order of sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first.
    LittleEndian,
    /// Most significant byte first.
    BigEndian,
}

impl ByteOrder {
    /// The byte order of the machine this code runs on.
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// True when sample data in `self` order needs a swap on this host.
    pub fn needs_swap(self) -> bool {
        self != Self::host()
    }
}

/// A `(source, destination)` format pair selecting a conversion routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyMode {
    /// Format of the source buffer.
    pub source: SampleFormat,
    /// Format of the destination buffer.
    pub destination: SampleFormat,
}

impl CopyMode {
    /// Selects the conversion for a source/destination format pair.
    ///
    /// Every pair is valid; the constructor exists so callers resolve the
    /// pair once per stream rather than per period.
    pub fn new(source: SampleFormat, destination: SampleFormat) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// A sample type the codec can read from and write into.
///
/// `to_mix` yields the raw numeric value (integers unscaled, floats as-is,
/// complex contributing its real part); `from_mix` converts back with
/// saturation for the integer types.
pub trait PcmSample: Copy {
    /// The format tag for this representation.
    const FORMAT: SampleFormat;

    /// Raw numeric value for mixing.
    fn to_mix(self) -> f64;

    /// Back-conversion from the mix accumulator, saturating for integers.
    fn from_mix(value: f64) -> Self;

    /// The silence value (zero).
    fn silence() -> Self;

    /// Byte-order swapped representation.
    fn swapped(self) -> Self;
}

macro_rules! impl_pcm_int {
    ($ty:ty, $fmt:expr) => {
        impl PcmSample for $ty {
            const FORMAT: SampleFormat = $fmt;

            #[inline]
            fn to_mix(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_mix(value: f64) -> Self {
                value as $ty
            }

            #[inline]
            fn silence() -> Self {
                0
            }

            #[inline]
            fn swapped(self) -> Self {
                self.swap_bytes()
            }
        }
    };
}

impl_pcm_int!(i8, SampleFormat::S8);
impl_pcm_int!(i16, SampleFormat::S16);
impl_pcm_int!(i32, SampleFormat::S32);
impl_pcm_int!(i64, SampleFormat::S64);

impl PcmSample for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32;

    #[inline]
    fn to_mix(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn from_mix(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn silence() -> Self {
        0.0
    }

    #[inline]
    fn swapped(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
}

impl PcmSample for f64 {
    const FORMAT: SampleFormat = SampleFormat::F64;

    #[inline]
    fn to_mix(self) -> f64 {
        self
    }

    #[inline]
    fn from_mix(value: f64) -> Self {
        value
    }

    #[inline]
    fn silence() -> Self {
        0.0
    }

    #[inline]
    fn swapped(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

impl PcmSample for Complex {
    const FORMAT: SampleFormat = SampleFormat::DoubleComplex;

    #[inline]
    fn to_mix(self) -> f64 {
        self.real
    }

    #[inline]
    fn from_mix(value: f64) -> Self {
        Complex {
            real: value,
            imag: 0.0,
        }
    }

    #[inline]
    fn silence() -> Self {
        Complex {
            real: 0.0,
            imag: 0.0,
        }
    }

    #[inline]
    fn swapped(self) -> Self {
        Complex {
            real: self.real.swapped(),
            imag: self.imag.swapped(),
        }
    }
}

/// S24 samples live in an `i32` but saturate at 24 bits, so they get a
/// newtype rather than reusing the `i32` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct S24(pub i32);

/// Largest positive 24-bit sample value.
pub const S24_MAX: i32 = 0x7f_ffff;
/// Smallest negative 24-bit sample value.
pub const S24_MIN: i32 = -0x80_0000;

impl PcmSample for S24 {
    const FORMAT: SampleFormat = SampleFormat::S24;

    #[inline]
    fn to_mix(self) -> f64 {
        f64::from(self.0)
    }

    #[inline]
    fn from_mix(value: f64) -> Self {
        S24((value as i64).clamp(i64::from(S24_MIN), i64::from(S24_MAX)) as i32)
    }

    #[inline]
    fn silence() -> Self {
        S24(0)
    }

    #[inline]
    fn swapped(self) -> Self {
        S24(self.0.swap_bytes())
    }
}

/// Scale factor applied to source samples when mixing into `dest`.
///
/// Integer to integer pairs use the max-value ratio; integer to float
/// normalizes by `2^(sb-1)`; float to integer expands by the destination
/// max. Float to float (and complex) pass through unscaled.
pub fn scale_factor(source: SampleFormat, destination: SampleFormat) -> f64 {
    match (source.is_float(), destination.is_float()) {
        (false, false) => int_max(destination.bits()) / int_max(source.bits()),
        (false, true) => 1.0 / exp2_f64(source.bits() - 1),
        (true, false) => int_max(destination.bits()),
        (true, true) => 1.0,
    }
}

#[inline]
fn int_max(bits: u32) -> f64 {
    ((1u128 << (bits - 1)) - 1) as f64
}

#[inline]
fn exp2_f64(exp: u32) -> f64 {
    (1u128 << exp) as f64
}

/// Mixes `count` samples of `src` onto `dest`, scaling between formats.
///
/// `dest[i] += scale * src[i]`, with saturation on integer destinations.
/// Strides are in elements; only `count` strided elements are touched.
///
/// # Example
/// ```
/// use compas_core::buffer::copy;
///
/// let src: [i16; 4] = [i16::MAX, 0, i16::MIN, 1];
/// let mut dest = [0.0f64; 4];
/// copy(&mut dest, 1, &src, 1, 4);
/// assert!((dest[0] - 32767.0 / 32768.0).abs() < 1e-9);
/// ```
pub fn copy<D: PcmSample, S: PcmSample>(
    dest: &mut [D],
    dest_stride: usize,
    src: &[S],
    src_stride: usize,
    count: usize,
) {
    if count == 0 {
        return;
    }

    let scale = scale_factor(S::FORMAT, D::FORMAT);

    for i in 0..count {
        let d = i * dest_stride;
        let s = i * src_stride;
        dest[d] = D::from_mix(dest[d].to_mix() + scale * src[s].to_mix());
    }
}

/// Componentwise additive copy for complex buffers.
///
/// The generic [`copy`] would drop the imaginary part; complex to complex
/// keeps both components.
pub fn copy_complex(
    dest: &mut [Complex],
    dest_stride: usize,
    src: &[Complex],
    src_stride: usize,
    count: usize,
) {
    for i in 0..count {
        let d = i * dest_stride;
        let s = i * src_stride;
        dest[d] = Complex {
            real: dest[d].real + src[s].real,
            imag: dest[d].imag + src[s].imag,
        };
    }
}

/// Writes silence over `count` strided samples.
pub fn clear<S: PcmSample>(buffer: &mut [S], stride: usize, count: usize) {
    for i in 0..count {
        buffer[i * stride] = S::silence();
    }
}

/// Swaps the byte order of every sample in place when `order` differs from
/// the host. No-op otherwise.
pub fn correct_byte_order<S: PcmSample>(buffer: &mut [S], order: ByteOrder) {
    if !order.needs_swap() {
        return;
    }

    for sample in buffer.iter_mut() {
        *sample = sample.swapped();
    }
}

/// Borrowed sample data of any supported format.
#[derive(Debug)]
pub enum SampleSlice<'a> {
    /// Signed 8-bit samples.
    S8(&'a [i8]),
    /// Signed 16-bit samples.
    S16(&'a [i16]),
    /// Signed 24-bit samples.
    S24(&'a [S24]),
    /// Signed 32-bit samples.
    S32(&'a [i32]),
    /// Signed 64-bit samples.
    S64(&'a [i64]),
    /// Single precision float samples.
    F32(&'a [f32]),
    /// Double precision float samples.
    F64(&'a [f64]),
    /// Complex samples.
    DoubleComplex(&'a [Complex]),
}

impl SampleSlice<'_> {
    /// The format of the borrowed data.
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleSlice::S8(_) => SampleFormat::S8,
            SampleSlice::S16(_) => SampleFormat::S16,
            SampleSlice::S24(_) => SampleFormat::S24,
            SampleSlice::S32(_) => SampleFormat::S32,
            SampleSlice::S64(_) => SampleFormat::S64,
            SampleSlice::F32(_) => SampleFormat::F32,
            SampleSlice::F64(_) => SampleFormat::F64,
            SampleSlice::DoubleComplex(_) => SampleFormat::DoubleComplex,
        }
    }
}

/// Mutably borrowed sample data of any supported format.
#[derive(Debug)]
pub enum SampleSliceMut<'a> {
    /// Signed 8-bit samples.
    S8(&'a mut [i8]),
    /// Signed 16-bit samples.
    S16(&'a mut [i16]),
    /// Signed 24-bit samples.
    S24(&'a mut [S24]),
    /// Signed 32-bit samples.
    S32(&'a mut [i32]),
    /// Signed 64-bit samples.
    S64(&'a mut [i64]),
    /// Single precision float samples.
    F32(&'a mut [f32]),
    /// Double precision float samples.
    F64(&'a mut [f64]),
    /// Complex samples.
    DoubleComplex(&'a mut [Complex]),
}

impl SampleSliceMut<'_> {
    /// The format of the borrowed data.
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleSliceMut::S8(_) => SampleFormat::S8,
            SampleSliceMut::S16(_) => SampleFormat::S16,
            SampleSliceMut::S24(_) => SampleFormat::S24,
            SampleSliceMut::S32(_) => SampleFormat::S32,
            SampleSliceMut::S64(_) => SampleFormat::S64,
            SampleSliceMut::F32(_) => SampleFormat::F32,
            SampleSliceMut::F64(_) => SampleFormat::F64,
            SampleSliceMut::DoubleComplex(_) => SampleFormat::DoubleComplex,
        }
    }

    /// Writes silence over `count` strided samples.
    pub fn clear(&mut self, stride: usize, count: usize) {
        match self {
            SampleSliceMut::S8(b) => clear(b, stride, count),
            SampleSliceMut::S16(b) => clear(b, stride, count),
            SampleSliceMut::S24(b) => clear(b, stride, count),
            SampleSliceMut::S32(b) => clear(b, stride, count),
            SampleSliceMut::S64(b) => clear(b, stride, count),
            SampleSliceMut::F32(b) => clear(b, stride, count),
            SampleSliceMut::F64(b) => clear(b, stride, count),
            SampleSliceMut::DoubleComplex(b) => clear(b, stride, count),
        }
    }
}

fn copy_any_into<D: PcmSample>(
    dest: &mut [D],
    dest_stride: usize,
    src: &SampleSlice<'_>,
    src_stride: usize,
    count: usize,
) {
    match src {
        SampleSlice::S8(s) => copy(dest, dest_stride, s, src_stride, count),
        SampleSlice::S16(s) => copy(dest, dest_stride, s, src_stride, count),
        SampleSlice::S24(s) => copy(dest, dest_stride, s, src_stride, count),
        SampleSlice::S32(s) => copy(dest, dest_stride, s, src_stride, count),
        SampleSlice::S64(s) => copy(dest, dest_stride, s, src_stride, count),
        SampleSlice::F32(s) => copy(dest, dest_stride, s, src_stride, count),
        SampleSlice::F64(s) => copy(dest, dest_stride, s, src_stride, count),
        SampleSlice::DoubleComplex(s) => copy(dest, dest_stride, s, src_stride, count),
    }
}

/// Format-dispatching additive copy.
///
/// The runtime counterpart of [`copy`] for paths where formats are only
/// known at stream setup (soundcard edges, recording). Complex to complex
/// routes through [`copy_complex`] to keep both components.
pub fn copy_buffer_to_buffer(
    dest: &mut SampleSliceMut<'_>,
    dest_stride: usize,
    src: &SampleSlice<'_>,
    src_stride: usize,
    count: usize,
) {
    match dest {
        SampleSliceMut::S8(d) => copy_any_into(d, dest_stride, src, src_stride, count),
        SampleSliceMut::S16(d) => copy_any_into(d, dest_stride, src, src_stride, count),
        SampleSliceMut::S24(d) => copy_any_into(d, dest_stride, src, src_stride, count),
        SampleSliceMut::S32(d) => copy_any_into(d, dest_stride, src, src_stride, count),
        SampleSliceMut::S64(d) => copy_any_into(d, dest_stride, src, src_stride, count),
        SampleSliceMut::F32(d) => copy_any_into(d, dest_stride, src, src_stride, count),
        SampleSliceMut::F64(d) => copy_any_into(d, dest_stride, src, src_stride, count),
        SampleSliceMut::DoubleComplex(d) => {
            if let SampleSlice::DoubleComplex(s) = src {
                copy_complex(d, dest_stride, s, src_stride, count);
            } else {
                copy_any_into(d, dest_stride, src, src_stride, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s16_to_s24_scale_matches_max_ratio() {
        let scale = scale_factor(SampleFormat::S16, SampleFormat::S24);
        assert!((scale - 8_388_607.0 / 32_767.0).abs() < 1e-12);
        assert!((scale - 256.00778).abs() < 1e-4);
    }

    #[test]
    fn int_to_float_normalizes_by_power_of_two() {
        // 2^(sb-1), not the max value: full-scale negative maps to -1.0 exactly.
        let scale = scale_factor(SampleFormat::S16, SampleFormat::F64);
        assert_eq!(scale, 1.0 / 32_768.0);

        let src = [i16::MIN];
        let mut dest = [0.0f64];
        copy(&mut dest, 1, &src, 1, 1);
        assert_eq!(dest[0], -1.0);
    }

    #[test]
    fn copy_is_additive() {
        let src = [100i16, -50, 25];
        let mut dest = [1000i16, 1000, 1000];
        copy(&mut dest, 1, &src, 1, 3);
        assert_eq!(dest, [1100, 950, 1025]);
    }

    #[test]
    fn copy_saturates_at_destination_range() {
        let src = [i16::MAX, i16::MIN];
        let mut dest = [i16::MAX, i16::MIN];
        copy(&mut dest, 1, &src, 1, 2);
        assert_eq!(dest, [i16::MAX, i16::MIN]);
    }

    #[test]
    fn s24_saturates_at_24_bits() {
        let src = [1.0f64, -1.5];
        let mut dest = [S24(S24_MAX), S24(S24_MIN)];
        copy(&mut dest, 1, &src, 1, 2);
        assert_eq!(dest[0], S24(S24_MAX));
        assert_eq!(dest[1], S24(S24_MIN));
    }

    #[test]
    fn round_trip_s16_within_one() {
        for &sample in &[0i16, 1, -1, 1234, -1234, i16::MAX, i16::MIN] {
            let mut float = [0.0f32];
            copy(&mut float, 1, &[sample], 1, 1);

            let mut back = [0i16];
            copy(&mut back, 1, &float, 1, 1);

            assert!(
                (i32::from(back[0]) - i32::from(sample)).abs() <= 1,
                "{} round-tripped to {}",
                sample,
                back[0]
            );
        }
    }

    #[test]
    fn strided_copy_skips_other_channels() {
        // Interleaved stereo: write only the left channel.
        let src = [10i16, 20];
        let mut dest = [0i16; 4];
        copy(&mut dest, 2, &src, 1, 2);
        assert_eq!(dest, [10, 0, 20, 0]);
    }

    #[test]
    fn zero_count_touches_nothing() {
        let src: [i16; 0] = [];
        let mut dest = [42i16; 2];
        copy(&mut dest, 1, &src, 1, 0);
        assert_eq!(dest, [42, 42]);
    }

    #[test]
    fn clear_writes_silence() {
        let mut buffer = [1.0f64, 2.0, 3.0, 4.0];
        clear(&mut buffer, 2, 2);
        assert_eq!(buffer, [0.0, 2.0, 0.0, 4.0]);
    }

    #[test]
    fn complex_to_complex_keeps_imaginary() {
        let src = [Complex {
            real: 1.0,
            imag: 2.0,
        }];
        let mut dest_slice = [Complex {
            real: 0.5,
            imag: 0.5,
        }];
        let src_slice = SampleSlice::DoubleComplex(&src);
        let mut dest = SampleSliceMut::DoubleComplex(&mut dest_slice);
        copy_buffer_to_buffer(&mut dest, 1, &src_slice, 1, 1);
        assert_eq!(dest_slice[0].real, 1.5);
        assert_eq!(dest_slice[0].imag, 2.5);
    }

    #[test]
    fn dynamic_dispatch_matches_generic() {
        let src = [1000i16, -2000];
        let mut via_generic = [0.0f64; 2];
        copy(&mut via_generic, 1, &src, 1, 2);

        let mut via_dynamic_data = [0.0f64; 2];
        let mut dest = SampleSliceMut::F64(&mut via_dynamic_data);
        copy_buffer_to_buffer(&mut dest, 1, &SampleSlice::S16(&src), 1, 2);

        assert_eq!(via_generic, via_dynamic_data);
    }

    #[test]
    fn byte_order_swap_only_when_foreign() {
        let mut native = [0x1234i16];
        correct_byte_order(&mut native, ByteOrder::host());
        assert_eq!(native, [0x1234]);

        let foreign = match ByteOrder::host() {
            ByteOrder::LittleEndian => ByteOrder::BigEndian,
            ByteOrder::BigEndian => ByteOrder::LittleEndian,
        };
        let mut swapped = [0x1234i16];
        correct_byte_order(&mut swapped, foreign);
        assert_eq!(swapped, [0x3412]);
    }
}

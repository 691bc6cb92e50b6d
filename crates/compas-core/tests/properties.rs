//! Property-based tests for compas-core codec and DSP operators.
//!
//! Tests codec round-trip error bounds, pitch-shifter and oscillator
//! determinism across buffer splits, gain composition, and filter stability
//! using proptest for randomized input generation.

use compas_core::buffer::{S24_MAX, S24_MIN};
use compas_core::{
    FilterType, IirFilter, Interpolation, PitchShifter, S24, Synth, Volume, Waveform, copy,
};
use proptest::prelude::*;

/// Interpolation modes indexed 0..4 (None, Linear, 4th, 7th).
fn interpolation_for(variant: usize) -> Interpolation {
    match variant % 4 {
        0 => Interpolation::None,
        1 => Interpolation::Linear,
        2 => Interpolation::FourthOrder,
        _ => Interpolation::SeventhOrder,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// f64 -> i16 -> f64 round trip stays within two quantization steps.
    /// One step comes from the truncating cast, the other from the
    /// 32767-up / 32768-down scale asymmetry that maps full-scale negative
    /// to exactly -1.0.
    #[test]
    fn s16_round_trip_error_is_bounded(sample in -1.0f64..=1.0f64) {
        let source = [sample];
        let mut quantized = [0i16];
        copy(&mut quantized, 1, &source, 1, 1);

        let mut restored = [0.0f64];
        copy(&mut restored, 1, &quantized, 1, 1);

        let error = (restored[0] - sample).abs();
        let bound = 2.0 / 32768.0 + 1e-9;
        prop_assert!(
            error <= bound,
            "s16 round trip error {} exceeds {} for input {} (quantized {})",
            error, bound, sample, quantized[0]
        );
    }

    /// i16 -> f64 -> i16 reproduces the sample within one step.
    #[test]
    fn s16_through_float_round_trip_within_one_step(sample in i16::MIN..=i16::MAX) {
        let source = [sample];
        let mut through = [0.0f64];
        copy(&mut through, 1, &source, 1, 1);

        let mut restored = [0i16];
        copy(&mut restored, 1, &through, 1, 1);

        let error = (i32::from(restored[0]) - i32::from(sample)).abs();
        prop_assert!(
            error <= 1,
            "i16 -> f64 -> i16 drifted by {} steps: {} became {} ({})",
            error, sample, restored[0], through[0]
        );
    }

    /// Same bound for 24-bit samples.
    #[test]
    fn s24_through_float_round_trip_within_one_step(raw in S24_MIN..=S24_MAX) {
        let source = [S24(raw)];
        let mut through = [0.0f64];
        copy(&mut through, 1, &source, 1, 1);

        let mut restored = [S24(0)];
        copy(&mut restored, 1, &through, 1, 1);

        let error = (restored[0].0 - raw).abs();
        prop_assert!(
            error <= 1,
            "s24 -> f64 -> s24 drifted by {} steps: {} became {}",
            error, raw, restored[0].0
        );
    }

    /// Widening to i32 and narrowing back reproduces the i16 sample within
    /// one step in either direction.
    #[test]
    fn integer_width_round_trip_within_one_step(sample in i16::MIN..=i16::MAX) {
        let source = [sample];
        let mut wide = [0i32];
        copy(&mut wide, 1, &source, 1, 1);

        let mut narrow = [0i16];
        copy(&mut narrow, 1, &wide, 1, 1);

        let error = (i32::from(narrow[0]) - i32::from(sample)).abs();
        prop_assert!(
            error <= 1,
            "i16 -> i32 -> i16 drifted by {} steps: {} became {} (wide {})",
            error, sample, narrow[0], wide[0]
        );
    }

    /// Splitting one pitch-shift call into two over the same source, without
    /// resetting the phase accumulator, is bit-identical to the single call.
    #[test]
    fn pitch_split_buffers_are_bit_identical(
        tuning in -1200.0f64..=1200.0f64,
        split in 1usize..128,
        variant in 0usize..4,
        source in prop::collection::vec(-1.0f64..=1.0f64, 256),
    ) {
        let mut whole = PitchShifter::new(44100);
        whole.set_interpolation(interpolation_for(variant));
        whole.set_base_key(48.0);
        whole.set_tuning(tuning);

        let mut halves = whole.clone();

        let mut full = vec![0.0f64; 128];
        whole.compute_into(&mut full, &source);

        let mut parts = vec![0.0f64; 128];
        let (head, tail) = parts.split_at_mut(split);
        halves.compute_into(head, &source);
        halves.compute_into(tail, &source);

        for (i, (a, b)) in full.iter().zip(parts.iter()).enumerate() {
            prop_assert!(
                a.to_bits() == b.to_bits(),
                "split at {} diverged at frame {}: {} vs {} (tuning {}, variant {})",
                split, i, a, b, tuning, variant
            );
        }
    }

    /// Oscillator output is a pure function of the global frame offset:
    /// rendering one block equals rendering two adjacent sub-blocks.
    #[test]
    fn oscillator_split_buffers_are_bit_identical(
        frequency in 20.0f64..2000.0f64,
        offset in 0u64..1_000_000,
        split in 1usize..128,
        variant in 0usize..5,
    ) {
        let mut synth = Synth::new(44100);
        synth.set_waveform(Waveform::ALL[variant]);
        synth.set_frequency(frequency);
        synth.set_volume(0.5);

        synth.set_offset(offset);
        let mut full = vec![0.0f64; 128];
        synth.compute(&mut full);

        let mut parts = vec![0.0f64; 128];
        synth.set_offset(offset);
        synth.compute(&mut parts[..split]);
        synth.set_offset(offset + split as u64);
        synth.compute(&mut parts[split..]);

        for (i, (a, b)) in full.iter().zip(parts.iter()).enumerate() {
            prop_assert!(
                a.to_bits() == b.to_bits(),
                "{:?} at offset {} diverged at frame {}: {} vs {}",
                Waveform::ALL[variant], offset, i, a, b
            );
        }
    }

    /// Applying gain g1 then g2 matches a single gain of g1*g2 up to
    /// rounding (two multiplies vs one reassociated multiply).
    #[test]
    fn volume_gains_compose(
        g1 in 0.0f64..4.0,
        g2 in 0.0f64..4.0,
        source in prop::collection::vec(-1.0f64..=1.0f64, 1..=64),
    ) {
        let mut staged = source.clone();
        let mut volume = Volume::new();
        volume.set_volume(g1);
        volume.compute_in_place(&mut staged);
        volume.set_volume(g2);
        volume.compute_in_place(&mut staged);

        let mut combined = vec![0.0f64; source.len()];
        volume.set_volume(g1 * g2);
        volume.compute(&mut combined, &source);

        for (i, (a, b)) in staged.iter().zip(combined.iter()).enumerate() {
            prop_assert!(
                (a - b).abs() <= 1e-12,
                "gain composition diverged at sample {}: {} vs {} (g1={}, g2={})",
                i, a, b, g1, g2
            );
        }
    }

    /// For any cutoff in the working cents range and any reasonable Q, the
    /// filter produces finite output for random finite input.
    #[test]
    fn iir_filter_stability(
        fres in 1500.0f64..13500.0,
        q_lin in 0.1f64..10.0,
        highpass in proptest::bool::ANY,
        input in prop::collection::vec(-1.0f64..=1.0f64, 256),
    ) {
        let mut filter = IirFilter::new(44100);
        filter.set_filter_type(if highpass {
            FilterType::Highpass
        } else {
            FilterType::Lowpass
        });
        filter.set_fres(fres);
        filter.set_q_lin(q_lin);

        let mut buffer = input.clone();
        filter.compute(&mut buffer);

        for (i, sample) in buffer.iter().enumerate() {
            prop_assert!(
                sample.is_finite(),
                "filter (fres={}, q={}, highpass={}) produced {} at sample {}",
                fres, q_lin, highpass, sample, i
            );
        }
    }
}

pub mod buffer;
pub mod cdf;
pub mod config;
pub mod cost;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod overhead;
pub mod workload;

pub use cdf::{icdf_from_frequencies, validate_icdf};
pub use config::EncoderConfig;
pub use decoder::RangeDecoder;
pub use encoder::RangeEncoder;
pub use error::{EcError, EcResult};
pub use overhead::OverheadReport;

pub const VERSION: &str = "0.1.0";

/// Probabilities are stored with this many low bits dropped before scaling.
pub const EC_PROB_SHIFT: u32 = 6;
/// Minimum share of the range kept by every symbol.
pub const EC_MIN_PROB: u32 = 4;
/// Probabilities are 15-bit fixed point.
pub const CDF_PROB_TOP: u32 = 32768;
pub const CDF_MAX_SYMBOLS: usize = 16;
/// `tell_frac` resolution: 1/8 bit.
pub const OD_BITRES: u32 = 3;
pub const MAX_RAW_BITS: u32 = 25;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rayon::prelude::*;

    #[test]
    fn test_random_streams_roundtrip() {
        for seed in 0..6 {
            let ops = workload::generate(seed, 10_000);
            let stream = workload::encode(&ops, EncoderConfig::default()).unwrap();
            assert!(stream.tell <= 8 * stream.bytes.len() as u64);
            assert_eq!(
                workload::first_mismatch(&stream.bytes, &ops).unwrap(),
                None,
                "seed {}",
                seed
            );
        }
    }

    #[test]
    fn test_empty_stream_decodes() {
        let bytes = RangeEncoder::new().finalize().unwrap();
        assert_eq!(bytes, vec![0x80]);
        let dec = RangeDecoder::new(&bytes);
        assert_eq!(dec.tell(), 1);
    }

    #[test]
    fn test_raw_transparency() {
        for nbits in 0..=MAX_RAW_BITS {
            let max = if nbits == 0 { 0 } else { (1u32 << nbits) - 1 };
            let values = [0, max, max & 0x0155_5555, max & 0x00AA_AAAA, max >> 1];

            let mut enc = RangeEncoder::new();
            for &v in &values {
                enc.encode_raw_bits(v, nbits).unwrap();
            }
            let bytes = enc.finalize().unwrap();

            let mut dec = RangeDecoder::new(&bytes);
            for &v in &values {
                assert_eq!(dec.decode_raw_bits(nbits).unwrap(), v, "{} bits", nbits);
            }
        }
    }

    #[test]
    fn test_skewed_stream_compresses() {
        let icdf = icdf_from_frequencies(&[97, 1, 1, 1]).unwrap();
        let mut enc = RangeEncoder::new();
        for i in 0..4000 {
            let s = if i % 100 == 0 { 1 + i / 100 % 3 } else { 0 };
            enc.encode_symbol(s, &icdf, 4).unwrap();
        }
        let bytes = enc.finalize().unwrap();
        assert!(bytes.len() < 4000 / 8 / 2, "{} bytes", bytes.len());
    }

    #[test]
    fn test_parallel_encoders_are_independent() {
        let seeds: Vec<u64> = (100..116).collect();
        let sequential: Vec<Vec<u8>> = seeds
            .iter()
            .map(|&seed| {
                let ops = workload::generate(seed, 2000);
                workload::encode(&ops, EncoderConfig::default()).unwrap().bytes
            })
            .collect();
        let parallel: Vec<Vec<u8>> = seeds
            .par_iter()
            .map(|&seed| {
                let ops = workload::generate(seed, 2000);
                workload::encode(&ops, EncoderConfig::default()).unwrap().bytes
            })
            .collect();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_storage_limit_surfaces_through_workload() {
        let ops = workload::generate(5, 5000);
        let config = EncoderConfig::with_capacity(16).storage_limit(64);
        assert!(matches!(
            workload::encode(&ops, config),
            Err(EcError::AllocationFailed { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(seed in any::<u64>(), count in 0usize..400) {
            let ops = workload::generate(seed, count);
            let stream = workload::encode(&ops, EncoderConfig::default()).unwrap();
            prop_assert!(stream.tell <= 8 * stream.bytes.len() as u64);
            prop_assert_eq!(workload::first_mismatch(&stream.bytes, &ops).unwrap(), None);
        }

        #[test]
        fn prop_bools_roundtrip(bits in prop::collection::vec((any::<bool>(), 1u32..32768), 0..300)) {
            let mut enc = RangeEncoder::new();
            for &(val, f) in &bits {
                enc.encode_bool(val, f).unwrap();
            }
            let bytes = enc.finalize().unwrap();
            let mut dec = RangeDecoder::new(&bytes);
            for &(val, f) in &bits {
                prop_assert_eq!(dec.decode_bool(f).unwrap(), val);
            }
        }
    }
}

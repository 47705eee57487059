use crate::cdf::icdf_from_frequencies;
use crate::config::EncoderConfig;
use crate::decoder::RangeDecoder;
use crate::encoder::RangeEncoder;
use crate::error::EcResult;
use crate::overhead::OverheadReport;
use crate::{CDF_MAX_SYMBOLS, CDF_PROB_TOP, MAX_RAW_BITS};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// One coding call of a synthetic stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Symbol { s: usize, icdf: Vec<u16> },
    Bool { val: bool, f: u32 },
    Raw { value: u32, nbits: u32 },
}

#[derive(Debug, Clone)]
pub struct EncodedStream {
    pub bytes: Vec<u8>,
    pub tell: u64,
    pub overhead: Option<OverheadReport>,
}

/// Generates `count` operations from `seed`. Symbols and bools are drawn from
/// the distribution they are coded with, so the ideal cost is meaningful.
pub fn generate(seed: u64, count: usize) -> Vec<Op> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| match rng.random_range(0..10) {
            0..=5 => random_symbol(&mut rng),
            6..=8 => {
                let f = rng.random_range(1..CDF_PROB_TOP);
                let val = rng.random_range(0..CDF_PROB_TOP) < f;
                Op::Bool { val, f }
            }
            _ => {
                let nbits = rng.random_range(0..=MAX_RAW_BITS);
                let value = if nbits == 0 {
                    0
                } else {
                    rng.random_range(0..1u32 << nbits)
                };
                Op::Raw { value, nbits }
            }
        })
        .collect()
}

fn random_symbol(rng: &mut SmallRng) -> Op {
    let nsyms = rng.random_range(2..=CDF_MAX_SYMBOLS);
    let freqs: Vec<u32> = (0..nsyms).map(|_| rng.random_range(1..100)).collect();
    let total: u32 = freqs.iter().sum();
    let mut pick = rng.random_range(0..total);
    let mut s = 0;
    while pick >= freqs[s] {
        pick -= freqs[s];
        s += 1;
    }
    // the counts are never zero and never more than 16, so this cannot fail
    let icdf = icdf_from_frequencies(&freqs).unwrap_or_else(|_| vec![0; nsyms]);
    Op::Symbol { s, icdf }
}

pub fn encode(ops: &[Op], config: EncoderConfig) -> EcResult<EncodedStream> {
    let mut enc = RangeEncoder::with_config(config)?;
    for op in ops {
        match op {
            Op::Symbol { s, icdf } => enc.encode_symbol(*s, icdf, icdf.len())?,
            Op::Bool { val, f } => enc.encode_bool(*val, *f)?,
            Op::Raw { value, nbits } => enc.encode_raw_bits(*value, *nbits)?,
        }
    }
    let tell = enc.tell();
    let overhead = enc.overhead();
    let bytes = enc.finalize()?;
    Ok(EncodedStream {
        bytes,
        tell,
        overhead,
    })
}

/// Decodes `bytes` against `ops` and returns the index of the first
/// operation that decodes differently, if any.
pub fn first_mismatch(bytes: &[u8], ops: &[Op]) -> EcResult<Option<usize>> {
    let mut dec = RangeDecoder::new(bytes);
    for (i, op) in ops.iter().enumerate() {
        let ok = match op {
            Op::Symbol { s, icdf } => dec.decode_symbol(icdf, icdf.len())? == *s,
            Op::Bool { val, f } => dec.decode_bool(*f)? == *val,
            Op::Raw { value, nbits } => dec.decode_raw_bits(*nbits)? == *value,
        };
        if !ok {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

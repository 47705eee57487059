use crate::cdf::validate_icdf;
use crate::cost;
use crate::error::{EcError, EcResult};
use crate::{CDF_PROB_TOP, EC_MIN_PROB, EC_PROB_SHIFT, MAX_RAW_BITS};

const WINDOW_SIZE: i32 = 64;
const LOTS_OF_BITS: i32 = 0x4000;
const RAW_CHUNK_BITS: u32 = 16;

/// Decoder for streams produced by [`RangeEncoder`](crate::RangeEncoder).
///
/// `dif` holds the distance from the top of the current interval to the coded
/// value, left aligned in a 64-bit window with ones shifted in below the data.
#[derive(Debug, Clone)]
pub struct RangeDecoder<'a> {
    buf: &'a [u8],
    bptr: usize,
    dif: u64,
    rng: u32,
    cnt: i32,
    tell_offs: i32,
}

impl<'a> RangeDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        let mut dec = Self {
            buf,
            bptr: 0,
            dif: (1u64 << (WINDOW_SIZE - 1)) - 1,
            rng: 0x8000,
            cnt: -15,
            // one termination bit, minus the 15 bits `cnt` starts below zero
            tell_offs: -14,
        };
        dec.refill();
        dec
    }

    fn refill(&mut self) {
        let mut s = WINDOW_SIZE - 9 - (self.cnt + 15);
        while s >= 0 && self.bptr < self.buf.len() {
            debug_assert!(s <= WINDOW_SIZE - 8);
            self.dif ^= u64::from(self.buf[self.bptr]) << s;
            self.cnt += 8;
            s -= 8;
            self.bptr += 1;
        }
        if self.bptr >= self.buf.len() {
            self.tell_offs += LOTS_OF_BITS - self.cnt;
            self.cnt = LOTS_OF_BITS;
        }
    }

    fn normalize(&mut self, dif: u64, rng: u32) {
        debug_assert!(rng > 0 && rng <= 0xFFFF);
        let d = rng.leading_zeros() - 16;
        self.cnt -= d as i32;
        // Shifts in ones instead of zeros.
        self.dif = ((dif + 1) << d) - 1;
        self.rng = rng << d;
        if self.cnt < 0 {
            self.refill();
        }
    }

    #[inline]
    fn scale(&self, f: u32) -> u32 {
        ((self.rng >> 8) * (f >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT)
    }

    pub fn decode_bool(&mut self, f: u32) -> EcResult<bool> {
        if f == 0 || f >= CDF_PROB_TOP {
            return Err(EcError::InvalidInput(format!(
                "bool probability {} outside (0, {})",
                f, CDF_PROB_TOP
            )));
        }
        let r = self.rng;
        debug_assert!(self.dif >> (WINDOW_SIZE - 16) < u64::from(r));
        let v = self.scale(f) + EC_MIN_PROB;
        let vw = u64::from(v) << (WINDOW_SIZE - 16);
        let (dif, rng, ret) = if self.dif >= vw {
            (self.dif - vw, r - v, false)
        } else {
            (self.dif, v, true)
        };
        self.normalize(dif, rng);
        Ok(ret)
    }

    pub fn decode_symbol(&mut self, icdf: &[u16], nsyms: usize) -> EcResult<usize> {
        validate_icdf(icdf, nsyms)?;
        let r = self.rng;
        let n = nsyms as u32 - 1;
        let c = self.dif >> (WINDOW_SIZE - 16);
        debug_assert!(c < u64::from(r));

        let mut ret = 0usize;
        let mut u = r;
        let mut v = self.scale(u32::from(icdf[0])) + EC_MIN_PROB * n;
        while c < u64::from(v) {
            u = v;
            ret += 1;
            v = self.scale(u32::from(icdf[ret])) + EC_MIN_PROB * (n - ret as u32);
        }
        debug_assert!(v < u && u <= r);
        let dif = self.dif - (u64::from(v) << (WINDOW_SIZE - 16));
        self.normalize(dif, u - v);
        Ok(ret)
    }

    pub fn decode_raw_bits(&mut self, nbits: u32) -> EcResult<u32> {
        if nbits > MAX_RAW_BITS {
            return Err(EcError::InvalidInput(format!(
                "raw width {} exceeds {} bits",
                nbits, MAX_RAW_BITS
            )));
        }
        let mut value = 0u32;
        let mut remaining = nbits;
        while remaining > 0 {
            let k = remaining.min(RAW_CHUNK_BITS);
            remaining -= k;
            value = (value << k) | self.read_literal(k);
        }
        Ok(value)
    }

    fn read_literal(&mut self, k: u32) -> u32 {
        if self.cnt < k as i32 {
            self.refill();
        }
        let r = u64::from(self.rng);
        let top = self.dif >> (WINDOW_SIZE as u32 - 16 - k);
        let j = top / r;
        debug_assert!(j < 1u64 << k);
        // Wraps on purpose: the true result is below `rng << 48`.
        self.dif = ((self.dif + 1) << k)
            .wrapping_sub(1)
            .wrapping_sub((j * r) << (WINDOW_SIZE - 16));
        self.cnt -= k as i32;
        if self.cnt < 0 {
            self.refill();
        }
        ((1u64 << k) - 1 - j) as u32
    }

    /// Bits consumed so far, matching [`RangeEncoder::tell`](crate::RangeEncoder::tell)
    /// at the same point of the stream.
    pub fn tell(&self) -> u64 {
        (8 * self.bptr as i64 - i64::from(self.cnt) + i64::from(self.tell_offs)) as u64
    }

    pub fn tell_frac(&self) -> u64 {
        cost::tell_frac(self.tell(), self.rng)
    }
}

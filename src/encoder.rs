use crate::buffer::OutputBuffer;
use crate::cdf::validate_icdf;
use crate::config::EncoderConfig;
use crate::cost;
use crate::error::{EcError, EcResult};
use crate::overhead::{OverheadMeter, OverheadReport};
use crate::{CDF_PROB_TOP, EC_MIN_PROB, EC_PROB_SHIFT, MAX_RAW_BITS};

const FLUSH_THRESHOLD: i32 = 40;
const CARRY_MARGIN: i32 = 24;
const RAW_CHUNK_BITS: u32 = 16;

#[inline]
fn scale(rng: u32, f: u32) -> u32 {
    ((rng >> 8) * (f >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT)
}

/// Multi-symbol range encoder producing an AV1 compatible byte stream.
///
/// `low` is a 64-bit window: the coding interval occupies its bottom
/// `cnt + 24` bits plus a carry bit, everything above that has been flushed
/// to the output buffer. `cnt` starts at -9 so the first byte becomes ready
/// after one byte plus one carry bit have accumulated.
#[derive(Debug, Clone)]
pub struct RangeEncoder {
    low: u64,
    rng: u32,
    cnt: i32,
    buf: OutputBuffer,
    failure: Option<EcError>,
    meter: Option<OverheadMeter>,
}

impl RangeEncoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            rng: 0x8000,
            cnt: -9,
            buf: OutputBuffer::empty(None),
            failure: None,
            meter: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> EcResult<Self> {
        Self::with_config(EncoderConfig::with_capacity(capacity))
    }

    pub fn with_config(config: EncoderConfig) -> EcResult<Self> {
        config.validate()?;
        let buf = OutputBuffer::with_capacity(config.initial_capacity, config.storage_limit)?;
        Ok(Self {
            buf,
            meter: config.measure_overhead.then(OverheadMeter::new),
            ..Self::new()
        })
    }

    /// Returns the encoder to its initial state, keeping the allocated
    /// storage. Clears a previous failure.
    pub fn reset(&mut self) {
        self.low = 0;
        self.rng = 0x8000;
        self.cnt = -9;
        self.failure = None;
        self.buf.clear();
        if let Some(meter) = self.meter.as_mut() {
            meter.reset();
        }
    }

    pub fn has_error(&self) -> bool {
        self.failure.is_some()
    }

    pub fn error(&self) -> Option<&EcError> {
        self.failure.as_ref()
    }

    /// Bytes already moved out of the window. Later carries may still
    /// increment them until the stream is finalized.
    pub fn committed(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub fn bytes_written(&self) -> usize {
        self.buf.offs()
    }

    pub fn storage(&self) -> usize {
        self.buf.storage()
    }

    fn check(&self) -> EcResult<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: EcError) -> EcError {
        if err.is_sticky() {
            self.failure = Some(err.clone());
        }
        err
    }

    fn flush(&mut self, low: u64, c: i32, s: i32) -> EcResult<(u64, i32)> {
        if let Err(err) = self.buf.reserve_window() {
            return Err(self.fail(err));
        }
        let num_bytes_ready = (s >> 3) + 1;
        let c = c + CARRY_MARGIN - (num_bytes_ready << 3);
        let output = low >> c;
        let low = low & ((1u64 << c) - 1);
        let top = 1u64 << (num_bytes_ready << 3);
        let carry = (output & top) != 0;
        self.buf
            .write_window(output & (top - 1), num_bytes_ready as usize, carry)
            .map_err(|err| self.fail(err))?;
        Ok((low, c))
    }

    fn normalize(&mut self, low: u64, rng: u32) -> EcResult<()> {
        debug_assert!(rng > 0 && rng <= 0xFFFF);
        let d = rng.leading_zeros() as i32 - 16;
        let mut s = self.cnt + d;
        let mut low = low;
        if s >= FLUSH_THRESHOLD {
            let (masked, c) = self.flush(low, self.cnt, s)?;
            low = masked;
            s = c + d - CARRY_MARGIN;
        }
        self.low = low << d;
        self.rng = rng << d;
        self.cnt = s;
        Ok(())
    }

    fn encode_q15(&mut self, fl: u32, fh: u32, s: u32, nsyms: u32) -> EcResult<()> {
        let l = self.low;
        let r = self.rng;
        debug_assert!(r >= 0x8000);
        debug_assert!(fh <= fl && fl <= CDF_PROB_TOP);
        let n = nsyms - 1;
        let (low, rng) = if fl < CDF_PROB_TOP {
            let u = scale(r, fl) + EC_MIN_PROB * (n - (s - 1));
            let v = scale(r, fh) + EC_MIN_PROB * (n - s);
            (l + u64::from(r - u), u - v)
        } else {
            (l, r - (scale(r, fh) + EC_MIN_PROB * (n - s)))
        };
        self.normalize(low, rng)?;
        if let Some(meter) = self.meter.as_mut() {
            meter.record((fl - fh).max(1));
        }
        Ok(())
    }

    /// Encodes symbol `s` of an `nsyms` symbol alphabet described by the
    /// inverse CDF `icdf` (`icdf[i] = 32768 - cdf[i]`, last entry zero).
    /// Entries past `nsyms`, such as an adaptation counter, are ignored.
    pub fn encode_symbol(&mut self, s: usize, icdf: &[u16], nsyms: usize) -> EcResult<()> {
        self.check()?;
        validate_icdf(icdf, nsyms)?;
        if s >= nsyms {
            return Err(EcError::InvalidInput(format!(
                "symbol {} outside alphabet of {}",
                s, nsyms
            )));
        }
        let fl = if s > 0 {
            u32::from(icdf[s - 1])
        } else {
            CDF_PROB_TOP
        };
        let fh = u32::from(icdf[s]);
        self.encode_q15(fl, fh, s as u32, nsyms as u32)
    }

    /// Encodes a binary value. `f` is the probability of `true`, scaled by
    /// 32768.
    pub fn encode_bool(&mut self, val: bool, f: u32) -> EcResult<()> {
        self.check()?;
        if f == 0 || f >= CDF_PROB_TOP {
            return Err(EcError::InvalidInput(format!(
                "bool probability {} outside (0, {})",
                f, CDF_PROB_TOP
            )));
        }
        let l = self.low;
        let r = self.rng;
        let v = scale(r, f) + EC_MIN_PROB;
        let (low, rng) = if val {
            (l + u64::from(r - v), v)
        } else {
            (l, r - v)
        };
        self.normalize(low, rng)?;
        if let Some(meter) = self.meter.as_mut() {
            meter.record(if val { f } else { CDF_PROB_TOP - f });
        }
        Ok(())
    }

    /// Writes `nbits` of `value` (at most 25) outside the probability model.
    /// Each bit costs exactly one bit of [`tell`](Self::tell).
    pub fn encode_raw_bits(&mut self, value: u32, nbits: u32) -> EcResult<()> {
        self.check()?;
        if nbits > MAX_RAW_BITS {
            return Err(EcError::InvalidInput(format!(
                "raw width {} exceeds {} bits",
                nbits, MAX_RAW_BITS
            )));
        }
        if value >> nbits != 0 {
            return Err(EcError::InvalidInput(format!(
                "value {:#x} does not fit in {} bits",
                value, nbits
            )));
        }
        let mut remaining = nbits;
        while remaining > 0 {
            let k = remaining.min(RAW_CHUNK_BITS);
            remaining -= k;
            let chunk = (value >> remaining) & ((1 << k) - 1);
            self.push_literal(chunk, k)?;
        }
        if nbits > 0 {
            if let Some(meter) = self.meter.as_mut() {
                meter.record_raw(nbits);
            }
        }
        Ok(())
    }

    fn push_literal(&mut self, chunk: u32, k: u32) -> EcResult<()> {
        let k = k as i32;
        let mut low = self.low;
        let mut c = self.cnt;
        if c + k >= FLUSH_THRESHOLD {
            let (masked, pos) = self.flush(low, c, c)?;
            low = masked;
            c = pos - CARRY_MARGIN;
        }
        self.low = (low << k) + u64::from(chunk) * u64::from(self.rng);
        self.cnt = c + k;
        Ok(())
    }

    /// Terminates the stream and returns the encoded bytes.
    ///
    /// Emits the fewest bytes that decode to the coded symbols whatever a
    /// reader assumes follows them. A carry out of the final bytes ripples
    /// backward through the committed stream.
    pub fn finalize(mut self) -> EcResult<Vec<u8>> {
        self.check()?;
        let tell = self.tell();
        let mut c = self.cnt;
        let mut s = 10 + c;
        let m: u64 = 0x3FFF;
        let mut e = ((self.low + m) & !m) | (m + 1);

        let needed = ((s + 7) >> 3).max(0) as usize;
        self.buf.reserve_exact(needed)?;

        if s > 0 {
            let mut n = (1u64 << ((c + 16) as u32)) - 1;
            loop {
                let val = (e >> ((c + 16) as u32)) as u16;
                self.buf.push_byte((val & 0xFF) as u8, (val & 0x100) != 0)?;
                e &= n;
                s -= 8;
                c -= 8;
                n >>= 8;
                if s <= 0 {
                    break;
                }
            }
        }

        if let Some(meter) = &self.meter {
            let report = meter.report(tell);
            log::info!(
                "overhead: {:.3}% efficiency: {:.3} bits/symbol ({} symbols)",
                report.overhead_percent,
                report.bits_per_symbol,
                report.symbols
            );
        }
        log::debug!(
            "range encoder finalized: {} bytes, {} bits told",
            self.buf.offs(),
            tell
        );
        Ok(self.buf.into_bytes())
    }

    /// Bits used so far, including one reserved for terminating the stream.
    pub fn tell(&self) -> u64 {
        (self.cnt + 10) as u64 + 8 * self.buf.offs() as u64
    }

    /// [`tell`](Self::tell) in 1/8 bit units.
    pub fn tell_frac(&self) -> u64 {
        cost::tell_frac(self.tell(), self.rng)
    }

    pub fn overhead(&self) -> Option<OverheadReport> {
        self.meter.as_ref().map(|meter| meter.report(self.tell()))
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

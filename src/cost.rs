use crate::OD_BITRES;

/// Converts a whole-bit count plus the coder's current range into a bit count
/// scaled by `2^OD_BITRES`.
///
/// The fractional part is the worst-case number of bits still needed to pin a
/// value inside an interval of width `rng`, so the result always rounds up. A
/// fresh coder therefore reports one bit used.
pub fn tell_frac(nbits_total: u64, rng: u32) -> u64 {
    let nbits = nbits_total << OD_BITRES;
    let mut rng = u64::from(rng);
    let mut l = 0u64;
    for _ in 0..OD_BITRES {
        rng = (rng * rng) >> 15;
        let b = rng >> 16;
        l = (l << 1) | b;
        rng >>= b;
    }
    nbits - l
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_of_two_range() {
        // rng = 2^15 carries no fractional information
        assert_eq!(tell_frac(1, 0x8000), 8);
        assert_eq!(tell_frac(17, 0x8000), 17 * 8);
    }

    #[test]
    fn test_wide_range_costs_less() {
        let narrow = tell_frac(10, 0x8000);
        let wide = tell_frac(10, 0xFFFF);
        assert!(wide < narrow);
        assert!(narrow - wide <= 8);
    }

    #[test]
    fn test_monotonic_in_range() {
        let mut prev = tell_frac(5, 0x8000);
        for rng in (0x8000u32..0x10000).step_by(97) {
            let cur = tell_frac(5, rng);
            assert!(cur <= prev, "rng {:#x}", rng);
            prev = cur;
        }
    }
}

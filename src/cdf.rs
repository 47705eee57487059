use crate::error::{EcError, EcResult};
use crate::{CDF_MAX_SYMBOLS, CDF_PROB_TOP};

/// Checks that `icdf[..nsyms]` is a well-formed inverse CDF: non-increasing,
/// every entry below the probability top, and terminated by zero.
pub fn validate_icdf(icdf: &[u16], nsyms: usize) -> EcResult<()> {
    if nsyms == 0 || nsyms > CDF_MAX_SYMBOLS {
        return Err(EcError::InvalidInput(format!(
            "alphabet size {} outside 1..={}",
            nsyms, CDF_MAX_SYMBOLS
        )));
    }
    if icdf.len() < nsyms {
        return Err(EcError::InvalidInput(format!(
            "icdf has {} entries, {} symbols declared",
            icdf.len(),
            nsyms
        )));
    }
    let table = &icdf[..nsyms];
    if table[nsyms - 1] != 0 {
        return Err(EcError::InvalidInput(format!(
            "icdf must end at 0, found {}",
            table[nsyms - 1]
        )));
    }
    if u32::from(table[0]) >= CDF_PROB_TOP {
        return Err(EcError::InvalidInput(format!(
            "icdf entry {} reaches the probability top",
            table[0]
        )));
    }
    if let Some(i) = table.windows(2).position(|w| w[0] < w[1]) {
        return Err(EcError::InvalidInput(format!(
            "icdf increases at index {}: {} -> {}",
            i + 1,
            table[i],
            table[i + 1]
        )));
    }
    Ok(())
}

/// Builds an inverse CDF from raw symbol counts. Every symbol keeps at least
/// one unit of the 15-bit probability space, zero counts included.
pub fn icdf_from_frequencies(freqs: &[u32]) -> EcResult<Vec<u16>> {
    let nsyms = freqs.len();
    if nsyms == 0 || nsyms > CDF_MAX_SYMBOLS {
        return Err(EcError::InvalidInput(format!(
            "alphabet size {} outside 1..={}",
            nsyms, CDF_MAX_SYMBOLS
        )));
    }
    let total: u64 = freqs.iter().map(|&f| u64::from(f)).sum();
    if total == 0 {
        return Err(EcError::InvalidInput("all frequencies are zero".into()));
    }

    let scale = u64::from(CDF_PROB_TOP) - nsyms as u64;
    let mut acc = 0u64;
    let icdf = freqs
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            acc += u64::from(f);
            let cdf = acc * scale / total + i as u64 + 1;
            (u64::from(CDF_PROB_TOP) - cdf) as u16
        })
        .collect();
    Ok(icdf)
}

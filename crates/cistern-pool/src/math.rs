// crates/cistern-pool/src/math.rs
//
// Proportional mint and redemption math.
//
// Reserves and share counts are u64; every product is formed in u128 so
// `amount * total` can never overflow. Division truncates toward zero on both
// the deposit and the redemption side, so rounding dust always stays with the
// pool and can never be extracted by repeated deposit/withdraw cycles.

use cistern_core::error::CisternError;

/// Shares minted for depositing `deposit` units against the primary reserve.
///
/// - Empty pool (`total_shares == 0`): 1:1, the bootstrap exchange rate.
/// - Funded pool: `floor(deposit * total_shares / reserve)`.
///
/// A result of zero is returned as-is; callers that must mint a positive
/// amount reject it themselves.
///
/// # Errors
/// - `InvalidAmount` if `deposit == 0`.
/// - `Arithmetic` if the pool is funded but `reserve == 0`, or the result
///   does not fit in a u64.
pub fn share_for_deposit(deposit: u64, reserve: u64, total_shares: u64) -> Result<u64, CisternError> {
    if deposit == 0 {
        return Err(CisternError::InvalidAmount(
            "deposit amount must be greater than zero".to_string(),
        ));
    }
    if total_shares == 0 {
        return Ok(deposit);
    }
    if reserve == 0 {
        return Err(CisternError::Arithmetic(format!(
            "{} shares outstanding against an empty primary reserve",
            total_shares
        )));
    }

    let minted = deposit as u128 * total_shares as u128 / reserve as u128;
    u64::try_from(minted).map_err(|_| {
        CisternError::Arithmetic(format!(
            "minting for a deposit of {} exceeds the share range",
            deposit
        ))
    })
}

/// Reserve units returned for redeeming `shares` out of `total_shares`.
///
/// `floor(shares * reserve / total_shares)`; never more than `reserve`, and
/// exactly `reserve` when `shares == total_shares`.
///
/// # Errors
/// - `InvalidAmount` if `shares == 0`.
/// - `InsufficientShares` if `shares > total_shares`.
pub fn asset_for_redemption(shares: u64, reserve: u64, total_shares: u64) -> Result<u64, CisternError> {
    if shares == 0 {
        return Err(CisternError::InvalidAmount(
            "share amount must be greater than zero".to_string(),
        ));
    }
    if shares > total_shares {
        return Err(CisternError::InsufficientShares {
            requested: shares,
            outstanding: total_shares,
        });
    }

    // shares <= total_shares, so the quotient is bounded by `reserve`.
    let amount = shares as u128 * reserve as u128 / total_shares as u128;
    Ok(amount as u64)
}

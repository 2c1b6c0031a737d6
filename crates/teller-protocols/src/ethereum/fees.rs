//! EIP-1559 fee tiers

use crate::encoding::{parse_decimal, parse_quantity};
use crate::types::{CustomFee, EthereumFeeQuote, FeeTier};
use serde::Deserialize;
use teller_core::{Error, Result};

/// Blocks sampled by `eth_feeHistory`
pub const FEE_HISTORY_BLOCKS: u64 = 5;
/// Reward percentiles for the low, medium and high tiers
pub const REWARD_PERCENTILES: [f64; 3] = [10.0, 50.0, 90.0];

const GWEI_DECIMALS: u32 = 9;

/// `eth_feeHistory` result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    /// Base fee per block, plus the next block's
    pub base_fee_per_gas: Vec<String>,
    /// Priority fee per block per percentile
    #[serde(default)]
    pub reward: Vec<Vec<String>>,
}

/// Suggested-fee API response; values are gwei decimal strings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedFees {
    /// Low tier
    pub low: SuggestedTier,
    /// Medium tier
    pub medium: SuggestedTier,
    /// High tier
    pub high: SuggestedTier,
    /// Base fee estimate
    pub estimated_base_fee: String,
}

/// One suggested tier, gwei
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTier {
    /// Tip
    pub suggested_max_priority_fee_per_gas: String,
    /// Cap
    pub suggested_max_fee_per_gas: String,
}

/// Tier with its worst-case total
pub fn tier(gas_limit: u64, max_priority_fee_per_gas: u128, max_fee_per_gas: u128) -> FeeTier {
    FeeTier {
        max_priority_fee_per_gas,
        max_fee_per_gas,
        estimated_total: u128::from(gas_limit).saturating_mul(max_fee_per_gas),
    }
}

/// Tier for a caller-requested fee; the tip may not exceed the cap
pub fn custom_tier(gas_limit: u64, custom: &CustomFee) -> Result<FeeTier> {
    check_fee_cap(custom.max_fee_per_gas, custom.max_priority_fee_per_gas)?;
    Ok(tier(
        gas_limit,
        custom.max_priority_fee_per_gas,
        custom.max_fee_per_gas,
    ))
}

/// Reject a priority fee above the max fee
pub fn check_fee_cap(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Result<()> {
    if max_priority_fee_per_gas > max_fee_per_gas {
        return Err(Error::InvalidArgument(format!(
            "max priority fee {} exceeds max fee {}",
            max_priority_fee_per_gas, max_fee_per_gas
        )));
    }
    Ok(())
}

/// Fill whichever of cap and tip the caller left unset from `fallback`.
///
/// A fallback tip is clamped to the caller's cap and a fallback cap is raised
/// to the caller's tip. Both given explicitly must already be consistent.
pub fn resolve_eip1559_fees(
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
    fallback: &FeeTier,
) -> Result<(u128, u128)> {
    let (max, tip) = match (max_fee_per_gas, max_priority_fee_per_gas) {
        (Some(max), Some(tip)) => (max, tip),
        (Some(max), None) => (max, fallback.max_priority_fee_per_gas.min(max)),
        (None, Some(tip)) => (fallback.max_fee_per_gas.max(tip), tip),
        (None, None) => (fallback.max_fee_per_gas, fallback.max_priority_fee_per_gas),
    };
    check_fee_cap(max, tip)?;
    Ok((max, tip))
}

/// Sort tip and cap independently so low <= medium <= high holds for both
pub fn normalize_tiers(mut tiers: [(u128, u128); 3]) -> [(u128, u128); 3] {
    let mut tips = tiers.map(|(tip, _)| tip);
    let mut caps = tiers.map(|(_, cap)| cap);
    tips.sort_unstable();
    caps.sort_unstable();
    for (i, slot) in tiers.iter_mut().enumerate() {
        *slot = (tips[i], caps[i].max(tips[i]));
    }
    tiers
}

fn build_quote(gas_limit: u64, base_fee: u128, tiers: [(u128, u128); 3]) -> EthereumFeeQuote {
    let [low, medium, high] = normalize_tiers(tiers);
    EthereumFeeQuote {
        gas_limit,
        estimated_base_fee: base_fee,
        low: tier(gas_limit, low.0, low.1),
        medium: tier(gas_limit, medium.0, medium.1),
        high: tier(gas_limit, high.0, high.1),
        custom: None,
    }
}

/// Tiers from fee history: tip is the mean reward per percentile,
/// cap is twice the next base fee plus the tip
pub fn quote_from_fee_history(history: &FeeHistory, gas_limit: u64) -> Result<EthereumFeeQuote> {
    let base_fee = match history.base_fee_per_gas.last() {
        Some(value) => parse_quantity(value)?,
        None => {
            return Err(Error::NetworkRequestFailed(
                "fee history without base fees".to_string(),
            ))
        }
    };

    let mut tiers = [(0u128, 0u128); 3];
    for (i, slot) in tiers.iter_mut().enumerate() {
        let mut sum = 0u128;
        let mut count = 0u128;
        for block in &history.reward {
            if let Some(value) = block.get(i) {
                sum = sum.saturating_add(parse_quantity(value)?);
                count += 1;
            }
        }
        let tip = if count == 0 { 0 } else { sum / count };
        *slot = (tip, base_fee.saturating_mul(2).saturating_add(tip));
    }
    Ok(build_quote(gas_limit, base_fee, tiers))
}

fn gwei(value: &str) -> Result<u128> {
    parse_decimal(value, GWEI_DECIMALS)
        .ok_or_else(|| Error::NetworkRequestFailed(format!("invalid gwei amount {:?}", value)))
}

/// Tiers from the suggested-fee API
pub fn quote_from_suggested(fees: &SuggestedFees, gas_limit: u64) -> Result<EthereumFeeQuote> {
    let pair = |t: &SuggestedTier| -> Result<(u128, u128)> {
        Ok((
            gwei(&t.suggested_max_priority_fee_per_gas)?,
            gwei(&t.suggested_max_fee_per_gas)?,
        ))
    };
    Ok(build_quote(
        gas_limit,
        gwei(&fees.estimated_base_fee)?,
        [pair(&fees.low)?, pair(&fees.medium)?, pair(&fees.high)?],
    ))
}

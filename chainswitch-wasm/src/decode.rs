//! Conversions from raw provider replies into chainswitch types.
//!
//! Kept free of JS types so the rules can be tested natively.

use std::str::FromStr;

use alloy::primitives::Address;
use chainswitch::ProviderError;
use chainswitch::chain::ChainId;
use chainswitch::error::INTERNAL_ERROR;

/// Parse the account list returned by `eth_requestAccounts`/`eth_accounts`
/// or carried by `accountsChanged`.
pub fn accounts(raw: &[String]) -> Result<Vec<Address>, ProviderError> {
    raw.iter()
        .map(|s| {
            Address::from_str(s)
                .map_err(|e| ProviderError::internal(format!("invalid account {s:?}: {e}")))
        })
        .collect()
}

/// Interpret the reply to `eth_chainId`.
pub fn chain_id(raw: Option<String>) -> Result<ChainId, ProviderError> {
    match raw {
        Some(id) if !id.is_empty() => Ok(ChainId::new(id)),
        _ => Err(ProviderError::internal("eth_chainId returned no chain id")),
    }
}

/// Build a [`ProviderError`] from the fields of a rejected request.
///
/// Wallets reject with `{ code, message, data? }`; anything without a
/// numeric code is treated as an internal error.
#[allow(clippy::cast_possible_truncation)]
pub fn provider_error(
    code: Option<f64>,
    message: Option<String>,
    data: Option<serde_json::Value>,
) -> ProviderError {
    let code = code
        .filter(|c| c.is_finite() && c.fract() == 0.0)
        .map_or(INTERNAL_ERROR, |c| c as i64);
    let mut err = ProviderError::new(
        code,
        message.unwrap_or_else(|| "unknown provider error".to_owned()),
    );
    if let Some(data) = data {
        err = err.with_data(data);
    }
    err
}

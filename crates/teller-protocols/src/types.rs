//! Request and response types shared by every protocol service

use serde::{Deserialize, Serialize};
use teller_core::{Account, Error, Result, SupportedProtocol};
use teller_params::ProtocolParams;
use zeroize::Zeroizing;

/// Endpoint a call goes to. Chosen by the caller on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTarget {
    /// Ledger family
    pub protocol: SupportedProtocol,
    /// Chain id (`"mainnet"`, `"1"`, `"pocket"`, ...)
    pub chain_id: String,
    /// Node base URL
    pub rpc_url: String,
    /// Suggested-fee API base URL (Ethereum)
    #[serde(default)]
    pub fee_api_url: Option<String>,
}

impl NetworkTarget {
    /// Target without a fee API
    pub fn new(
        protocol: SupportedProtocol,
        chain_id: impl Into<String>,
        rpc_url: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            chain_id: chain_id.into(),
            rpc_url: rpc_url.into(),
            fee_api_url: None,
        }
    }

    /// Set the suggested-fee API
    pub fn with_fee_api(mut self, url: impl Into<String>) -> Self {
        self.fee_api_url = Some(url.into());
        self
    }

    /// Preset parameters for this chain id
    pub fn params(&self) -> ProtocolParams {
        ProtocolParams::for_chain_id(self.protocol, &self.chain_id)
    }

    /// `rpc_url` joined with `path`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.rpc_url.trim_end_matches('/'), path)
    }

    pub(crate) fn ensure_protocol(&self, protocol: SupportedProtocol) -> Result<()> {
        if self.protocol != protocol {
            return Err(Error::InvalidArgument(format!(
                "network targets {} but the service handles {}",
                self.protocol, protocol
            )));
        }
        Ok(())
    }
}

/// New random account
#[derive(Debug, Clone, Default)]
pub struct CreateAccountOptions {
    /// Display name
    pub name: String,
}

/// Account from an existing private key
#[derive(Debug, Clone)]
pub struct ImportAccountOptions {
    /// Display name
    pub name: String,
    /// Hex private key in the protocol's format
    pub private_key: Zeroizing<String>,
}

/// Seed account plus first child from a recovery phrase
#[derive(Debug, Clone)]
pub struct RecoveryPhraseAccountsOptions {
    /// Recovery phrase id the seed account points at
    pub seed_id: String,
    /// BIP-39 seed
    pub seed: Zeroizing<[u8; 64]>,
    /// Seed account name; children get `"{name} {n}"`
    pub name: String,
}

/// One HD child
#[derive(Debug, Clone)]
pub struct HdWalletAccountOptions {
    /// Seed account id
    pub parent_id: String,
    /// BIP-39 seed held by the seed account
    pub seed: Zeroizing<[u8; 64]>,
    /// Address index
    pub index: u32,
    /// Display name
    pub name: String,
}

/// Result of [`crate::ProtocolService::create_accounts_from_recovery_phrase`]
#[derive(Debug, Clone)]
pub struct SeedAccounts {
    /// HD seed account
    pub seed: Account,
    /// Child at index 0
    pub first_child: Account,
}

/// Fee question
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeRequest {
    /// Sender
    pub from: Option<String>,
    /// Recipient
    pub to: Option<String>,
    /// Amount in base units
    pub amount: Option<u128>,
    /// Token contract (Ethereum)
    pub token: Option<String>,
    /// Call data, hex
    pub data: Option<String>,
    /// Caller-requested custom tier (Ethereum)
    pub custom: Option<CustomFee>,
}

/// Caller-requested EIP-1559 fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFee {
    /// Max fee per gas, wei
    pub max_fee_per_gas: u128,
    /// Max priority fee per gas, wei
    pub max_priority_fee_per_gas: u128,
}

/// Fee answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeQuote {
    /// Fixed fee
    Flat {
        /// Denomination
        denom: String,
        /// Amount in `denom`
        value: u128,
    },
    /// EIP-1559 tiers
    Ethereum(EthereumFeeQuote),
}

/// Ethereum fee tiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumFeeQuote {
    /// Gas estimate
    pub gas_limit: u64,
    /// Next-block base fee, wei
    pub estimated_base_fee: u128,
    /// Cheapest tier
    pub low: FeeTier,
    /// Default tier
    pub medium: FeeTier,
    /// Fastest tier
    pub high: FeeTier,
    /// Echo of [`FeeRequest::custom`]
    pub custom: Option<FeeTier>,
}

/// One fee tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTier {
    /// Tip, wei
    pub max_priority_fee_per_gas: u128,
    /// Cap, wei
    pub max_fee_per_gas: u128,
    /// `gas_limit * max_fee_per_gas`
    pub estimated_total: u128,
}

/// Transfer of native coin or token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Sender address; must match the signing key
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount in base units
    pub amount: u128,
    /// Memo (Pocket, Cosmos)
    #[serde(default)]
    pub memo: Option<String>,
    /// Ethereum-only options
    #[serde(default)]
    pub evm: Option<EvmOptions>,
}

/// Ethereum transfer knobs; everything unset is fetched from the node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvmOptions {
    /// Gas limit
    pub gas_limit: Option<u64>,
    /// Legacy gas price; selects a legacy transaction
    pub gas_price: Option<u128>,
    /// EIP-1559 cap
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 tip
    pub max_priority_fee_per_gas: Option<u128>,
    /// Nonce
    pub nonce: Option<u64>,
    /// ERC-20 contract
    pub token: Option<String>,
    /// Extra call data, hex
    pub data: Option<String>,
}

/// Submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Transaction hash as reported by the node
    pub hash: String,
}

/// Probe results; each probe is a single attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Balance query answered
    pub can_provide_balance: bool,
    /// Fee query answered
    pub can_provide_fee: bool,
    /// Send path reachable
    pub can_send_transaction: bool,
    /// Latest height when known
    pub height: Option<u64>,
}

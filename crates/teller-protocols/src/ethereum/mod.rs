//! Ethereum and EVM-compatible chains

pub mod eip712;
pub mod erc20;
pub mod fees;
pub mod keys;
pub mod rlp;
pub mod transaction;

use crate::derivation::{bip32_derive, bip32_master, check_hd_index};
use crate::encoding::{amount_from_json, decode_hex, parse_quantity, to_quantity};
use crate::service::{child_name, submit_error, ProtocolService};
use crate::types::{
    CreateAccountOptions, CustomFee, EthereumFeeQuote, FeeQuote, FeeRequest,
    HdWalletAccountOptions, ImportAccountOptions, NetworkStatus, NetworkTarget,
    RecoveryPhraseAccountsOptions, SeedAccounts, TransactionResult, TransferRequest,
};
use async_trait::async_trait;
use fees::{
    check_fee_cap, custom_tier, quote_from_fee_history, quote_from_suggested,
    resolve_eip1559_fees, FeeHistory, SuggestedFees, FEE_HISTORY_BLOCKS, REWARD_PERCENTILES,
};
use keys::{keccak256, parse_address, to_checksum_address, EthereumKey};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use teller_core::{Account, AccountKind, Error, Result, SupportedProtocol};
use teller_net::RpcClient;
use transaction::{Eip1559Transaction, EthereumTransaction, LegacyTransaction};
use zeroize::Zeroizing;

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// EIP-191 digest: `keccak256("\x19Ethereum Signed Message:\n" || len || data)`
pub fn personal_message_hash(data: &[u8]) -> [u8; 32] {
    let mut preimage = format!("\x19Ethereum Signed Message:\n{}", data.len()).into_bytes();
    preimage.extend_from_slice(data);
    keccak256(&preimage)
}

fn signature_hex(recovery_id: u8, signature: &[u8; 64]) -> String {
    let mut bytes = signature.to_vec();
    bytes.push(27 + recovery_id);
    format!("0x{}", hex::encode(bytes))
}

/// Everything needed to sign, with `None` fields filled from the node
#[derive(Debug, Default)]
struct TxPlan {
    to: Option<[u8; 20]>,
    value: u128,
    data: Vec<u8>,
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<u128>,
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
}

/// Ethereum protocol service
pub struct EthereumService {
    rpc: Arc<RpcClient>,
}

impl EthereumService {
    /// Service over a shared RPC client
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    fn account(&self, key: &EthereumKey, name: &str, kind: AccountKind) -> Result<Account> {
        Account::new(
            SupportedProtocol::Ethereum,
            name,
            key.address(),
            key.public_key_hex(),
            key.private_key_hex(),
            kind,
        )
    }

    async fn call<R: DeserializeOwned>(
        &self,
        network: &NetworkTarget,
        method: &str,
        params: Value,
    ) -> Result<R> {
        Ok(self.rpc.json_rpc(&network.rpc_url, method, params).await?)
    }

    async fn call_quantity(&self, network: &NetworkTarget, method: &str, params: Value) -> Result<u128> {
        let value: String = self.call(network, method, params).await?;
        parse_quantity(&value)
    }

    async fn estimate_gas(&self, network: &NetworkTarget, call: Value) -> Result<u64> {
        let value: String = self
            .rpc
            .json_rpc(&network.rpc_url, "eth_estimateGas", json!([call]))
            .await
            .map_err(submit_error)?;
        let gas = parse_quantity(&value)?;
        u64::try_from(gas)
            .map_err(|_| Error::NetworkRequestFailed(format!("gas estimate {} out of range", gas)))
    }

    async fn fee_quote(
        &self,
        network: &NetworkTarget,
        gas_limit: u64,
        custom: Option<&CustomFee>,
    ) -> Result<EthereumFeeQuote> {
        let mut quote = match &network.fee_api_url {
            Some(base) => {
                let url = format!(
                    "{}/networks/{}/suggestedGasFees",
                    base.trim_end_matches('/'),
                    network.chain_id
                );
                let fees: SuggestedFees = self.rpc.get_json(&url).await?;
                quote_from_suggested(&fees, gas_limit)?
            }
            None => {
                let history: FeeHistory = self
                    .call(
                        network,
                        "eth_feeHistory",
                        json!([
                            to_quantity(u128::from(FEE_HISTORY_BLOCKS)),
                            "latest",
                            REWARD_PERCENTILES
                        ]),
                    )
                    .await?;
                quote_from_fee_history(&history, gas_limit)?
            }
        };
        quote.custom = custom.map(|c| custom_tier(gas_limit, c)).transpose()?;
        Ok(quote)
    }

    async fn sign_and_submit(
        &self,
        network: &NetworkTarget,
        key: &EthereumKey,
        plan: TxPlan,
    ) -> Result<TransactionResult> {
        let chain_id = chain_id_number(network)?;
        let from = key.address();

        let nonce = match plan.nonce {
            Some(nonce) => nonce,
            None => {
                let count = self
                    .call_quantity(network, "eth_getTransactionCount", json!([from, "pending"]))
                    .await?;
                u64::try_from(count)
                    .map_err(|_| Error::NetworkRequestFailed(format!("nonce {} out of range", count)))?
            }
        };

        let gas_limit = match plan.gas_limit {
            Some(gas) => gas,
            None => {
                let mut call = json!({
                    "from": from,
                    "value": to_quantity(plan.value),
                    "data": format!("0x{}", hex::encode(&plan.data)),
                });
                if let Some(to) = &plan.to {
                    call["to"] = json!(to_checksum_address(to));
                }
                self.estimate_gas(network, call).await?
            }
        };

        let transaction = match plan.gas_price {
            Some(gas_price) => EthereumTransaction::Legacy(LegacyTransaction {
                chain_id,
                nonce,
                gas_price,
                gas_limit,
                to: plan.to,
                value: plan.value,
                data: plan.data,
            }),
            None => {
                let (max_fee_per_gas, max_priority_fee_per_gas) =
                    match (plan.max_fee_per_gas, plan.max_priority_fee_per_gas) {
                        (Some(max), Some(tip)) => {
                            check_fee_cap(max, tip)?;
                            (max, tip)
                        }
                        (max, tip) => {
                            let quote = self.fee_quote(network, gas_limit, None).await?;
                            resolve_eip1559_fees(max, tip, &quote.medium)?
                        }
                    };
                EthereumTransaction::Eip1559(Eip1559Transaction {
                    chain_id,
                    nonce,
                    max_priority_fee_per_gas,
                    max_fee_per_gas,
                    gas_limit,
                    to: plan.to,
                    value: plan.value,
                    data: plan.data,
                })
            }
        };

        let raw = transaction.sign(key)?;
        let hash: String = self
            .rpc
            .json_rpc(
                &network.rpc_url,
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await
            .map_err(submit_error)?;
        tracing::info!("Ethereum transaction submitted: {} (nonce {})", hash, nonce);
        Ok(TransactionResult { hash })
    }
}

fn chain_id_number(network: &NetworkTarget) -> Result<u64> {
    let raw = network.chain_id.trim();
    let parsed = if raw.starts_with("0x") {
        u64::from_str_radix(&raw[2..], 16).ok()
    } else {
        raw.parse().ok()
    };
    parsed.ok_or_else(|| Error::InvalidArgument(format!("invalid EVM chain id {:?}", raw)))
}

fn require_sender(key: &EthereumKey, from: &str) -> Result<()> {
    if parse_address(from)? != key.address_bytes() {
        return Err(Error::InvalidArgument(format!(
            "sender {} does not match the signing key",
            from
        )));
    }
    Ok(())
}

fn hex_data(data: Option<&str>) -> Result<Vec<u8>> {
    match data {
        None => Ok(Vec::new()),
        Some(data) => {
            decode_hex(data).map_err(|e| Error::InvalidArgument(format!("data is not hex: {}", e)))
        }
    }
}

fn json_field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| object.get(*name))
        .filter(|value| !value.is_null())
}

fn json_amount(object: &Map<String, Value>, names: &[&str]) -> Result<Option<u128>> {
    match json_field(object, names) {
        None => Ok(None),
        Some(value) => amount_from_json(value).map(Some).ok_or_else(|| {
            Error::InvalidArgument(format!("invalid {} value {}", names[0], value))
        }),
    }
}

fn json_u64(object: &Map<String, Value>, names: &[&str]) -> Result<Option<u64>> {
    json_amount(object, names)?
        .map(|v| {
            u64::try_from(v)
                .map_err(|_| Error::InvalidArgument(format!("{} out of range", names[0])))
        })
        .transpose()
}

#[async_trait]
impl ProtocolService for EthereumService {
    fn protocol(&self) -> SupportedProtocol {
        SupportedProtocol::Ethereum
    }

    fn create_account(&self, options: &CreateAccountOptions) -> Result<Account> {
        self.account(&EthereumKey::generate(), &options.name, AccountKind::Individual)
    }

    fn create_account_from_private_key(&self, options: &ImportAccountOptions) -> Result<Account> {
        let key = EthereumKey::parse(&options.private_key)?;
        self.account(&key, &options.name, AccountKind::Individual)
    }

    fn create_accounts_from_recovery_phrase(
        &self,
        options: &RecoveryPhraseAccountsOptions,
    ) -> Result<SeedAccounts> {
        let root = EthereumKey::from_bytes(&*bip32_master(&options.seed[..])?)?;
        let seed = Account::new(
            SupportedProtocol::Ethereum,
            options.name.as_str(),
            root.address(),
            root.public_key_hex(),
            Zeroizing::new(hex::encode(&options.seed[..])),
            AccountKind::HdSeed {
                seed_id: options.seed_id.clone(),
            },
        )?;

        let first_child = self.create_hd_wallet_account(&HdWalletAccountOptions {
            parent_id: seed.id().to_string(),
            seed: options.seed.clone(),
            index: 0,
            name: child_name(&options.name, 0),
        })?;

        Ok(SeedAccounts { seed, first_child })
    }

    fn create_hd_wallet_account(&self, options: &HdWalletAccountOptions) -> Result<Account> {
        check_hd_index(options.index)?;
        let path = SupportedProtocol::Ethereum.derivation_path(options.index);
        let key = EthereumKey::from_bytes(&*bip32_derive(&options.seed[..], &path)?)?;
        self.account(
            &key,
            &options.name,
            AccountKind::HdChild {
                parent_id: options.parent_id.clone(),
                hdw_index: options.index,
                hdw_account_index: 0,
            },
        )
    }

    fn get_address_from_private_key(&self, private_key: &str) -> Result<String> {
        Ok(EthereumKey::parse(private_key)?.address())
    }

    fn sign_personal_data(&self, private_key: &str, data: &[u8]) -> Result<String> {
        let key = EthereumKey::parse(private_key)?;
        let (recovery_id, signature) = key.sign_digest(&personal_message_hash(data))?;
        Ok(signature_hex(recovery_id, &signature))
    }

    fn sign_typed_data(&self, private_key: &str, typed_data: &Value) -> Result<String> {
        let key = EthereumKey::parse(private_key)?;
        let digest = eip712::typed_data_hash(typed_data)?;
        let (recovery_id, signature) = key.sign_digest(&digest)?;
        Ok(signature_hex(recovery_id, &signature))
    }

    async fn get_balance(
        &self,
        network: &NetworkTarget,
        address: &str,
        token: Option<&str>,
    ) -> Result<u128> {
        network.ensure_protocol(SupportedProtocol::Ethereum)?;
        let owner = parse_address(address)?;

        match token {
            None => {
                self.call_quantity(network, "eth_getBalance", json!([address, "latest"]))
                    .await
            }
            Some(token) => {
                parse_address(token)?;
                let call = json!({
                    "to": token,
                    "data": format!("0x{}", hex::encode(erc20::balance_of_data(&owner))),
                });
                let result: String = self.call(network, "eth_call", json!([call, "latest"])).await?;
                erc20::decode_uint256(&result)
            }
        }
    }

    async fn get_fee(&self, network: &NetworkTarget, request: &FeeRequest) -> Result<FeeQuote> {
        network.ensure_protocol(SupportedProtocol::Ethereum)?;

        let gas_limit = match &request.to {
            None => network.params().default_gas_limit,
            Some(to) => {
                let recipient = parse_address(to)?;
                let mut call = match &request.token {
                    Some(token) => json!({
                        "to": token,
                        "value": "0x0",
                        "data": format!(
                            "0x{}",
                            hex::encode(erc20::transfer_data(&recipient, request.amount.unwrap_or(0)))
                        ),
                    }),
                    None => json!({
                        "to": to,
                        "value": to_quantity(request.amount.unwrap_or(0)),
                        "data": format!("0x{}", hex::encode(hex_data(request.data.as_deref())?)),
                    }),
                };
                if let Some(from) = &request.from {
                    call["from"] = json!(from);
                }
                self.estimate_gas(network, call).await?
            }
        };

        let quote = self
            .fee_quote(network, gas_limit, request.custom.as_ref())
            .await?;
        Ok(FeeQuote::Ethereum(quote))
    }

    async fn send_transaction(
        &self,
        network: &NetworkTarget,
        private_key: &str,
        request: &TransferRequest,
    ) -> Result<TransactionResult> {
        network.ensure_protocol(SupportedProtocol::Ethereum)?;
        let key = EthereumKey::parse(private_key)?;
        require_sender(&key, &request.from)?;
        let recipient = parse_address(&request.to)?;
        let options = request.evm.clone().unwrap_or_default();

        let mut plan = TxPlan {
            nonce: options.nonce,
            gas_limit: options.gas_limit,
            gas_price: options.gas_price,
            max_fee_per_gas: options.max_fee_per_gas,
            max_priority_fee_per_gas: options.max_priority_fee_per_gas,
            ..TxPlan::default()
        };
        match &options.token {
            Some(token) => {
                plan.to = Some(parse_address(token)?);
                plan.data = erc20::transfer_data(&recipient, request.amount);
            }
            None => {
                plan.to = Some(recipient);
                plan.value = request.amount;
                plan.data = hex_data(options.data.as_deref())?;
            }
        }
        self.sign_and_submit(network, &key, plan).await
    }

    async fn send_raw_transaction(
        &self,
        network: &NetworkTarget,
        private_key: &str,
        transaction: &Value,
    ) -> Result<TransactionResult> {
        network.ensure_protocol(SupportedProtocol::Ethereum)?;
        let key = EthereumKey::parse(private_key)?;
        let object = transaction.as_object().ok_or_else(|| {
            Error::InvalidArgument("Ethereum transaction must be a JSON object".to_string())
        })?;

        if let Some(from) = json_field(object, &["from"]).and_then(Value::as_str) {
            require_sender(&key, from)?;
        }
        let to = match json_field(object, &["to"]).and_then(Value::as_str) {
            Some(to) => Some(parse_address(to)?),
            None => None,
        };

        let plan = TxPlan {
            to,
            value: json_amount(object, &["value"])?.unwrap_or(0),
            data: hex_data(json_field(object, &["data", "input"]).and_then(Value::as_str))?,
            nonce: json_u64(object, &["nonce"])?,
            gas_limit: json_u64(object, &["gas", "gasLimit"])?,
            gas_price: json_amount(object, &["gasPrice"])?,
            max_fee_per_gas: json_amount(object, &["maxFeePerGas"])?,
            max_priority_fee_per_gas: json_amount(object, &["maxPriorityFeePerGas"])?,
        };
        self.sign_and_submit(network, &key, plan).await
    }

    async fn get_network_status(&self, network: &NetworkTarget) -> Result<NetworkStatus> {
        network.ensure_protocol(SupportedProtocol::Ethereum)?;
        let expected_chain = chain_id_number(network)?;

        let chain_matches = match self.call_quantity(network, "eth_chainId", json!([])).await {
            Ok(chain) => chain == u128::from(expected_chain),
            Err(e) => {
                tracing::debug!("eth_chainId probe failed: {}", e);
                false
            }
        };
        let can_provide_balance = self.get_balance(network, ZERO_ADDRESS, None).await.is_ok();
        let can_provide_fee = self
            .fee_quote(network, network.params().default_gas_limit, None)
            .await
            .is_ok();
        let height = self
            .call_quantity(network, "eth_blockNumber", json!([]))
            .await
            .ok()
            .and_then(|h| u64::try_from(h).ok());

        Ok(NetworkStatus {
            can_provide_balance,
            can_provide_fee,
            can_send_transaction: chain_matches,
            height,
        })
    }
}

//! Cosmos SDK chains (Pocket Shannon)

pub mod keys;
pub mod proto;

use crate::derivation::{bip32_derive, bip32_master, check_hd_index};
use crate::encoding::amount_from_json;
use crate::service::{child_name, submit_error, ProtocolService};
use crate::types::{
    CreateAccountOptions, FeeQuote, FeeRequest, HdWalletAccountOptions, ImportAccountOptions,
    NetworkStatus, NetworkTarget, RecoveryPhraseAccountsOptions, SeedAccounts, TransactionResult,
    TransferRequest,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keys::{decode_address, CosmosKey};
use prost::Message;
use proto::{single_signer_auth_info, Any, Coin, Fee, MsgSend, SignDoc, TxBody, TxRaw};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use teller_core::{Account, AccountKind, Error, Result, SupportedProtocol};
use teller_net::RpcClient;
use zeroize::Zeroizing;

const DEFAULT_PREFIX: &str = "pokt";

#[derive(Debug, Deserialize)]
struct RawCosmosTx {
    messages: Vec<RawAny>,
    #[serde(default)]
    memo: Option<String>,
    #[serde(default)]
    fee: Option<Vec<RawCoin>>,
    #[serde(default)]
    gas_limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAny {
    type_url: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawCoin {
    denom: String,
    amount: String,
}

/// Account number and sequence of a signer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignerState {
    account_number: u64,
    sequence: u64,
}

/// Cosmos protocol service
pub struct CosmosService {
    rpc: Arc<RpcClient>,
}

fn prefix(network: &NetworkTarget) -> &'static str {
    network.params().bech32_prefix.unwrap_or(DEFAULT_PREFIX)
}

fn u64_field(value: &Value, field: &str) -> Result<u64> {
    value
        .get(field)
        .and_then(amount_from_json)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| Error::NetworkRequestFailed(format!("account reply without {}", field)))
}

impl CosmosService {
    /// Service over a shared RPC client
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    fn account(&self, key: &CosmosKey, name: &str, kind: AccountKind) -> Result<Account> {
        Account::new(
            SupportedProtocol::Cosmos,
            name,
            key.address(DEFAULT_PREFIX)?,
            key.public_key_hex(),
            key.private_key_hex(),
            kind,
        )
    }

    async fn signer_state(&self, network: &NetworkTarget, address: &str) -> Result<SignerState> {
        let response: Value = self
            .rpc
            .get_json(&network.endpoint(&format!("/cosmos/auth/v1beta1/accounts/{}", address)))
            .await?;
        let account = response
            .get("account")
            .ok_or_else(|| Error::NetworkRequestFailed("account reply without account".to_string()))?;
        // Vesting and module accounts nest the base account
        let base = account.get("base_account").unwrap_or(account);
        Ok(SignerState {
            account_number: u64_field(base, "account_number")?,
            sequence: u64_field(base, "sequence")?,
        })
    }

    async fn sign_and_broadcast(
        &self,
        network: &NetworkTarget,
        key: &CosmosKey,
        messages: Vec<Any>,
        memo: String,
        fee: Fee,
    ) -> Result<TransactionResult> {
        let sender = key.address(prefix(network))?;
        let state = self.signer_state(network, &sender).await?;

        let body_bytes = TxBody {
            messages,
            memo,
            timeout_height: 0,
        }
        .encode_to_vec();
        let auth_info_bytes =
            single_signer_auth_info(&key.public_key_bytes(), state.sequence, fee).encode_to_vec();
        let sign_doc = SignDoc {
            body_bytes: body_bytes.clone(),
            auth_info_bytes: auth_info_bytes.clone(),
            chain_id: network.chain_id.clone(),
            account_number: state.account_number,
        };
        let signature = key.sign(&sign_doc.encode_to_vec())?;

        let tx_bytes = TxRaw {
            body_bytes,
            auth_info_bytes,
            signatures: vec![signature.to_vec()],
        }
        .encode_to_vec();

        let body = json!({
            "tx_bytes": BASE64.encode(tx_bytes),
            "mode": "BROADCAST_MODE_SYNC",
        });
        let response: Value = self
            .rpc
            .post_json(&network.endpoint("/cosmos/tx/v1beta1/txs"), &body)
            .await
            .map_err(submit_error)?;

        let tx_response = response.get("tx_response").ok_or_else(|| {
            Error::NetworkRequestFailed("broadcast reply without tx_response".to_string())
        })?;
        let code = tx_response.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let log = tx_response
                .get("raw_log")
                .and_then(Value::as_str)
                .unwrap_or("no log");
            return Err(Error::ProtocolTransactionFailed(format!(
                "code {}: {}",
                code, log
            )));
        }
        let hash = tx_response
            .get("txhash")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::NetworkRequestFailed("broadcast reply without txhash".to_string()))?;
        tracing::info!(
            "Cosmos transaction submitted: {} (sequence {})",
            hash,
            state.sequence
        );
        Ok(TransactionResult {
            hash: hash.to_string(),
        })
    }

    fn default_fee(network: &NetworkTarget) -> Fee {
        let params = network.params();
        Fee {
            amount: vec![Coin {
                denom: params.native_denom.to_string(),
                amount: params.default_fee.to_string(),
            }],
            gas_limit: params.default_gas_limit,
            ..Fee::default()
        }
    }

    async fn latest_height(&self, network: &NetworkTarget) -> Result<u64> {
        let response: Value = self
            .rpc
            .get_json(&network.endpoint("/cosmos/base/tendermint/v1beta1/blocks/latest"))
            .await?;
        ["sdk_block", "block"]
            .iter()
            .find_map(|key| response.get(*key))
            .and_then(|block| block.pointer("/header/height"))
            .and_then(amount_from_json)
            .and_then(|h| u64::try_from(h).ok())
            .ok_or_else(|| Error::NetworkRequestFailed("block reply without height".to_string()))
    }
}

fn require_sender(key: &CosmosKey, network: &NetworkTarget, from: &str) -> Result<()> {
    if key.address(prefix(network))? != from {
        return Err(Error::InvalidArgument(format!(
            "sender {} does not match the signing key",
            from
        )));
    }
    Ok(())
}

#[async_trait]
impl ProtocolService for CosmosService {
    fn protocol(&self) -> SupportedProtocol {
        SupportedProtocol::Cosmos
    }

    fn create_account(&self, options: &CreateAccountOptions) -> Result<Account> {
        self.account(&CosmosKey::generate(), &options.name, AccountKind::Individual)
    }

    fn create_account_from_private_key(&self, options: &ImportAccountOptions) -> Result<Account> {
        let key = CosmosKey::parse(&options.private_key)?;
        self.account(&key, &options.name, AccountKind::Individual)
    }

    fn create_accounts_from_recovery_phrase(
        &self,
        options: &RecoveryPhraseAccountsOptions,
    ) -> Result<SeedAccounts> {
        let root = CosmosKey::from_bytes(&*bip32_master(&options.seed[..])?)?;
        let seed = Account::new(
            SupportedProtocol::Cosmos,
            options.name.as_str(),
            root.address(DEFAULT_PREFIX)?,
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
        let path = SupportedProtocol::Cosmos.derivation_path(options.index);
        let key = CosmosKey::from_bytes(&*bip32_derive(&options.seed[..], &path)?)?;
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
        CosmosKey::parse(private_key)?.address(DEFAULT_PREFIX)
    }

    fn sign_personal_data(&self, private_key: &str, data: &[u8]) -> Result<String> {
        let key = CosmosKey::parse(private_key)?;
        Ok(hex::encode(key.sign(data)?))
    }

    async fn get_balance(
        &self,
        network: &NetworkTarget,
        address: &str,
        token: Option<&str>,
    ) -> Result<u128> {
        network.ensure_protocol(SupportedProtocol::Cosmos)?;
        let params = network.params();
        let denom = token.unwrap_or(params.native_denom);

        let response: Value = self
            .rpc
            .get_json(&network.endpoint(&format!(
                "/cosmos/bank/v1beta1/balances/{}/by_denom?denom={}",
                address, denom
            )))
            .await?;
        response
            .pointer("/balance/amount")
            .and_then(amount_from_json)
            .ok_or_else(|| Error::NetworkRequestFailed("balance reply without amount".to_string()))
    }

    async fn get_fee(&self, network: &NetworkTarget, _request: &FeeRequest) -> Result<FeeQuote> {
        network.ensure_protocol(SupportedProtocol::Cosmos)?;
        let params = network.params();
        Ok(FeeQuote::Flat {
            denom: params.native_denom.to_string(),
            value: params.default_fee,
        })
    }

    async fn send_transaction(
        &self,
        network: &NetworkTarget,
        private_key: &str,
        request: &TransferRequest,
    ) -> Result<TransactionResult> {
        network.ensure_protocol(SupportedProtocol::Cosmos)?;
        let key = CosmosKey::parse(private_key)?;
        require_sender(&key, network, &request.from)?;
        decode_address(prefix(network), &request.to)?;
        if request.amount == 0 {
            return Err(Error::InvalidArgument("amount must be positive".to_string()));
        }

        let send = MsgSend {
            from_address: request.from.clone(),
            to_address: request.to.clone(),
            amount: vec![Coin {
                denom: network.params().native_denom.to_string(),
                amount: request.amount.to_string(),
            }],
        };
        let message = Any {
            type_url: proto::MSG_SEND_TYPE_URL.to_string(),
            value: send.encode_to_vec(),
        };
        let memo = request.memo.clone().unwrap_or_default();
        self.sign_and_broadcast(network, &key, vec![message], memo, Self::default_fee(network))
            .await
    }

    async fn send_raw_transaction(
        &self,
        network: &NetworkTarget,
        private_key: &str,
        transaction: &Value,
    ) -> Result<TransactionResult> {
        network.ensure_protocol(SupportedProtocol::Cosmos)?;
        let key = CosmosKey::parse(private_key)?;

        let raw: RawCosmosTx = serde_json::from_value(transaction.clone())
            .map_err(|e| Error::InvalidArgument(format!("invalid Cosmos transaction: {}", e)))?;
        if raw.messages.is_empty() {
            return Err(Error::InvalidArgument("transaction has no messages".to_string()));
        }

        let messages = raw
            .messages
            .into_iter()
            .map(|m| {
                let value = BASE64.decode(m.value.as_bytes()).map_err(|e| {
                    Error::InvalidArgument(format!("message value is not base64: {}", e))
                })?;
                Ok(Any {
                    type_url: m.type_url,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut fee = Self::default_fee(network);
        if let Some(coins) = raw.fee {
            fee.amount = coins
                .into_iter()
                .map(|c| Coin {
                    denom: c.denom,
                    amount: c.amount,
                })
                .collect();
        }
        if let Some(gas) = raw.gas_limit {
            fee.gas_limit = amount_from_json(&gas)
                .and_then(|g| u64::try_from(g).ok())
                .ok_or_else(|| Error::InvalidArgument(format!("invalid gas_limit {}", gas)))?;
        }

        self.sign_and_broadcast(network, &key, messages, raw.memo.unwrap_or_default(), fee)
            .await
    }

    async fn get_network_status(&self, network: &NetworkTarget) -> Result<NetworkStatus> {
        network.ensure_protocol(SupportedProtocol::Cosmos)?;
        let params = network.params();

        let height = self.latest_height(network).await.ok();
        let supply: std::result::Result<Value, _> = self
            .rpc
            .get_json(&network.endpoint(&format!(
                "/cosmos/bank/v1beta1/supply/by_denom?denom={}",
                params.native_denom
            )))
            .await;

        Ok(NetworkStatus {
            can_provide_balance: supply.is_ok(),
            can_provide_fee: true,
            can_send_transaction: height.is_some(),
            height,
        })
    }
}

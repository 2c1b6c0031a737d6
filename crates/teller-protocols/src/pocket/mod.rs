//! Pocket Network (Morse) service

pub mod keys;
pub mod transaction;

use crate::derivation::{check_hd_index, slip10_derive, Slip10Key};
use crate::encoding::{amount_from_json, decode_hex};
use crate::service::{child_name, submit_error, ProtocolService};
use crate::types::{
    CreateAccountOptions, FeeQuote, FeeRequest, HdWalletAccountOptions, ImportAccountOptions,
    NetworkStatus, NetworkTarget, RecoveryPhraseAccountsOptions, SeedAccounts, TransactionResult,
    TransferRequest,
};
use async_trait::async_trait;
use keys::{is_valid_address, PocketKey};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use teller_core::{Account, AccountKind, Error, Result, SupportedProtocol};
use teller_net::RpcClient;
use transaction::{
    encode_signed_tx, random_entropy, sign_doc_bytes, FeeCoin, PocketMsg, ProtoAny,
};
use zeroize::Zeroizing;

const ZERO_ADDRESS: &str = "0000000000000000000000000000000000000000";

/// Pocket protocol service
pub struct PocketService {
    rpc: Arc<RpcClient>,
}

#[derive(Deserialize)]
struct RawPocketTx {
    msg: Value,
    proto: RawProto,
    #[serde(default)]
    fee: Option<Vec<FeeCoin>>,
    #[serde(default)]
    memo: Option<String>,
}

#[derive(Deserialize)]
struct RawProto {
    type_url: String,
    value: String,
}

impl PocketService {
    /// Service over a shared RPC client
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    fn account(&self, key: &PocketKey, name: &str, kind: AccountKind) -> Result<Account> {
        Account::new(
            SupportedProtocol::Pocket,
            name,
            key.address(),
            key.public_key_hex(),
            key.private_key_hex(),
            kind,
        )
    }

    fn default_fee(network: &NetworkTarget) -> Vec<FeeCoin> {
        let params = network.params();
        vec![FeeCoin {
            amount: params.default_fee.to_string(),
            denom: params.native_denom.to_string(),
        }]
    }

    async fn submit(
        &self,
        network: &NetworkTarget,
        key: &PocketKey,
        msg: &PocketMsg,
        fee: &[FeeCoin],
        memo: &str,
    ) -> Result<TransactionResult> {
        let entropy = random_entropy();
        let doc = sign_doc_bytes(&network.chain_id, entropy, fee, memo, &msg.json)?;
        let signature = key.sign(&doc);
        let raw = encode_signed_tx(msg, fee, key.public_key_bytes(), signature, memo, entropy);

        let body = json!({
            "address": key.address(),
            "raw_hex_bytes": hex::encode(raw),
        });
        let response: Value = self
            .rpc
            .post_json(&network.endpoint("/v1/client/rawtx"), &body)
            .await
            .map_err(submit_error)?;

        if let Some(code) = response.get("code").and_then(Value::as_i64) {
            if code != 0 {
                let log = response
                    .get("raw_log")
                    .and_then(Value::as_str)
                    .unwrap_or("no log");
                return Err(Error::ProtocolTransactionFailed(format!(
                    "code {}: {}",
                    code, log
                )));
            }
        }

        let hash = response
            .get("txhash")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::NetworkRequestFailed("rawtx reply without txhash".to_string()))?;
        tracing::info!("Pocket transaction submitted: {}", hash);
        Ok(TransactionResult {
            hash: hash.to_string(),
        })
    }

    async fn query_height(&self, network: &NetworkTarget) -> Result<u64> {
        let response: Value = self
            .rpc
            .post_json(&network.endpoint("/v1/query/height"), &json!({}))
            .await?;
        response
            .get("height")
            .and_then(amount_from_json_u64)
            .ok_or_else(|| Error::NetworkRequestFailed("height reply without height".to_string()))
    }
}

fn amount_from_json_u64(value: &Value) -> Option<u64> {
    amount_from_json(value).and_then(|v| u64::try_from(v).ok())
}

fn require_sender(key: &PocketKey, from: &str) -> Result<()> {
    if !key.address().eq_ignore_ascii_case(from) {
        return Err(Error::InvalidArgument(format!(
            "sender {} does not match the signing key",
            from
        )));
    }
    Ok(())
}

#[async_trait]
impl ProtocolService for PocketService {
    fn protocol(&self) -> SupportedProtocol {
        SupportedProtocol::Pocket
    }

    fn create_account(&self, options: &CreateAccountOptions) -> Result<Account> {
        self.account(&PocketKey::generate(), &options.name, AccountKind::Individual)
    }

    fn create_account_from_private_key(&self, options: &ImportAccountOptions) -> Result<Account> {
        let key = PocketKey::parse(&options.private_key)?;
        self.account(&key, &options.name, AccountKind::Individual)
    }

    fn create_accounts_from_recovery_phrase(
        &self,
        options: &RecoveryPhraseAccountsOptions,
    ) -> Result<SeedAccounts> {
        let root = PocketKey::from_secret(Slip10Key::master(&options.seed[..])?.secret());
        let seed = Account::new(
            SupportedProtocol::Pocket,
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
        let segments = SupportedProtocol::Pocket.derivation_segments(options.index);
        let secret = slip10_derive(&options.seed[..], &segments)?;
        let key = PocketKey::from_secret(&secret);
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
        Ok(PocketKey::parse(private_key)?.address())
    }

    fn sign_personal_data(&self, private_key: &str, data: &[u8]) -> Result<String> {
        let key = PocketKey::parse(private_key)?;
        Ok(hex::encode(key.sign(data)))
    }

    async fn get_balance(
        &self,
        network: &NetworkTarget,
        address: &str,
        token: Option<&str>,
    ) -> Result<u128> {
        network.ensure_protocol(SupportedProtocol::Pocket)?;
        if token.is_some() {
            return Err(Error::UnsupportedOperation(
                "Pocket has no token balances".to_string(),
            ));
        }

        let response: Value = self
            .rpc
            .post_json(
                &network.endpoint("/v1/query/balance"),
                &json!({"address": address, "height": 0}),
            )
            .await?;
        response
            .get("balance")
            .and_then(amount_from_json)
            .ok_or_else(|| Error::NetworkRequestFailed("balance reply without balance".to_string()))
    }

    async fn get_fee(&self, network: &NetworkTarget, _request: &FeeRequest) -> Result<FeeQuote> {
        network.ensure_protocol(SupportedProtocol::Pocket)?;
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
        network.ensure_protocol(SupportedProtocol::Pocket)?;
        let key = PocketKey::parse(private_key)?;
        require_sender(&key, &request.from)?;
        if !is_valid_address(&request.to) {
            return Err(Error::InvalidArgument(format!(
                "invalid recipient address {}",
                request.to
            )));
        }
        if request.amount == 0 {
            return Err(Error::InvalidArgument("amount must be positive".to_string()));
        }

        let msg = PocketMsg::send(&key.address(), &request.to.to_lowercase(), request.amount)?;
        let fee = Self::default_fee(network);
        let memo = request.memo.as_deref().unwrap_or("");
        self.submit(network, &key, &msg, &fee, memo).await
    }

    async fn send_raw_transaction(
        &self,
        network: &NetworkTarget,
        private_key: &str,
        transaction: &Value,
    ) -> Result<TransactionResult> {
        network.ensure_protocol(SupportedProtocol::Pocket)?;
        let key = PocketKey::parse(private_key)?;

        let raw: RawPocketTx = serde_json::from_value(transaction.clone())
            .map_err(|e| Error::InvalidArgument(format!("invalid Pocket transaction: {}", e)))?;
        if raw.msg.get("type").is_none() || raw.msg.get("value").is_none() {
            return Err(Error::InvalidArgument(
                "msg needs \"type\" and \"value\"".to_string(),
            ));
        }
        let proto_value = decode_hex(&raw.proto.value)
            .map_err(|e| Error::InvalidArgument(format!("proto value is not hex: {}", e)))?;

        let msg = PocketMsg {
            json: raw.msg,
            proto: ProtoAny {
                type_url: raw.proto.type_url,
                value: proto_value,
            },
        };
        let fee = raw.fee.unwrap_or_else(|| Self::default_fee(network));
        let memo = raw.memo.unwrap_or_default();
        self.submit(network, &key, &msg, &fee, &memo).await
    }

    async fn get_network_status(&self, network: &NetworkTarget) -> Result<NetworkStatus> {
        network.ensure_protocol(SupportedProtocol::Pocket)?;

        let height = self.query_height(network).await.ok();
        let can_provide_balance = self.get_balance(network, ZERO_ADDRESS, None).await.is_ok();

        Ok(NetworkStatus {
            can_provide_balance,
            can_provide_fee: true,
            can_send_transaction: height.is_some(),
            height,
        })
    }
}

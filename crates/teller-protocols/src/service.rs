//! Protocol capability interface and factory

use crate::cosmos::CosmosService;
use crate::ethereum::EthereumService;
use crate::pocket::PocketService;
use crate::types::{
    CreateAccountOptions, FeeQuote, FeeRequest, HdWalletAccountOptions, ImportAccountOptions,
    NetworkStatus, NetworkTarget, RecoveryPhraseAccountsOptions, SeedAccounts, TransactionResult,
    TransferRequest,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use teller_core::{Account, Error, Result, SupportedProtocol};
use teller_net::RpcClient;

/// One ledger family's account and transaction operations.
///
/// Key-material operations are synchronous and pure; network operations
/// take the [`NetworkTarget`] to talk to and make exactly one attempt.
#[async_trait]
pub trait ProtocolService: Send + Sync {
    /// Ledger family served
    fn protocol(&self) -> SupportedProtocol;

    /// Fresh random account
    fn create_account(&self, options: &CreateAccountOptions) -> Result<Account>;

    /// Account from an existing private key
    fn create_account_from_private_key(&self, options: &ImportAccountOptions) -> Result<Account>;

    /// HD seed account and its index-0 child
    fn create_accounts_from_recovery_phrase(
        &self,
        options: &RecoveryPhraseAccountsOptions,
    ) -> Result<SeedAccounts>;

    /// HD child; a pure function of seed and index
    fn create_hd_wallet_account(&self, options: &HdWalletAccountOptions) -> Result<Account>;

    /// Address for a private key
    fn get_address_from_private_key(&self, private_key: &str) -> Result<String>;

    /// Whether `private_key` parses for this protocol
    fn is_valid_private_key(&self, private_key: &str) -> bool {
        self.get_address_from_private_key(private_key).is_ok()
    }

    /// Sign arbitrary bytes the way this protocol's wallets do
    fn sign_personal_data(&self, private_key: &str, data: &[u8]) -> Result<String>;

    /// Sign structured data
    fn sign_typed_data(&self, _private_key: &str, _typed_data: &serde_json::Value) -> Result<String> {
        Err(Error::UnsupportedOperation(format!(
            "{} does not sign typed data",
            self.protocol()
        )))
    }

    /// Balance of the native asset, or of `token`
    async fn get_balance(
        &self,
        network: &NetworkTarget,
        address: &str,
        token: Option<&str>,
    ) -> Result<u128>;

    /// Fee quote
    async fn get_fee(&self, network: &NetworkTarget, request: &FeeRequest) -> Result<FeeQuote>;

    /// Build, sign and submit a transfer
    async fn send_transaction(
        &self,
        network: &NetworkTarget,
        private_key: &str,
        request: &TransferRequest,
    ) -> Result<TransactionResult>;

    /// Sign and submit a caller-built transaction
    async fn send_raw_transaction(
        &self,
        network: &NetworkTarget,
        private_key: &str,
        transaction: &serde_json::Value,
    ) -> Result<TransactionResult>;

    /// Probe balance, fee and send paths
    async fn get_network_status(&self, network: &NetworkTarget) -> Result<NetworkStatus>;
}

/// Protocol → service lookup
#[derive(Clone, Default)]
pub struct ProtocolServiceFactory {
    services: HashMap<SupportedProtocol, Arc<dyn ProtocolService>>,
}

impl ProtocolServiceFactory {
    /// Empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Pocket, Ethereum and Cosmos services sharing one RPC client
    pub fn with_defaults(rpc: Arc<RpcClient>) -> Self {
        let mut factory = Self::new();
        factory.register(Arc::new(PocketService::new(rpc.clone())));
        factory.register(Arc::new(EthereumService::new(rpc.clone())));
        factory.register(Arc::new(CosmosService::new(rpc)));
        factory
    }

    /// Register or replace the service for its protocol
    pub fn register(&mut self, service: Arc<dyn ProtocolService>) {
        self.services.insert(service.protocol(), service);
    }

    /// Service for `protocol`
    pub fn get(&self, protocol: SupportedProtocol) -> Result<Arc<dyn ProtocolService>> {
        self.services
            .get(&protocol)
            .cloned()
            .ok_or_else(|| Error::UnsupportedOperation(format!("no service for {}", protocol)))
    }

    /// Registered protocols
    pub fn protocols(&self) -> Vec<SupportedProtocol> {
        let mut protocols: Vec<_> = self.services.keys().copied().collect();
        protocols.sort();
        protocols
    }
}

/// Map a submit failure: node rejections are protocol failures, the rest network failures
pub(crate) fn submit_error(err: teller_net::Error) -> Error {
    match err {
        teller_net::Error::Status { status, body } => {
            Error::ProtocolTransactionFailed(format!(
                "node rejected transaction ({}): {}",
                status, body
            ))
        }
        teller_net::Error::Rpc { code, message } => {
            Error::ProtocolTransactionFailed(format!("{} (code {})", message, code))
        }
        other => other.into(),
    }
}

/// Name of the HD child at `index` under a seed named `name`
pub fn child_name(name: &str, index: u32) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!("{} {}", name, index + 1)
    }
}

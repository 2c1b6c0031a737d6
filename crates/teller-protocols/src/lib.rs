//! Protocol services
//!
//! One [`ProtocolService`] per ledger family: Pocket (ed25519, SLIP-10),
//! Ethereum (secp256k1, BIP-32, EIP-155/1559/191/712) and Cosmos Shannon
//! (secp256k1, BIP-32, protobuf direct signing). Services are looked up
//! through [`ProtocolServiceFactory`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cosmos;
pub mod derivation;
pub mod encoding;
pub mod ethereum;
pub mod pocket;
pub mod secp;
pub mod service;
pub mod types;

pub use cosmos::CosmosService;
pub use encoding::message_bytes;
pub use ethereum::EthereumService;
pub use pocket::PocketService;
pub use service::{child_name, ProtocolService, ProtocolServiceFactory};
pub use types::{
    CreateAccountOptions, CustomFee, EthereumFeeQuote, EvmOptions, FeeQuote, FeeRequest, FeeTier,
    HdWalletAccountOptions, ImportAccountOptions, NetworkStatus, NetworkTarget,
    RecoveryPhraseAccountsOptions, SeedAccounts, TransactionResult, TransferRequest,
};

//! Cosmos service against a mock REST gateway

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use prost::Message;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use teller_core::{Error, SupportedProtocol};
use teller_net::testing::{MockRequest, MockResponse, MockServer};
use teller_net::{RpcClient, TransportConfig};
use teller_protocols::cosmos::keys::CosmosKey;
use teller_protocols::cosmos::proto::{AuthInfo, Coin, MsgSend, SignDoc, TxBody, TxRaw};
use teller_protocols::secp::verify_compact;
use teller_protocols::{CosmosService, FeeQuote, FeeRequest, NetworkTarget, ProtocolService, TransferRequest};

fn service() -> CosmosService {
    CosmosService::new(Arc::new(RpcClient::new(&TransportConfig::default()).unwrap()))
}

fn network(server: &MockServer) -> NetworkTarget {
    NetworkTarget::new(SupportedProtocol::Cosmos, "pocket", server.url())
}

fn gateway(request: &MockRequest) -> MockResponse {
    let path = request.path.as_str();
    if path.starts_with("/cosmos/auth/v1beta1/accounts/") {
        MockResponse::json(json!({
            "account": {
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "account_number": "3",
                "sequence": "9"
            }
        }))
    } else if path == "/cosmos/tx/v1beta1/txs" {
        MockResponse::json(json!({"tx_response": {"code": 0, "txhash": "ABCDEF", "raw_log": ""}}))
    } else if path.contains("/by_denom?denom=upokt") && path.contains("/balances/") {
        MockResponse::json(json!({"balance": {"denom": "upokt", "amount": "777"}}))
    } else if path.starts_with("/cosmos/bank/v1beta1/supply/by_denom") {
        MockResponse::json(json!({"amount": {"denom": "upokt", "amount": "1000000"}}))
    } else if path == "/cosmos/base/tendermint/v1beta1/blocks/latest" {
        MockResponse::json(json!({"block": {"header": {"height": "4200"}}}))
    } else {
        MockResponse::status(404, "not found")
    }
}

fn broadcast_tx(server: &MockServer) -> TxRaw {
    let body = server
        .requests()
        .into_iter()
        .find(|r| r.path == "/cosmos/tx/v1beta1/txs")
        .expect("broadcast")
        .json();
    assert_eq!(body["mode"], "BROADCAST_MODE_SYNC");
    let bytes = BASE64.decode(body["tx_bytes"].as_str().unwrap()).unwrap();
    TxRaw::decode(bytes.as_slice()).unwrap()
}

#[tokio::test]
async fn test_balance_by_denom() {
    let server = MockServer::start(gateway).await.unwrap();
    let key = CosmosKey::generate();
    let address = key.address("pokt").unwrap();

    let balance = service()
        .get_balance(&network(&server), &address, None)
        .await
        .unwrap();
    assert_eq!(balance, 777);
    assert_eq!(
        server.requests()[0].path,
        format!("/cosmos/bank/v1beta1/balances/{}/by_denom?denom=upokt", address)
    );
}

#[tokio::test]
async fn test_flat_fee_from_params() {
    let server = MockServer::start(gateway).await.unwrap();
    let fee = service()
        .get_fee(&network(&server), &FeeRequest::default())
        .await
        .unwrap();
    assert_eq!(
        fee,
        FeeQuote::Flat {
            denom: "upokt".to_string(),
            value: 10
        }
    );
}

#[tokio::test]
async fn test_send_signs_direct_mode() {
    let server = MockServer::start(gateway).await.unwrap();
    let key = CosmosKey::generate();
    let recipient = CosmosKey::generate().address("pokt").unwrap();
    let request = TransferRequest {
        from: key.address("pokt").unwrap(),
        to: recipient.clone(),
        amount: 250,
        memo: Some("thanks".to_string()),
        ..TransferRequest::default()
    };

    let result = service()
        .send_transaction(&network(&server), &key.private_key_hex(), &request)
        .await
        .unwrap();
    assert_eq!(result.hash, "ABCDEF");

    let tx = broadcast_tx(&server);
    let body = TxBody::decode(tx.body_bytes.as_slice()).unwrap();
    assert_eq!(body.memo, "thanks");
    let send = MsgSend::decode(body.messages[0].value.as_slice()).unwrap();
    assert_eq!(send.to_address, recipient);
    assert_eq!(
        send.amount,
        vec![Coin {
            denom: "upokt".to_string(),
            amount: "250".to_string()
        }]
    );

    let auth = AuthInfo::decode(tx.auth_info_bytes.as_slice()).unwrap();
    assert_eq!(auth.signer_infos[0].sequence, 9);
    assert_eq!(auth.fee.as_ref().unwrap().gas_limit, 200_000);

    let doc = SignDoc {
        body_bytes: tx.body_bytes.clone(),
        auth_info_bytes: tx.auth_info_bytes.clone(),
        chain_id: "pocket".to_string(),
        account_number: 3,
    };
    let digest: [u8; 32] = Sha256::digest(doc.encode_to_vec()).into();
    let signature: [u8; 64] = tx.signatures[0].clone().try_into().unwrap();
    let public = secp256k1::PublicKey::from_slice(&key.public_key_bytes()).unwrap();
    assert!(verify_compact(&digest, &signature, &public));
}

#[tokio::test]
async fn test_nonzero_code_is_transaction_failure() {
    let server = MockServer::start(|request| {
        if request.path == "/cosmos/tx/v1beta1/txs" {
            MockResponse::json(json!({"tx_response": {"code": 5, "raw_log": "insufficient funds", "txhash": "X"}}))
        } else {
            gateway(request)
        }
    })
    .await
    .unwrap();
    let key = CosmosKey::generate();
    let request = TransferRequest {
        from: key.address("pokt").unwrap(),
        to: CosmosKey::generate().address("pokt").unwrap(),
        amount: 1,
        ..TransferRequest::default()
    };
    let err = service()
        .send_transaction(&network(&server), &key.private_key_hex(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProtocolTransactionFailed(_)));
}

#[tokio::test]
async fn test_recipient_prefix_checked() {
    let server = MockServer::start(gateway).await.unwrap();
    let key = CosmosKey::generate();
    let request = TransferRequest {
        from: key.address("pokt").unwrap(),
        to: CosmosKey::generate().address("cosmos").unwrap(),
        amount: 1,
        ..TransferRequest::default()
    };
    let err = service()
        .send_transaction(&network(&server), &key.private_key_hex(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_raw_transaction_messages() {
    let server = MockServer::start(gateway).await.unwrap();
    let key = CosmosKey::generate();
    let send = MsgSend {
        from_address: key.address("pokt").unwrap(),
        to_address: CosmosKey::generate().address("pokt").unwrap(),
        amount: vec![Coin {
            denom: "upokt".to_string(),
            amount: "5".to_string(),
        }],
    };
    let tx = json!({
        "messages": [{
            "type_url": "/cosmos.bank.v1beta1.MsgSend",
            "value": BASE64.encode(send.encode_to_vec())
        }],
        "memo": "raw",
        "fee": [{"denom": "upokt", "amount": "20"}],
        "gas_limit": "300000"
    });

    service()
        .send_raw_transaction(&network(&server), &key.private_key_hex(), &tx)
        .await
        .unwrap();

    let raw = broadcast_tx(&server);
    let auth = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
    let fee = auth.fee.unwrap();
    assert_eq!(fee.gas_limit, 300_000);
    assert_eq!(fee.amount[0].amount, "20");
    let body = TxBody::decode(raw.body_bytes.as_slice()).unwrap();
    assert_eq!(MsgSend::decode(body.messages[0].value.as_slice()).unwrap(), send);
}

#[tokio::test]
async fn test_raw_transaction_without_messages_rejected() {
    let server = MockServer::start(gateway).await.unwrap();
    let key = CosmosKey::generate();
    let err = service()
        .send_raw_transaction(&network(&server), &key.private_key_hex(), &json!({"messages": []}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_network_status() {
    let server = MockServer::start(gateway).await.unwrap();
    let status = service()
        .get_network_status(&network(&server))
        .await
        .unwrap();
    assert_eq!(status.height, Some(4200));
    assert!(status.can_send_transaction);
    assert!(status.can_provide_balance);
    assert!(status.can_provide_fee);
}

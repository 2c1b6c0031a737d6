//! RPC client tests against the in-process mock server

use serde_json::{json, Value};
use teller_net::testing::{MockResponse, MockServer};
use teller_net::{Error, RpcClient, TransportConfig};

fn client() -> RpcClient {
    RpcClient::new(&TransportConfig::default()).unwrap()
}

#[tokio::test]
async fn test_json_rpc_result() {
    let server = MockServer::json_rpc(|method, params| match method {
        "eth_chainId" => Ok(json!("0x1")),
        "echo" => Ok(params.clone()),
        _ => Err((-32601, "method not found".to_string())),
    })
    .await
    .unwrap();

    let rpc = client();
    let chain_id: String = rpc.json_rpc(&server.url(), "eth_chainId", json!([])).await.unwrap();
    assert_eq!(chain_id, "0x1");

    let echoed: Vec<String> = rpc
        .json_rpc(&server.url(), "echo", ["a", "b"])
        .await
        .unwrap();
    assert_eq!(echoed, vec!["a", "b"]);
}

#[tokio::test]
async fn test_json_rpc_error_object() {
    let server = MockServer::json_rpc(|_, _| Err((-32000, "nonce too low".to_string())))
        .await
        .unwrap();

    let result: teller_net::Result<Value> = client()
        .json_rpc(&server.url(), "eth_sendRawTransaction", ["0x00"])
        .await;

    match result {
        Err(Error::Rpc { code, message }) => {
            assert_eq!(code, -32000);
            assert_eq!(message, "nonce too low");
        }
        other => panic!("expected rpc error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_request_ids_increment() {
    let server = MockServer::json_rpc(|_, _| Ok(Value::Null)).await.unwrap();
    let rpc = client();

    for _ in 0..3 {
        let _: Value = rpc.json_rpc(&server.url(), "ping", json!([])).await.unwrap();
    }

    let ids: Vec<u64> = server
        .requests()
        .iter()
        .map(|r| r.json()["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(server.requests().iter().all(|r| r.json()["jsonrpc"] == "2.0"));
}

#[tokio::test]
async fn test_post_json_records_body() {
    let server = MockServer::start(|_| MockResponse::json(json!({"balance": 42})))
        .await
        .unwrap();

    let reply: Value = client()
        .post_json(
            &format!("{}/v1/query/balance", server.url()),
            &json!({"address": "abc", "height": 0}),
        )
        .await
        .unwrap();
    assert_eq!(reply["balance"], 42);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/v1/query/balance");
    assert_eq!(requests[0].json()["address"], "abc");
}

#[tokio::test]
async fn test_get_json_keeps_query() {
    let server = MockServer::start(|_| MockResponse::json(json!({"ok": true})))
        .await
        .unwrap();

    let _: Value = client()
        .get_json(&format!("{}/balances/x/by_denom?denom=upokt", server.url()))
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/balances/x/by_denom?denom=upokt");
}

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start(|_| MockResponse::status(500, "node down"))
        .await
        .unwrap();

    let result: teller_net::Result<Value> = client().get_json(&server.url()).await;
    match result {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "node down");
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(server.requests().len(), 1, "exactly one attempt");
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start(|_| MockResponse::status(200, "not json"))
        .await
        .unwrap();

    let result: teller_net::Result<Value> = client().get_json(&server.url()).await;
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[test]
fn test_errors_map_to_network_failure() {
    let core: teller_core::Error = Error::Status {
        status: 502,
        body: "bad gateway".to_string(),
    }
    .into();
    assert!(matches!(core, teller_core::Error::NetworkRequestFailed(_)));
    assert!(core.to_string().contains("502"));
}

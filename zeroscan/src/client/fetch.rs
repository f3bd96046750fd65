//! Fetch data from the node in response to queued fetch requests

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::debug;

use crate::client::rpc::RpcClient;
use crate::client::{BlockInfo, ChainInfo, FetchRequest, TransactionDetail};

/// Receives [`FetchRequest`]'s via an [`tokio::sync::mpsc::UnboundedReceiver`] and resolves them
/// against the node, one at a time.
///
/// Handling all node access from a single task serialises load on the node's RPC capacity and
/// keeps batched rounds in submission order. Returns when the request channel closes.
pub async fn fetch(mut fetch_request_receiver: UnboundedReceiver<FetchRequest>, client: RpcClient) {
    while let Some(fetch_request) = fetch_request_receiver.recv().await {
        fetch_from_node(&client, fetch_request).await;
    }
}

async fn fetch_from_node(client: &RpcClient, fetch_request: FetchRequest) {
    match fetch_request {
        FetchRequest::ChainHeight(sender) => {
            let height = client
                .call("getblockcount", Vec::new())
                .await
                .and_then(decode::<u64>);
            reply(sender, height);
        }
        FetchRequest::ChainInfo(sender) => {
            let info = client
                .call("getblockchaininfo", Vec::new())
                .await
                .and_then(decode::<ChainInfo>);
            reply(sender, info);
        }
        FetchRequest::BlockHashes(sender, block_range) => {
            let calls: Vec<(&str, Vec<Value>)> = block_range
                .map(|height| ("getblockhash", vec![json!(height)]))
                .collect();
            let results = client.batch_call(calls).await;
            reply(
                sender,
                results
                    .into_iter()
                    .map(|result| result.and_then(decode::<String>))
                    .collect(),
            );
        }
        FetchRequest::Blocks(sender, block_hashes) => {
            let calls: Vec<(&str, Vec<Value>)> = block_hashes
                .iter()
                .map(|hash| ("getblock", vec![json!(hash)]))
                .collect();
            let results = client.batch_call(calls).await;
            reply(
                sender,
                results
                    .into_iter()
                    .map(|result| result.and_then(decode::<BlockInfo>))
                    .collect(),
            );
        }
        FetchRequest::TransactionDetails(sender, txids) => {
            let calls: Vec<(&str, Vec<Value>)> = txids
                .iter()
                .map(|txid| ("getrawtransaction", vec![json!(txid), json!(true)]))
                .collect();
            let results = client.batch_call(calls).await;
            reply(
                sender,
                results
                    .into_iter()
                    .map(|result| result.and_then(decode::<TransactionDetail>))
                    .collect(),
            );
        }
    }
}

fn reply<T>(sender: oneshot::Sender<T>, value: T) {
    if sender.send(value).is_err() {
        debug!("fetch requester dropped before receiving its response");
    }
}

// An undecodable payload is a data error: the unit is skipped, never a hard failure.
fn decode<T: DeserializeOwned>(value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(decode_error) => {
            debug!(error = %decode_error, "discarding undecodable node response");
            None
        }
    }
}

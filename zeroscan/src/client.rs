//! Module for handling all connections to the node

use std::ops::RangeInclusive;

use serde::Deserialize;
use tokio::sync::{mpsc::UnboundedSender, oneshot};

use crate::error::ClientError;

pub mod fetch;
pub mod rpc;

/// Fetch requests are created and sent to the [`crate::client::fetch::fetch`] task when a
/// connection to the node is required.
///
/// Each variant includes a [`tokio::sync::oneshot::Sender`] for returning the fetched data to the
/// requester. Results are already degraded: a unit the node could not resolve arrives as `None`.
#[derive(Debug)]
pub enum FetchRequest {
    /// Gets the height of the best block known to the node.
    ChainHeight(oneshot::Sender<Option<u64>>),
    /// Gets chain metadata from the node.
    ChainInfo(oneshot::Sender<Option<ChainInfo>>),
    /// Resolves the block hash for every height in the range (end inclusive).
    BlockHashes(oneshot::Sender<Vec<Option<String>>>, RangeInclusive<u64>),
    /// Gets block detail for each of the given block hashes.
    Blocks(oneshot::Sender<Vec<Option<BlockInfo>>>, Vec<String>),
    /// Gets decoded transaction detail for each of the given transaction ids.
    TransactionDetails(oneshot::Sender<Vec<Option<TransactionDetail>>>, Vec<String>),
}

/// Subset of `getblockchaininfo` consumed by the scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainInfo {
    pub chain: String,
    pub blocks: u64,
    #[serde(default)]
    pub headers: Option<u64>,
    #[serde(default)]
    pub bestblockhash: Option<String>,
}

/// Subset of `getblock` detail consumed by the scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    #[serde(default)]
    pub height: Option<u64>,
    /// Transaction ids in block order. Absent on some pruned or malformed responses.
    #[serde(default)]
    pub tx: Option<Vec<String>>,
}

/// Subset of verbose `getrawtransaction` detail consumed by the scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDetail {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<TxIn>,
    #[serde(default)]
    pub vout: Vec<TxOut>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxIn {
    #[serde(default)]
    pub coinbase: Option<String>,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub vout: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxOut {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub n: Option<u32>,
}

/// Gets the height of the best block known to the node.
///
/// Requires [`crate::client::fetch::fetch`] to be running concurrently, connected via the
/// `fetch_request` channel.
pub async fn get_chain_height(
    fetch_request_sender: &UnboundedSender<FetchRequest>,
) -> Result<Option<u64>, ClientError> {
    let (sender, receiver) = oneshot::channel();
    fetch_request_sender
        .send(FetchRequest::ChainHeight(sender))
        .map_err(|_| ClientError::RequestChannelClosed)?;
    receiver.await.map_err(|_| ClientError::ResponseChannelClosed)
}

/// Gets chain metadata from the node.
///
/// Requires [`crate::client::fetch::fetch`] to be running concurrently, connected via the
/// `fetch_request` channel.
pub async fn get_chain_info(
    fetch_request_sender: &UnboundedSender<FetchRequest>,
) -> Result<Option<ChainInfo>, ClientError> {
    let (sender, receiver) = oneshot::channel();
    fetch_request_sender
        .send(FetchRequest::ChainInfo(sender))
        .map_err(|_| ClientError::RequestChannelClosed)?;
    receiver.await.map_err(|_| ClientError::ResponseChannelClosed)
}

/// Resolves the block hash for every height in the range (end inclusive), in height order.
///
/// Requires [`crate::client::fetch::fetch`] to be running concurrently, connected via the
/// `fetch_request` channel.
pub async fn get_block_hashes(
    fetch_request_sender: &UnboundedSender<FetchRequest>,
    block_range: RangeInclusive<u64>,
) -> Result<Vec<Option<String>>, ClientError> {
    let (sender, receiver) = oneshot::channel();
    fetch_request_sender
        .send(FetchRequest::BlockHashes(sender, block_range))
        .map_err(|_| ClientError::RequestChannelClosed)?;
    receiver.await.map_err(|_| ClientError::ResponseChannelClosed)
}

/// Gets block detail for each of the given block hashes, in input order.
///
/// Requires [`crate::client::fetch::fetch`] to be running concurrently, connected via the
/// `fetch_request` channel.
pub async fn get_blocks(
    fetch_request_sender: &UnboundedSender<FetchRequest>,
    block_hashes: Vec<String>,
) -> Result<Vec<Option<BlockInfo>>, ClientError> {
    let (sender, receiver) = oneshot::channel();
    fetch_request_sender
        .send(FetchRequest::Blocks(sender, block_hashes))
        .map_err(|_| ClientError::RequestChannelClosed)?;
    receiver.await.map_err(|_| ClientError::ResponseChannelClosed)
}

/// Gets decoded transaction detail for each of the given transaction ids, in input order.
///
/// Requires [`crate::client::fetch::fetch`] to be running concurrently, connected via the
/// `fetch_request` channel.
pub async fn get_transaction_details(
    fetch_request_sender: &UnboundedSender<FetchRequest>,
    txids: Vec<String>,
) -> Result<Vec<Option<TransactionDetail>>, ClientError> {
    let (sender, receiver) = oneshot::channel();
    fetch_request_sender
        .send(FetchRequest::TransactionDetails(sender, txids))
        .map_err(|_| ClientError::RequestChannelClosed)?;
    receiver.await.map_err(|_| ClientError::ResponseChannelClosed)
}

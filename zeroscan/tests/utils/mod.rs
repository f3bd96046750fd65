//! Shared fixtures: a mock node task answering fetch requests from a canned chain, and an
//! in-memory job store recording every call for assertions.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use zeroscan::client::{BlockInfo, FetchRequest, TransactionDetail, TxIn, TxOut};
use zeroscan::interface::JobStore;
use zeroscan::primitives::{JobId, JobStatus, ScanSummary};

/// One canned block: its hash and ordered transaction ids.
pub struct MockBlock {
    pub hash: String,
    pub txids: Vec<String>,
}

/// Canned chain data served by [`spawn_mock_node`].
#[derive(Default)]
pub struct MockChain {
    pub blocks: BTreeMap<u64, MockBlock>,
    /// txid to (input count, output count)
    pub transactions: HashMap<String, (usize, usize)>,
    /// Added before every response, to keep a scan in flight while the test looks around.
    pub respond_delay: Duration,
}

impl MockChain {
    /// Inserts a block whose transactions are given as (txid, inputs, outputs). The first entry
    /// is the coinbase by position.
    pub fn insert_block(&mut self, height: u64, transactions: Vec<(&str, usize, usize)>) {
        let txids = transactions
            .iter()
            .map(|(txid, _, _)| txid.to_string())
            .collect();
        for (txid, inputs, outputs) in transactions {
            self.transactions.insert(txid.to_string(), (inputs, outputs));
        }
        self.blocks.insert(
            height,
            MockBlock {
                hash: format!("hash-{height}"),
                txids,
            },
        );
    }
}

/// Spawns a task standing in for the fetcher, answering requests from the canned chain.
pub fn spawn_mock_node(chain: MockChain) -> (UnboundedSender<FetchRequest>, JoinHandle<()>) {
    let (sender, receiver) = unbounded_channel();
    let handle = tokio::spawn(serve(receiver, chain));
    (sender, handle)
}

async fn serve(mut receiver: UnboundedReceiver<FetchRequest>, chain: MockChain) {
    while let Some(request) = receiver.recv().await {
        if !chain.respond_delay.is_zero() {
            tokio::time::sleep(chain.respond_delay).await;
        }
        match request {
            FetchRequest::ChainHeight(reply) => {
                let _ = reply.send(chain.blocks.keys().next_back().copied());
            }
            FetchRequest::ChainInfo(reply) => {
                let _ = reply.send(None);
            }
            FetchRequest::BlockHashes(reply, block_range) => {
                let hashes = block_range
                    .map(|height| chain.blocks.get(&height).map(|block| block.hash.clone()))
                    .collect();
                let _ = reply.send(hashes);
            }
            FetchRequest::Blocks(reply, block_hashes) => {
                let blocks = block_hashes
                    .iter()
                    .map(|hash| {
                        chain
                            .blocks
                            .iter()
                            .find(|(_, block)| block.hash == *hash)
                            .map(|(height, block)| BlockInfo {
                                hash: block.hash.clone(),
                                height: Some(*height),
                                tx: Some(block.txids.clone()),
                            })
                    })
                    .collect();
                let _ = reply.send(blocks);
            }
            FetchRequest::TransactionDetails(reply, txids) => {
                let details = txids
                    .iter()
                    .map(|txid| {
                        chain.transactions.get(txid).map(|(inputs, outputs)| {
                            TransactionDetail {
                                txid: txid.clone(),
                                vin: vec![TxIn::default(); *inputs],
                                vout: vec![TxOut::default(); *outputs],
                            }
                        })
                    })
                    .collect();
                let _ = reply.send(details);
            }
        }
    }
}

/// Store call log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Status(JobId, JobStatus),
    /// Carries the special transaction count of the recorded summary.
    Result(JobId, u64),
    Failure(JobId, String),
}

/// In-memory [`JobStore`] recording every call.
#[derive(Default)]
pub struct MemoryJobStore {
    events: Mutex<Vec<StoreEvent>>,
}

impl MemoryJobStore {
    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Whether the job reached a terminal state (completed or failed).
    pub fn is_finished(&self, job_id: JobId) -> bool {
        self.events().iter().any(|event| {
            matches!(event, StoreEvent::Status(id, JobStatus::Completed) if *id == job_id)
                || matches!(event, StoreEvent::Failure(id, _) if *id == job_id)
        })
    }

    /// Index of the first matching event, for ordering assertions.
    pub fn position_of(&self, wanted: &StoreEvent) -> Option<usize> {
        self.events().iter().position(|event| event == wanted)
    }
}

impl JobStore for MemoryJobStore {
    type Error = std::convert::Infallible;

    fn update_status(&self, job_id: JobId, status: JobStatus) -> Result<(), Self::Error> {
        self.events
            .lock()
            .unwrap()
            .push(StoreEvent::Status(job_id, status));
        Ok(())
    }

    fn record_result(&self, job_id: JobId, summary: &ScanSummary) -> Result<(), Self::Error> {
        self.events
            .lock()
            .unwrap()
            .push(StoreEvent::Result(job_id, summary.stats().special_transactions()));
        Ok(())
    }

    fn record_failure(&self, job_id: JobId, reason: &str) -> Result<(), Self::Error> {
        self.events
            .lock()
            .unwrap()
            .push(StoreEvent::Failure(job_id, reason.to_string()));
        Ok(())
    }
}

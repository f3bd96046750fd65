#![forbid(unsafe_code)]
//! Scanning engine for hunting zero-prefixed transaction ids over a node's JSON-RPC interface.
//!
//! A scan walks a block range in two stages: collection gathers every transaction id carrying a
//! minimum number of leading zeros, classification resolves full transaction detail for the
//! candidates and applies the special-transaction thresholds. All node access is batched and
//! routed through a single fetcher task, scan requests are serialised by a one-worker job queue,
//! and progress is published as an overwritten in-process snapshot.

pub mod client;
pub mod error;
pub mod interface;
pub mod primitives;
pub mod queue;
pub mod scan;
pub mod status;

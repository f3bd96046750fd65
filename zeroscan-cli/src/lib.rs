#![forbid(unsafe_code)]
//! Command line front end for running a single scan against a node.
//!
//! Connection settings come from the environment (see `zeroscan-config`); scan parameters come
//! from the flags below. Progress is printed every couple of seconds until the run finishes with
//! the analysis summary.

use std::time::Duration;

use clap::{Arg, ArgAction};
use tracing::{info, warn};

use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::oneshot;
use tokio::time::sleep;

use zeroscan::client::rpc::RpcClient;
use zeroscan::client::{fetch::fetch, get_chain_info};
use zeroscan::error::RequestError;
use zeroscan::primitives::{JobId, ScanRequest};
use zeroscan::scan::scan;
use zeroscan::status::StatusPublisher;
use zeroscan_config::RpcConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn build_clap_app() -> clap::Command {
    clap::Command::new("zeroscan")
        .version(VERSION)
        .about("Scan a block range for zero-prefixed transaction ids over a node's JSON-RPC interface")
        .arg(
            Arg::new("start")
                .long("start")
                .value_name("HEIGHT")
                .required(true)
                .value_parser(clap::value_parser!(u64))
                .help("Start block height"),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .value_name("HEIGHT")
                .required(true)
                .value_parser(clap::value_parser!(u64))
                .help("End block height, inclusive"),
        )
        .arg(
            Arg::new("batch-size")
                .long("batch-size")
                .value_name("BLOCKS")
                .value_parser(clap::value_parser!(u64))
                .default_value("1000")
                .help("Blocks per batched RPC round"),
        )
        .arg(
            Arg::new("min-zeros")
                .long("min-zeros")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(u32))
                .default_value("2")
                .help("Minimum leading zeros for a transaction id to be considered"),
        )
        .arg(
            Arg::new("min-inputs")
                .long("min-inputs")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(usize))
                .default_value("1")
                .help("Minimum inputs for special transactions"),
        )
        .arg(
            Arg::new("show-all-zeros")
                .long("show-all-zeros")
                .action(ArgAction::SetTrue)
                .help("Also report every transaction meeting the zero threshold, regardless of inputs"),
        )
        .arg(
            Arg::new("exclude-coinbase")
                .long("exclude-coinbase")
                .action(ArgAction::SetTrue)
                .help("Exclude coinbase transactions from the results"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .value_name("LABEL")
                .default_value("cli-scan")
                .help("Label for this scan"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Suppress periodic progress updates"),
        )
}

pub fn run_cli() {
    tracing_subscriber::fmt::init();

    let matches = build_clap_app().get_matches();
    let request = match request_from_matches(&matches) {
        Ok(request) => request,
        Err(request_error) => {
            eprintln!("Error: {request_error}");
            std::process::exit(1);
        }
    };
    let config = match RpcConfig::from_env() {
        Ok(config) => config,
        Err(config_error) => {
            eprintln!("Error: {config_error}");
            std::process::exit(1);
        }
    };
    let quiet = matches.get_flag("quiet");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(io_error) => {
            eprintln!("Error: failed to start async runtime: {io_error}");
            std::process::exit(1);
        }
    };
    let exit_code = runtime.block_on(run_scan(config, request, quiet));
    std::process::exit(exit_code);
}

fn request_from_matches(matches: &clap::ArgMatches) -> Result<ScanRequest, RequestError> {
    ScanRequest::from_parts(
        JobId(0),
        matches
            .get_one::<String>("name")
            .expect("name has a default")
            .clone(),
        *matches.get_one::<u64>("start").expect("start is required"),
        *matches.get_one::<u64>("end").expect("end is required"),
        *matches
            .get_one::<u64>("batch-size")
            .expect("batch-size has a default"),
        *matches
            .get_one::<u32>("min-zeros")
            .expect("min-zeros has a default"),
        *matches
            .get_one::<usize>("min-inputs")
            .expect("min-inputs has a default"),
        matches.get_flag("show-all-zeros"),
        matches.get_flag("exclude-coinbase"),
    )
}

async fn run_scan(config: RpcConfig, request: ScanRequest, quiet: bool) -> i32 {
    let client = match RpcClient::new(&config) {
        Ok(client) => client,
        Err(client_error) => {
            eprintln!("Error: {client_error}");
            return 1;
        }
    };
    info!(uri = %config.rpc_uri, "RPC client initialized");

    let (fetch_request_sender, fetch_request_receiver) = unbounded_channel();
    let fetcher_handle = tokio::spawn(fetch(fetch_request_receiver, client));

    match get_chain_info(&fetch_request_sender).await {
        Ok(Some(chain_info)) => {
            info!(chain = %chain_info.chain, height = chain_info.blocks, "connected to node");
            if request.end_block() > chain_info.blocks {
                warn!(
                    end = request.end_block(),
                    height = chain_info.blocks,
                    "scan range ends above the node's best block"
                );
            }
        }
        Ok(None) => warn!("node did not answer getblockchaininfo, proceeding anyway"),
        Err(client_error) => {
            eprintln!("Error: {client_error}");
            return 1;
        }
    }

    let status = StatusPublisher::new();

    // print progress updates until told to stop, same shape as the sync status printer
    let printer = (!quiet).then(|| {
        let mut progress_receiver = status.subscribe();
        let (stop_transmitter, mut stop_receiver) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                if stop_receiver.try_recv().is_ok() {
                    break;
                }
                let progress = progress_receiver.borrow_and_update().clone();
                println!("{progress}");
                sleep(Duration::from_secs(2)).await;
            }
        });
        (handle, stop_transmitter)
    });

    let result = scan(fetch_request_sender.clone(), status.clone(), request).await;

    if let Some((printer_handle, stop_transmitter)) = printer {
        let _ = stop_transmitter.send(());
        let _ = printer_handle.await;
    }

    // closing the request channel lets the fetcher task wind down
    drop(fetch_request_sender);
    let _ = fetcher_handle.await;

    match result {
        Ok(summary) => {
            println!("{summary}");
            0
        }
        Err(scan_error) => {
            eprintln!("Error: scan failed: {scan_error}");
            1
        }
    }
}

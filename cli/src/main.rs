use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use futures::future::join_all;
use kadnet_logic::lookup::{lookup, LookupMode};
use kadnet_logic::{actor, Contact, Id, RoutingConfig, RpcClient};
use kadnet_transport::{client::UdpRpcClient, handler, UdpTransport};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// A minimal Kademlia DHT node: binds a UDP socket, optionally joins an
/// existing network, then serves a PUT/GET/PRINT/EXIT REPL on stdin.
#[derive(Parser, Debug)]
#[command(name = "kadnet")]
struct Args {
    /// Local address to bind the UDP socket on.
    #[clap(long, env = "KADNET_BIND", default_value = "127.0.0.1:0")]
    bind: SocketAddr,

    /// Address of an existing node to join through.
    #[clap(long, env = "KADNET_BOOTSTRAP")]
    bootstrap: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let me_id = Id::random();
    let config = RoutingConfig::default();

    let transport = UdpTransport::bind(args.bind, me_id).await?;
    let me_addr = transport.local_addr()?;
    let me = Contact::new(me_id, me_addr);
    info!(id = %me_id, addr = %me_addr, "bound");

    let rpc_transport = transport.clone();
    let handle = actor::spawn(me, config, move |handle| {
        UdpRpcClient::new(rpc_transport, me_addr, handle, config.rpc_timeout)
    });
    let rpc = UdpRpcClient::new(transport.clone(), me_addr, handle.clone(), config.rpc_timeout);

    tokio::spawn(handler::serve(transport, me_addr, handle.clone(), config));

    if let Some(bootstrap_addr) = args.bootstrap {
        bootstrap(&handle, &rpc, me_id, bootstrap_addr, &config).await;
    }

    repl(handle, rpc, me_id, config).await;
    Ok(())
}

async fn bootstrap(
    handle: &actor::ActorHandle,
    rpc: &UdpRpcClient,
    me_id: Id,
    bootstrap_addr: SocketAddr,
    config: &RoutingConfig,
) {
    // The bootstrap peer's id isn't known yet, so it can't be observed
    // ahead of time without fabricating one. `ping`'s own `observe()` call
    // (transport/src/client.rs) seeds the routing table with the *real* id
    // once the PONG arrives, which is the only seeding this needs; `id` here
    // is only a placeholder for the RPC's addressing, never inserted as a
    // routing table entry.
    let placeholder = Contact::new(Id::random(), bootstrap_addr);
    if rpc.ping(placeholder).await.is_err() {
        info!(addr = %bootstrap_addr, "bootstrap peer did not respond to ping");
    }
    lookup(handle, rpc, me_id, me_id, LookupMode::NodeOnly, config).await;
    info!("bootstrap lookup on own id complete");
}

async fn repl(handle: actor::ActorHandle, rpc: UdpRpcClient, me_id: Id, config: RoutingConfig) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            result = lines.next_line() => match result {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "error reading input");
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("Exiting program.");
                break;
            }
        };

        let line = line.trim();
        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command.to_ascii_uppercase().as_str() {
            "PUT" => handle_put(&handle, &rpc, me_id, arg, &config).await,
            "GET" => handle_get(&handle, &rpc, me_id, arg, &config).await,
            "PRINT" => handle.print(),
            "EXIT" => {
                println!("Exiting program.");
                break;
            }
            "" => {}
            other => println!("Error: Unknown command '{other}'."),
        }
    }
}

async fn handle_put(
    handle: &actor::ActorHandle,
    rpc: &UdpRpcClient,
    me_id: Id,
    arg: &str,
    config: &RoutingConfig,
) {
    if arg.is_empty() {
        println!("Error: No argument provided for PUT.");
        return;
    }
    let value = arg.as_bytes().to_vec();
    let mut hasher = Sha1::new();
    hasher.update(&value);
    let digest = hasher.finalize();
    let mut bytes = [0u8; kadnet_logic::id::ID_LEN];
    bytes.copy_from_slice(&digest);
    let key = Id(bytes);

    let outcome = lookup(handle, rpc, me_id, key, LookupMode::NodeOnly, config).await;
    if outcome.closest.is_empty() {
        println!("Failed to store data.");
        return;
    }

    let stores = outcome
        .closest
        .iter()
        .map(|contact| {
            let contact = *contact;
            let value = value.clone();
            async move { rpc.store(contact, key, value).await.is_ok() }
        })
        .collect::<Vec<_>>();
    let results = join_all(stores).await;
    let successes = results.into_iter().filter(|ok| *ok).count();

    if successes > outcome.closest.len() / 2 {
        println!("Data stored successfully. Hash: {}", key.as_hex());
    } else {
        println!("Failed to store data.");
    }
}

async fn handle_get(
    handle: &actor::ActorHandle,
    rpc: &UdpRpcClient,
    me_id: Id,
    arg: &str,
    config: &RoutingConfig,
) {
    if arg.is_empty() {
        println!("Error: No argument provided for GET.");
        return;
    }
    let key = match Id::parse(arg) {
        Ok(key) => key,
        Err(_) => {
            println!("Error: Invalid Kademlia ID length.");
            return;
        }
    };

    let outcome = lookup(handle, rpc, me_id, key, LookupMode::Value, config).await;
    match outcome.value {
        Some((value, holder)) => {
            println!("Data found on contact: {holder}");
            println!("{}", String::from_utf8_lossy(&value));
        }
        None => println!("Data not found."),
    }
}

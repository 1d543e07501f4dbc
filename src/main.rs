mod cli;
mod dns;
mod error;
mod icmp;
mod probe;
mod session;
mod stats;
mod utils;

use icmp::IcmpSocket;
use session::{PingSession, SessionOptions};
use stats::SessionStats;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Enable debug logging if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }

    let args = cli::parse_args();

    if let Err(e) = utils::validate_ping_params(args.size, args.timeout, args.interval, args.ttl) {
        utils::exit_with_error(&e.to_string(), 1);
    }

    // Resolve once; nothing is sent for an unknown host
    let target_ip = match dns::resolve_hostname(&args.target).await {
        Ok(ip) => ip,
        Err(e) => utils::exit_with_error(&e.to_string(), 1),
    };

    let socket = match IcmpSocket::open() {
        Ok(socket) => socket,
        Err(e) => utils::exit_with_error(&e.to_string(), 1),
    };

    if let Some(ttl) = args.ttl {
        if let Err(e) = socket.set_ttl(ttl) {
            utils::exit_with_error(&e.to_string(), 1);
        }
    }

    if let Some(source_addr) = args.source_address {
        if let Err(e) = socket.bind_to_source(source_addr) {
            utils::exit_with_error(&format!("Cannot bind to source address {}: {}", source_addr, e), 1);
        }
    }

    let payload_size = args.size as usize;
    let options = SessionOptions {
        identifier: utils::generate_identifier(),
        payload_size,
        timeout: Duration::from_millis(u64::from(args.timeout)),
        strict: args.strict,
    };
    log::debug!("Session options: {:?}", options);

    println!("{}", stats::format_header(&args.target, target_ip, payload_size));

    let shutdown = utils::setup_signal_handler();
    let session = PingSession::new(socket, target_ip, options);
    let cadence = Duration::from_millis(u64::from(args.interval));
    let mut stdout = std::io::stdout();

    if let Err(e) = probe::run(
        session,
        SessionStats::new(&args.target, target_ip),
        cadence,
        &mut stdout,
        shutdown,
    )
    .await
    {
        utils::exit_with_error(&e.to_string(), 1);
    }
}

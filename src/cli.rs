use clap::{Arg, ArgAction, ArgMatches, Command};
use std::net::Ipv4Addr;

use crate::icmp::DEFAULT_PAYLOAD_SIZE;

pub const DEFAULT_TIMEOUT_MS: u32 = 1000;
pub const DEFAULT_INTERVAL_MS: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct PingArgs {
    pub target: String,
    pub size: u32,
    pub timeout: u32,
    pub interval: u32,
    pub ttl: Option<u32>,
    pub source_address: Option<Ipv4Addr>,
    pub strict: bool,
}

impl Default for PingArgs {
    fn default() -> Self {
        Self {
            target: String::new(),
            size: DEFAULT_PAYLOAD_SIZE as u32,
            timeout: DEFAULT_TIMEOUT_MS,
            interval: DEFAULT_INTERVAL_MS,
            ttl: None,
            source_address: None,
            strict: false,
        }
    }
}

pub fn build_cli() -> Command {
    Command::new("echoping")
        .version("0.1.0")
        .about("Send ICMP echo requests to a host until interrupted and report latency statistics")
        .arg(
            Arg::new("target")
                .help("Target hostname or IPv4 address")
                .required(true)
                .index(1)
        )
        .arg(
            Arg::new("size")
                .short('s')
                .long("size")
                .help("Number of data bytes to send")
                .value_name("bytes")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("timeout")
                .short('w')
                .long("timeout")
                .help("Timeout in milliseconds to wait for each reply")
                .value_name("ms")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .help("Target spacing in milliseconds between successive probes")
                .value_name("ms")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("ttl")
                .short('t')
                .long("ttl")
                .help("Time To Live")
                .value_name("TTL")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("source_address")
                .short('S')
                .long("source")
                .help("Source address to use")
                .value_name("srcaddr")
                .value_parser(clap::value_parser!(Ipv4Addr))
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Only accept well-formed echo replies with valid checksums")
                .action(ArgAction::SetTrue)
        )
}

/// Parse the process arguments; clap prints usage and exits on error.
pub fn parse_args() -> PingArgs {
    args_from_matches(&build_cli().get_matches())
}

fn args_from_matches(matches: &ArgMatches) -> PingArgs {
    let mut args = PingArgs::default();

    if let Some(target) = matches.get_one::<String>("target") {
        args.target = target.clone();
    }
    args.strict = matches.get_flag("strict");

    if let Some(size) = matches.get_one::<u32>("size") {
        args.size = *size;
    }

    if let Some(timeout) = matches.get_one::<u32>("timeout") {
        args.timeout = *timeout;
    }

    if let Some(interval) = matches.get_one::<u32>("interval") {
        args.interval = *interval;
    }

    args.ttl = matches.get_one::<u32>("ttl").copied();
    args.source_address = matches.get_one::<Ipv4Addr>("source_address").copied();

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> anyhow::Result<PingArgs> {
        let matches = build_cli().try_get_matches_from(argv)?;
        Ok(args_from_matches(&matches))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["echoping", "example.com"]).unwrap();
        assert_eq!(
            args,
            PingArgs {
                target: "example.com".to_string(),
                ..PingArgs::default()
            }
        );
        assert_eq!(args.size, 56);
        assert_eq!(args.timeout, 1000);
        assert_eq!(args.interval, 1000);
    }

    #[test]
    fn test_all_options() {
        let args = parse(&[
            "echoping", "-s", "100", "-w", "250", "-i", "500", "-t", "32", "-S", "10.0.0.5", "--strict",
            "192.0.2.1",
        ])
        .unwrap();
        assert_eq!(args.target, "192.0.2.1");
        assert_eq!(args.size, 100);
        assert_eq!(args.timeout, 250);
        assert_eq!(args.interval, 500);
        assert_eq!(args.ttl, Some(32));
        assert_eq!(args.source_address, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert!(args.strict);
    }

    #[test]
    fn test_missing_target() {
        assert!(parse(&["echoping"]).is_err());
    }

    #[test]
    fn test_ipv6_source_rejected() {
        assert!(parse(&["echoping", "-S", "::1", "example.com"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        build_cli().debug_assert();
    }
}

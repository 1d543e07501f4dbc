use std::process;
use std::time::Duration;

use crate::probe::{self, Shutdown};

/// Largest payload that still fits an IPv4 datagram with IP and ICMP headers.
pub const MAX_PAYLOAD_SIZE: u32 = 65507;

/// ICMP identifier for this process: its pid truncated to 16 bits.
pub fn generate_identifier() -> u16 {
    mask_identifier(process::id())
}

fn mask_identifier(pid: u32) -> u16 {
    (pid & 0xFFFF) as u16
}

/// Milliseconds with sub-millisecond precision.
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Print error message and exit with error code
pub fn exit_with_error(message: &str, code: i32) -> ! {
    eprintln!("echoping: {}", message);
    process::exit(code);
}

pub fn validate_ping_params(size: u32, timeout: u32, interval: u32, ttl: Option<u32>) -> anyhow::Result<()> {
    if size > MAX_PAYLOAD_SIZE {
        return Err(anyhow::anyhow!(
            "Packet size too large, maximum is {} bytes",
            MAX_PAYLOAD_SIZE
        ));
    }

    if timeout == 0 {
        return Err(anyhow::anyhow!("Timeout must be greater than 0"));
    }

    if interval == 0 {
        return Err(anyhow::anyhow!("Interval must be greater than 0"));
    }

    if let Some(ttl) = ttl {
        if ttl == 0 || ttl > 255 {
            return Err(anyhow::anyhow!("TTL must be in the range 1-255"));
        }
    }

    Ok(())
}

/// Handle Ctrl+C signal for graceful shutdown
pub fn setup_signal_handler() -> Shutdown {
    let (trigger, shutdown) = probe::shutdown_channel();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => trigger.trigger(),
            Err(e) => log::error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    shutdown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_masking() {
        assert_eq!(mask_identifier(0x0001_2345), 0x2345);
        assert_eq!(mask_identifier(0xFFFF), 0xFFFF);
        assert_eq!(generate_identifier(), generate_identifier());
    }

    #[test]
    fn test_parameter_validation() {
        assert!(validate_ping_params(56, 1000, 1000, Some(64)).is_ok());
        assert!(validate_ping_params(MAX_PAYLOAD_SIZE, 1, 1, None).is_ok());

        // Invalid size
        assert!(validate_ping_params(MAX_PAYLOAD_SIZE + 1, 1000, 1000, None).is_err());

        // Invalid timeout
        assert!(validate_ping_params(56, 0, 1000, None).is_err());

        // Invalid interval
        assert!(validate_ping_params(56, 1000, 0, None).is_err());

        // Invalid TTL
        assert!(validate_ping_params(56, 1000, 1000, Some(0)).is_err());
        assert!(validate_ping_params(56, 1000, 1000, Some(256)).is_err());
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_millis(5)), 5.0);
        assert_eq!(duration_ms(Duration::from_micros(1500)), 1.5);
        assert_eq!(duration_ms(Duration::ZERO), 0.0);
    }
}

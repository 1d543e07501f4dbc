use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::session::Attempt;
use crate::utils::duration_ms;

/// Running totals for one probing session. Delays are in milliseconds.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub target_hostname: String,
    pub resolved_address: Ipv4Addr,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub min_delay: f64,
    pub max_delay: f64,
    pub sum_delay: f64,
    pub delay_samples: Vec<f64>,
    pub start_time: Instant,
    pub end_time: Option<Instant>,
}

impl SessionStats {
    pub fn new(target_hostname: &str, resolved_address: Ipv4Addr) -> Self {
        Self {
            target_hostname: target_hostname.to_string(),
            resolved_address,
            packets_sent: 0,
            packets_received: 0,
            min_delay: f64::INFINITY,
            max_delay: 0.0,
            sum_delay: 0.0,
            delay_samples: Vec::new(),
            start_time: Instant::now(),
            end_time: None,
        }
    }

    /// Fraction of sent probes without a matching reply; zero before any send.
    pub fn loss_fraction(&self) -> f64 {
        if self.packets_sent == 0 {
            return 0.0;
        }
        (self.packets_sent - self.packets_received) as f64 / self.packets_sent as f64
    }

    pub fn mean_delay(&self) -> Option<f64> {
        if self.packets_received == 0 {
            return None;
        }
        Some(self.sum_delay / self.packets_received as f64)
    }

    /// Population standard deviation of the delay samples.
    pub fn std_deviation(&self) -> Option<f64> {
        let mean = self.mean_delay()?;
        let variance = self
            .delay_samples
            .iter()
            .map(|sample| (sample - mean).powi(2))
            .sum::<f64>()
            / self.delay_samples.len() as f64;
        Some(variance.sqrt())
    }
}

/// Owns a session's [`SessionStats`] and is the only thing that mutates it.
#[derive(Debug)]
pub struct StatsAggregator {
    stats: SessionStats,
    cadence: Duration,
}

impl StatsAggregator {
    pub fn new(stats: SessionStats, cadence: Duration) -> Self {
        Self { stats, cadence }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn into_stats(self) -> SessionStats {
        self.stats
    }

    pub fn record(&mut self, attempt: &Attempt) {
        self.stats.packets_sent += 1;

        if let Attempt::Replied { delay, .. } = attempt {
            let delay = duration_ms(*delay);
            self.stats.delay_samples.push(delay);
            self.stats.packets_received += 1;
            self.stats.sum_delay += delay;
            self.stats.min_delay = self.stats.min_delay.min(delay);
            self.stats.max_delay = self.stats.max_delay.max(delay);
        }
    }

    pub fn finish(&mut self, end_time: Instant) {
        self.stats.end_time = Some(end_time);
    }

    /// Wall-clock session time plus the paced gaps between probes.
    pub fn total_elapsed_ms(&self) -> u128 {
        let end = self.stats.end_time.unwrap_or_else(Instant::now);
        let wall = end.saturating_duration_since(self.stats.start_time).as_millis();
        let paced = u128::from(self.stats.packets_sent.saturating_sub(1)) * self.cadence.as_millis();
        wall + paced
    }

    pub fn render(&self) -> String {
        let stats = &self.stats;

        let mut summary = format!(
            "\n---- {} PING Statistics ----\n{} packets transmitted, {} packets received, {:.1}% packet loss, time {}ms\n",
            stats.target_hostname,
            stats.packets_sent,
            stats.packets_received,
            100.0 * stats.loss_fraction(),
            self.total_elapsed_ms()
        );

        if let (Some(mean), Some(std_dev)) = (stats.mean_delay(), stats.std_deviation()) {
            summary.push_str(&format!(
                "Round-Trip Times:\nMinimum = {:.3} ms\tMaximum = {:.3} ms\nAverage = {:.3} ms\tStandard Deviation = {:.3} ms\n",
                stats.min_delay, stats.max_delay, mean, std_dev
            ));
        }

        summary
    }
}

pub fn format_header(target: &str, resolved_ip: Ipv4Addr, payload_size: usize) -> String {
    format!("\nPING {} ({}) with {} data bytes:", target, resolved_ip, payload_size)
}

/// The console line for one attempt.
pub fn format_attempt(attempt: &Attempt) -> String {
    match attempt {
        Attempt::Replied { delay, reply } => format!(
            "{} bytes from {}: icmp_seq={} ttl={} time={:.3} ms",
            reply.payload_size,
            reply.source(),
            reply.sequence(),
            reply.ttl(),
            duration_ms(*delay)
        ),
        Attempt::TimedOut => "Request timed out.".to_string(),
        Attempt::SendFailed(e) => format!("General failure ({})", e),
    }
}

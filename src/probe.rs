use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::icmp::Transport;
use crate::session::PingSession;
use crate::stats::{self, SessionStats, StatsAggregator};

/// Sending half of the cancellation signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the probe loop between attempts and while it sleeps.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested. Never resolves if every
    /// trigger is dropped without firing.
    pub async fn requested(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// How long to wait before the next probe so probes start roughly one
/// cadence apart.
pub fn pause_after(cadence: Duration, delay: Option<Duration>) -> Duration {
    cadence.saturating_sub(delay.unwrap_or(Duration::ZERO))
}

/// Probe until `shutdown` fires, writing one line per attempt and the summary
/// to `out`. Returns the final statistics.
pub async fn run<T, W>(
    mut session: PingSession<T>,
    session_stats: SessionStats,
    cadence: Duration,
    out: &mut W,
    mut shutdown: Shutdown,
) -> anyhow::Result<SessionStats>
where
    T: Transport + Send + 'static,
    W: Write,
{
    let mut aggregator = StatsAggregator::new(session_stats, cadence);
    let mut sequence: u16 = 1;

    log::debug!(
        "Probing {} ({}) every {:?}",
        aggregator.stats().target_hostname,
        aggregator.stats().resolved_address,
        cadence
    );

    loop {
        if shutdown.is_requested() {
            break;
        }

        // The receive blocks; keep it off the async workers
        let (returned, attempt) = tokio::task::spawn_blocking(move || {
            let attempt = session.run_one(sequence);
            (session, attempt)
        })
        .await?;
        session = returned;

        aggregator.record(&attempt);
        writeln!(out, "{}", stats::format_attempt(&attempt))?;
        out.flush()?;

        sequence = sequence.wrapping_add(1);

        tokio::select! {
            _ = sleep(pause_after(cadence, attempt.delay())) => {}
            _ = shutdown.requested() => break,
        }
    }

    aggregator.finish(Instant::now());
    write!(out, "{}", aggregator.render())?;
    out.flush()?;

    Ok(aggregator.into_stats())
}

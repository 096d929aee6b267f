//! Periodic recompute timer

use crate::session::{Inner, RiskSession};
use crate::state::{Phase, RecomputeOutcome};
use std::sync::Weak;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Spawn the auto-refresh loop for a session
///
/// The task only holds a weak reference between ticks and exits once the
/// session is gone, auto refresh is off or the portfolio is cleared. Ticks
/// that land while a pass is running are skipped.
/// Returns `None` outside a tokio runtime.
pub(crate) fn spawn_timer(weak: Weak<Inner>, period: Duration) -> Option<JoinHandle<()>> {
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No tokio runtime, auto refresh disabled");
            return None;
        }
    };

    info!(interval_ms = period.as_millis() as u64, "Starting auto refresh timer");

    Some(handle.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(session) = RiskSession::upgrade(&weak) else {
                debug!("Session dropped, stopping auto refresh");
                break;
            };
            if !session.wants_tick() {
                debug!("Auto refresh no longer wanted, stopping timer");
                break;
            }
            if session.phase() == Phase::Calculating {
                debug!("Pass still running, skipping tick");
                continue;
            }

            match session.refresh().await {
                RecomputeOutcome::Failed(e) => warn!(error = %e, "Scheduled recompute failed"),
                outcome => debug!(?outcome, "Scheduled recompute"),
            }
        }
    }))
}

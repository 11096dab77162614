//! Background workers.
//!
//! Each worker ticks on a fixed interval, logs and swallows the errors of an
//! iteration, and exits once the shutdown token is cancelled. A tick that
//! overruns delays the next one instead of bursting.

use std::{future::Future, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Pending transactions to alerts, then webhook retries
pub mod alert_dispatcher;
/// Mock Open Finance and Itaú polling
pub mod pix_polling;

/// Spawn every worker on the current runtime.
pub fn spawn_all(state: AppState, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
    let alert_interval = state.config.alert_dispatch_interval();
    let poll_interval = state.config.pix_poll_interval();

    let dispatcher_state = state.clone();
    let polling_state = state;

    vec![
        tokio::spawn(run_periodically(
            "alert_dispatcher",
            alert_interval,
            shutdown.clone(),
            move || {
                let state = dispatcher_state.clone();
                async move { alert_dispatcher::run_once(&state).await }
            },
        )),
        tokio::spawn(run_periodically(
            "pix_polling",
            poll_interval,
            shutdown,
            move || {
                let state = polling_state.clone();
                async move { pix_polling::run_once(&state).await }
            },
        )),
    ]
}

/// Call `iteration` every `period` until `shutdown` is cancelled.
///
/// The first iteration runs immediately.
pub async fn run_periodically<F, Fut>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut iteration: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(worker = name, period_secs = period.as_secs(), "Worker started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let run = iteration();
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = run => {
                if let Err(e) = result {
                    tracing::error!(worker = name, error = %e, "Worker iteration failed");
                }
            }
        }
    }

    tracing::info!(worker = name, "Worker stopped");
}

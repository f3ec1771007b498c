use std::time::Duration;

use tokio::select;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// How often a lobby re-renders and broadcasts its state.
pub const TICK_INTERVAL: Duration = Duration::from_millis(750);

pub type ShutdownSender = oneshot::Sender<()>;
pub type ShutdownReceiver = oneshot::Receiver<()>;

/// A periodic task with a single-shot stop signal.
///
/// [`LivenessLoop::stop`] consumes the loop, so it can only be signalled once, and
/// it does not return until the task has exited.
#[derive(Debug)]
pub struct LivenessLoop {
    shutdown: ShutdownSender,
    task: JoinHandle<()>,
}

impl LivenessLoop {
    /// Spawn onto the current tokio runtime. The first tick fires one `period` from now.
    pub fn spawn<F>(period: Duration, on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(period, on_tick, shutdown_rx));
        Self { shutdown, task }
    }

    pub async fn stop(self) {
        // The task may already be gone if it panicked; joining reports that below
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Liveness loop ended abnormally: {e}");
        }
    }
}

async fn run<F: FnMut()>(period: Duration, mut on_tick: F, mut shutdown: ShutdownReceiver) {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            biased;
            // A dropped sender stops the loop too
            _ = &mut shutdown => break,
            _ = ticker.tick() => on_tick(),
        }
    }
    tracing::debug!("Liveness loop stopped");
}

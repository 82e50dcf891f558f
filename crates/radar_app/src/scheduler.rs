use std::io;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Timelike;
use radar_engine::{RotationEvent, RotationHandle, Trigger};
use radar_logging::{radar_error, radar_info, radar_warn};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(60 * 60);
const EVENT_POLL: Duration = Duration::from_millis(500);

/// Rotates once and reports whether it worked.
pub fn run_once(handle: RotationHandle) -> ExitCode {
    handle.trigger(Trigger::Manual);
    let outcome = handle.recv();
    handle.shutdown();
    match outcome {
        Some(event) => {
            if report(event) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            radar_error!("rotation worker stopped before reporting");
            ExitCode::FAILURE
        }
    }
}

/// Sends an hourly tick and a manual trigger on SIGUSR2 until Ctrl-C, then
/// waits for queued rotations to finish.
pub fn run_forever(handle: RotationHandle) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            radar_error!("could not start the scheduler: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(dispatch(&handle));
    radar_info!("waiting for queued rotations before exiting");
    for event in handle.shutdown() {
        report(event);
    }
    match result {
        Ok(()) => {
            radar_info!("done with graceful shutdown");
            ExitCode::SUCCESS
        }
        Err(err) => {
            radar_error!("scheduler stopped: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(handle: &RotationHandle) -> io::Result<()> {
    let mut hourly = interval_at(Instant::now() + TICK, TICK);
    hourly.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poll = interval(EVENT_POLL);
    let mut manual = ManualTrigger::new()?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = hourly.tick() => {
                handle.trigger(Trigger::Tick { hour: chrono::Local::now().hour() });
            }
            Some(()) = manual.recv() => {
                radar_info!("received SIGUSR2, rotating now");
                handle.trigger(Trigger::Manual);
            }
            _ = poll.tick() => {
                while let Some(event) = handle.try_recv() {
                    report(event);
                }
            }
            signal = &mut shutdown => {
                signal?;
                radar_info!("received interrupt, no longer accepting triggers");
                return Ok(());
            }
        }
    }
}

/// Logs an outcome; `false` when the rotation failed.
fn report(event: RotationEvent) -> bool {
    match event {
        RotationEvent::Completed(result) if result.is_partial() => {
            radar_warn!(
                "generated new radar issue {} but the previous one is still open",
                result.new_issue_url
            );
            true
        }
        RotationEvent::Completed(result) => {
            radar_info!("generated new radar issue: {}", result.new_issue_url);
            true
        }
        RotationEvent::Failed(message) => {
            radar_error!("couldn't generate new radar issue: {message}");
            false
        }
        RotationEvent::Skipped => true,
    }
}

#[cfg(unix)]
struct ManualTrigger(tokio::signal::unix::Signal);

#[cfg(unix)]
impl ManualTrigger {
    fn new() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self(signal(SignalKind::user_defined2())?))
    }

    async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

#[cfg(not(unix))]
struct ManualTrigger;

#[cfg(not(unix))]
impl ManualTrigger {
    fn new() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

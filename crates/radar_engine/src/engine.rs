use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use radar_core::RotationResult;
use radar_logging::{radar_debug, radar_info};

use crate::rotation::RotationController;

/// Why a rotation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic wake-up carrying the current local hour (0-23).
    Tick { hour: u32 },
    /// Explicit request; always rotates.
    Manual,
}

#[derive(Debug)]
pub enum RotationEvent {
    Completed(RotationResult),
    Failed(String),
    /// A tick arrived outside the configured hour.
    Skipped,
}

enum RotationCommand {
    Run(Trigger),
    Shutdown,
}

/// Front of the single rotation worker. Triggers queue up and run one after
/// another, so two rotations never overlap.
pub struct RotationHandle {
    cmd_tx: mpsc::Sender<RotationCommand>,
    event_rx: mpsc::Receiver<RotationEvent>,
    worker: Option<JoinHandle<()>>,
}

impl RotationHandle {
    /// Starts the worker. `hour` is the local hour at which ticks rotate;
    /// `mention` is passed to every rendered body.
    pub fn new(controller: RotationController, hour: u32, mention: String) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let worker = thread::Builder::new()
            .name("radar-rotation".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let trigger = match command {
                        RotationCommand::Run(trigger) => trigger,
                        RotationCommand::Shutdown => break,
                    };
                    let event = runtime.block_on(handle_trigger(
                        &controller,
                        trigger,
                        hour,
                        &mention,
                    ));
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
                radar_debug!("rotation worker stopped");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    pub fn trigger(&self, trigger: Trigger) {
        let _ = self.cmd_tx.send(RotationCommand::Run(trigger));
    }

    pub fn try_recv(&self) -> Option<RotationEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next outcome; `None` once the worker has stopped.
    pub fn recv(&self) -> Option<RotationEvent> {
        self.event_rx.recv().ok()
    }

    /// Lets queued triggers finish, then stops the worker and waits for it.
    /// Returns the outcomes nobody has received yet.
    pub fn shutdown(mut self) -> Vec<RotationEvent> {
        let _ = self.cmd_tx.send(RotationCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.event_rx.try_iter().collect()
    }
}

async fn handle_trigger(
    controller: &RotationController,
    trigger: Trigger,
    hour: u32,
    mention: &str,
) -> RotationEvent {
    if let Trigger::Tick { hour: now } = trigger {
        if now != hour {
            radar_debug!("not time to rotate: hour {now:02} != {hour:02}");
            return RotationEvent::Skipped;
        }
    }

    radar_info!("{}: rotating ({trigger:?})", controller.settings().repo);
    match controller.run_rotation(mention).await {
        Ok(result) => RotationEvent::Completed(result),
        Err(err) => RotationEvent::Failed(err.to_string()),
    }
}

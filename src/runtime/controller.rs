use anyhow::{anyhow, bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::UiEventBus;

use super::context::GestureRuntimeContext;
use super::loop_worker::{frame_loop, LoopConfig, RuntimeCommand};
use super::source::LandmarkSource;

/// Owns the frame-loop task. At most one loop runs at a time.
pub struct FrameLoopController {
    bus: UiEventBus,
    handle: Option<JoinHandle<GestureRuntimeContext>>,
    cancel_token: Option<CancellationToken>,
    command_tx: Option<mpsc::UnboundedSender<RuntimeCommand>>,
}

impl FrameLoopController {
    pub fn new(bus: UiEventBus) -> Self {
        Self {
            bus,
            handle: None,
            cancel_token: None,
            command_tx: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn start<S: LandmarkSource>(
        &mut self,
        source: S,
        ctx: GestureRuntimeContext,
        config: LoopConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("frame loop already active");
        }

        let cancel_token = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        info!("starting frame loop (poll every {:?})", config.poll_interval);
        let handle = tokio::spawn(frame_loop(
            source,
            ctx,
            self.bus.clone(),
            command_rx,
            config,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.command_tx = Some(command_tx);
        Ok(())
    }

    pub fn send(&self, command: RuntimeCommand) -> Result<()> {
        let tx = self
            .command_tx
            .as_ref()
            .ok_or_else(|| anyhow!("frame loop not running"))?;
        tx.send(command)
            .map_err(|_| anyhow!("frame loop has exited"))
    }

    /// Token that stops the running loop when cancelled.
    pub fn cancel_handle(&self) -> Option<CancellationToken> {
        self.cancel_token.clone()
    }

    /// Cancels the loop and returns its final context, if one was running.
    pub async fn stop(&mut self) -> Result<Option<GestureRuntimeContext>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.join().await
    }

    /// Waits for the loop to finish on its own (stream end or external
    /// cancellation).
    pub async fn join(&mut self) -> Result<Option<GestureRuntimeContext>> {
        self.command_tx = None;
        match self.handle.take() {
            Some(handle) => {
                let ctx = handle.await.context("frame loop task failed to join")?;
                self.cancel_token = None;
                Ok(Some(ctx))
            }
            None => Ok(None),
        }
    }
}

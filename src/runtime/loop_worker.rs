use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dispatch::{GestureMapping, UiEventBus};
use crate::error::PipelineError;
use crate::gesture::Viewport;
use crate::settings::PipelineSettings;

use super::context::{GestureRuntimeContext, View};
use super::pipeline::process_frame;
use super::source::LandmarkSource;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Changes coming from outside the frame loop. Applied between frames so the
/// loop stays the only writer of the runtime context.
#[derive(Debug, Clone)]
pub enum RuntimeCommand {
    SetViewport(Viewport),
    SetView(View),
    SetVisibility(bool),
    Navigated,
    SetMapping(GestureMapping),
    SetDetectionEnabled(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    pub poll_interval: Duration,
    pub detect_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&PipelineSettings> for LoopConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            detect_timeout: settings.detect_timeout(),
            retry_attempts: settings.classifier_retry_attempts.max(1),
            retry_delay: settings.classifier_retry_delay(),
        }
    }
}

/// Runs until the source ends or the token is cancelled, then hands the
/// context back.
pub async fn frame_loop<S: LandmarkSource>(
    mut source: S,
    mut ctx: GestureRuntimeContext,
    bus: UiEventBus,
    mut commands: mpsc::UnboundedReceiver<RuntimeCommand>,
    config: LoopConfig,
    cancel_token: CancellationToken,
) -> GestureRuntimeContext {
    if let Err(err) = initialize_with_retry(&mut source, &config, &cancel_token).await {
        log_error!("{err}; gesture control stays idle");
        cancel_token.cancelled().await;
        ctx.shutdown();
        return ctx;
    }

    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    log_info!("frame loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match tokio::time::timeout(config.detect_timeout, source.detect()).await {
                    Ok(Ok(Some(detections))) => {
                        for event in process_frame(&mut ctx, &detections, Instant::now().into_std()) {
                            bus.publish(event);
                        }
                    }
                    Ok(Ok(None)) => {
                        log_info!("landmark stream ended");
                        break;
                    }
                    Ok(Err(err)) => log_error!("landmark detection failed: {err:?}"),
                    Err(_) => log_warn!("landmark detection timeout (> {}ms)", config.detect_timeout.as_millis()),
                }
            }
            Some(command) = commands.recv() => apply_command(&mut ctx, command),
            _ = cancel_token.cancelled() => {
                log_info!("frame loop shutting down");
                break;
            }
        }
    }

    ctx.shutdown();
    ctx
}

async fn initialize_with_retry<S: LandmarkSource>(
    source: &mut S,
    config: &LoopConfig,
    cancel_token: &CancellationToken,
) -> Result<(), PipelineError> {
    let mut last_error = String::new();
    for attempt in 1..=config.retry_attempts {
        match source.initialize().await {
            Ok(()) => return Ok(()),
            Err(err) => {
                log_warn!("classifier init attempt {attempt}/{} failed: {err:#}", config.retry_attempts);
                last_error = format!("{err:#}");
            }
        }
        if attempt < config.retry_attempts {
            tokio::select! {
                _ = tokio::time::sleep(config.retry_delay) => {}
                _ = cancel_token.cancelled() => break,
            }
        }
    }
    Err(PipelineError::ClassifierUnavailable {
        attempts: config.retry_attempts,
        reason: last_error,
    })
}

fn apply_command(ctx: &mut GestureRuntimeContext, command: RuntimeCommand) {
    match command {
        RuntimeCommand::SetViewport(viewport) => ctx.set_viewport(viewport),
        RuntimeCommand::SetView(view) => ctx.set_view(view),
        RuntimeCommand::SetVisibility(visible) => ctx.set_visibility(visible),
        RuntimeCommand::Navigated => ctx.on_navigation(),
        RuntimeCommand::SetMapping(mapping) => {
            ctx.mapping = mapping;
            ctx.stabilizer.reset();
        }
        RuntimeCommand::SetDetectionEnabled(enabled) => ctx.detection_enabled = enabled,
    }
}

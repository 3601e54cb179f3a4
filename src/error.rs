use thiserror::Error;

/// Failures inside the gesture core. None of these stop the frame loop: each
/// degrades to ignoring a frame's gesture or leaving an interaction mode.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("hand has {found} landmarks, need 21")]
    InsufficientLandmarks { found: usize },

    #[error("landmark classifier unavailable after {attempts} attempts: {reason}")]
    ClassifierUnavailable { attempts: u32, reason: String },

    #[error("draw mode active outside the presenting view (now in '{view}')")]
    StaleContext { view: String },
}

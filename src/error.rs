use thiserror::Error;

use crate::api::DirtyFlag;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A mutation name has no entry in the chart's effect table.
    #[error("unknown mutation `{name}`: no entry in the mutation effect table")]
    UnknownMutation { name: String },

    /// A step table lets `step` clear or cascade `flag`, which guards an
    /// earlier-ranked step (`guarded_by`).
    #[error("step `{step}` reaches flag {flag:?} guarded by earlier step `{guarded_by}`")]
    Cycle {
        step: String,
        flag: DirtyFlag,
        guarded_by: String,
    },

    #[error("scheduler invariant violated: {0}")]
    RuntimeInvariant(String),

    /// Failure reported by a collaborator while running a step body.
    #[error("step `{step}` failed: {message}")]
    Collaborator { step: String, message: String },
}

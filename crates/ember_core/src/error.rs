//! Error types for scene setup and rendering.

use thiserror::Error;

/// Errors surfaced before or during a render call.
///
/// Recoverable per-path conditions (ray miss, missing material, occluded
/// light sample, below-surface sample) are ordinary control flow in the
/// integrator, not errors.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No camera node was registered before `render` was called.
    #[error("no camera in scene")]
    NoCamera,

    /// A node failed during its pre-render pass.
    #[error("node `{node}` failed during pre-render: {cause}")]
    Node {
        node: String,
        cause: anyhow::Error,
    },

    /// Node registration kept producing new nodes without converging.
    #[error("pre-render did not reach a fixpoint (node registration cycle?)")]
    PreRenderCycle,
}

impl RenderError {
    /// Wrap a collaborator failure with the name of the node it came from.
    pub fn node(node: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::Node {
            node: node.into(),
            cause,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

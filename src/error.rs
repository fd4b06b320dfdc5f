use thiserror::Error;

/// Top-level failures. Per-ray numeric anomalies never surface here — they
/// are absorbed during shading and encoding — but configuration and I/O
/// problems abort the render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("render cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

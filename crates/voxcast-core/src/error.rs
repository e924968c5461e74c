use thiserror::Error;

/// Errors that can occur while setting up or refreshing the cascade volumes.
///
/// An invalid grid configuration is deliberately absent: it makes the
/// pipeline idle instead of failing.
#[derive(Debug, Error)]
pub enum VoxcastError {
    #[error("Failed to parse settings RON: {0}")]
    ConfigParse(String),

    #[error("Failed to read settings file: {0}")]
    ConfigIo(String),

    #[error("GPU allocation failed for {label}: {reason}")]
    AllocationFailed { label: String, reason: String },

    #[error("Kernel `{0}` not found in its shader source")]
    MissingKernel(String),

    #[error("Shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    #[error("Volume read-back failed: {0}")]
    ReadbackFailed(String),

    #[error("GPU adapter not found: {0}")]
    AdapterNotFound(String),

    #[error("Failed to request GPU device: {0}")]
    DeviceRequestFailed(String),
}

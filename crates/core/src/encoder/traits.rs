//! Trait definitions for the encoder module.

use async_trait::async_trait;
use std::path::Path;

use super::error::{EncodeError, ProbeError, ToolError};
use super::probe::ProbeResult;
use super::progress::ProgressHandle;

/// Inspects an input file before encoding.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Reports the input's streams.
    async fn probe(&self, input: &Path) -> Result<ProbeResult, ProbeError>;

    /// Version of the underlying tool, if it prints one.
    ///
    /// Fails with [`ToolError::Unavailable`] when the binary is missing.
    async fn version(&self) -> Result<Option<String>, ToolError>;
}

/// Runs one encode to completion.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Encodes `input` to `output` with the given option arguments.
    ///
    /// Progress is written to `progress` as the encode runs. Dropping the
    /// returned future stops the encode.
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        args: &[String],
        progress: &ProgressHandle,
    ) -> Result<(), EncodeError>;

    /// Version of the underlying tool, if it prints one.
    async fn version(&self) -> Result<Option<String>, ToolError>;
}

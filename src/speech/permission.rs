use crate::error::Result;
use async_trait::async_trait;

/// Grants access to the microphone before a session starts.
#[async_trait]
pub trait MicrophonePermission: Send + Sync {
    /// Ask for access. Returns `PermissionDenied` when refused.
    async fn request(&self) -> Result<()>;
}

/// Permission source for environments without a prompt (terminals).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl MicrophonePermission for AlwaysGranted {
    async fn request(&self) -> Result<()> {
        Ok(())
    }
}

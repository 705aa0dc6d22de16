// Error taxonomy for the engine core
//
// Every failure is tagged with an ErrorKind so the top-level handler can
// turn it into a process exit code without string matching.

use ash::vk;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`RenderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A layer, extension, feature, device or queue family is missing.
    CapabilityMissing,
    /// The driver rejected an object creation.
    CreationFailed,
    /// A file could not be read or is not a usable blob.
    IoFailed,
    /// A steady-state acquire/submit/present step failed.
    FrameFailed,
}

impl ErrorKind {
    /// Process exit code reported for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::CapabilityMissing => 2,
            ErrorKind::CreationFailed => 3,
            ErrorKind::IoFailed => 4,
            ErrorKind::FrameFailed => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Required layer not supported: {0}")]
    MissingLayer(String),

    #[error("Required extension not supported: {0}")]
    MissingExtension(String),

    #[error("Failed to find a suitable GPU")]
    NoSuitableDevice,

    #[error("Could not find a queue for {0}")]
    NoQueueFamily(&'static str),

    #[error("Failed to load Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("Failed to {what}: {source}")]
    Creation {
        what: &'static str,
        #[source]
        source: vk::Result,
    },

    #[error("Window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("Could not open file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid shader blob {}: {reason}", path.display())]
    InvalidShader { path: PathBuf, reason: String },

    #[error("Frame step failed ({what}): {source}")]
    Frame {
        what: &'static str,
        #[source]
        source: vk::Result,
    },

    #[error("Timed out after {0} ns waiting for frame completion")]
    FrameTimeout(u64),

    #[error("Command buffer is still recording")]
    StillRecording,
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::MissingLayer(_)
            | RenderError::MissingExtension(_)
            | RenderError::NoSuitableDevice
            | RenderError::NoQueueFamily(_) => ErrorKind::CapabilityMissing,
            RenderError::Loading(_)
            | RenderError::Creation { .. }
            | RenderError::WindowHandle(_) => ErrorKind::CreationFailed,
            RenderError::Io { .. } | RenderError::InvalidShader { .. } => ErrorKind::IoFailed,
            RenderError::Frame { .. }
            | RenderError::FrameTimeout(_)
            | RenderError::StillRecording => ErrorKind::FrameFailed,
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Attach a description to a raw `VkResult`, the way `anyhow::Context` does.
pub trait VkResultExt<T> {
    /// Startup object creation; failures are fatal.
    fn creating(self, what: &'static str) -> Result<T>;
    /// Per-frame device work.
    fn during_frame(self, what: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for ash::prelude::VkResult<T> {
    fn creating(self, what: &'static str) -> Result<T> {
        self.map_err(|source| RenderError::Creation { what, source })
    }

    fn during_frame(self, what: &'static str) -> Result<T> {
        self.map_err(|source| RenderError::Frame { what, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_errors_exit_with_capability_code() {
        let err = RenderError::NoSuitableDevice;
        assert_eq!(err.kind(), ErrorKind::CapabilityMissing);
        assert_eq!(err.kind().exit_code(), 2);
        assert_eq!(err.to_string(), "Failed to find a suitable GPU");
    }

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::CapabilityMissing,
            ErrorKind::CreationFailed,
            ErrorKind::IoFailed,
            ErrorKind::FrameFailed,
        ];
        for (i, a) in kinds.iter().enumerate() {
            assert_ne!(a.exit_code(), 0);
            for b in &kinds[i + 1..] {
                assert_ne!(a.exit_code(), b.exit_code());
            }
        }
    }

    #[test]
    fn creation_message_passes_driver_result_through() {
        let result: ash::prelude::VkResult<()> = Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        let err = result.creating("create swapchain").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CreationFailed);
        assert!(err.to_string().starts_with("Failed to create swapchain"));
        assert!(err.to_string().contains(&vk::Result::ERROR_INITIALIZATION_FAILED.to_string()));
    }

    #[test]
    fn missing_extension_names_the_extension() {
        let err = RenderError::MissingExtension("VK_KHR_swapchain".into());
        assert_eq!(err.to_string(), "Required extension not supported: VK_KHR_swapchain");
    }

    #[test]
    fn io_error_is_io_kind() {
        let err = RenderError::Io {
            path: PathBuf::from("shaders/slang.spv"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), ErrorKind::IoFailed);
        assert!(err.to_string().contains("shaders/slang.spv"));
    }

    #[test]
    fn frame_errors_are_frame_kind() {
        let result: ash::prelude::VkResult<()> = Err(vk::Result::ERROR_DEVICE_LOST);
        assert_eq!(result.during_frame("submit").unwrap_err().kind(), ErrorKind::FrameFailed);
        assert_eq!(RenderError::FrameTimeout(10).kind(), ErrorKind::FrameFailed);
    }
}

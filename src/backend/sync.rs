// Synchronization primitives
//
// One set of semaphores and one fence, reused every frame: the host waits
// for each frame to finish before starting the next.

use ash::vk;

use super::VulkanDevice;
use crate::error::{Result, VkResultExt};

/// Outcome of a bounded fence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    Signaled,
    TimedOut,
}

pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight_fence: vk::Fence,
}

impl FrameSync {
    pub fn new(device: &VulkanDevice) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        // Start signaled
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        unsafe {
            Ok(Self {
                image_available: device
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .creating("create image-available semaphore")?,
                render_finished: device
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .creating("create render-finished semaphore")?,
                in_flight_fence: device
                    .device
                    .create_fence(&fence_info, None)
                    .creating("create in-flight fence")?,
            })
        }
    }

    pub fn reset_fence(&self, device: &ash::Device) -> Result<()> {
        unsafe { device.reset_fences(&[self.in_flight_fence]) }
            .during_frame("reset in-flight fence")
    }

    /// Single blocking wait on the in-flight fence.
    pub fn wait_fence(&self, device: &ash::Device, timeout_ns: u64) -> Result<FenceStatus> {
        match unsafe { device.wait_for_fences(&[self.in_flight_fence], true, timeout_ns) } {
            Ok(()) => Ok(FenceStatus::Signaled),
            Err(vk::Result::TIMEOUT) => Ok(FenceStatus::TimedOut),
            Err(e) => Err(e).during_frame("wait for in-flight fence"),
        }
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight_fence, None);
        }
    }
}

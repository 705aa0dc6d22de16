// Backend module - Vulkan abstraction layer
//
// Design: Thin wrapper around ash with explicit ownership
// Creation order: device (instance, surface, queues) -> swapchain -> pipeline -> frame

pub mod device;
pub mod frame;
pub mod pipeline;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use device::VulkanDevice;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::renderer::FramebufferSize;
use frame::{FrameExecutor, FrameResources, VulkanFrameOps};
use pipeline::Pipeline;
use swapchain::Swapchain;
use surface::SwapchainConfig;

/// Every Vulkan object the renderer needs, built once at startup.
///
/// IMPORTANT: Field order matters for Drop! Fields drop top to bottom,
/// which is the reverse of creation order.
pub struct VulkanRenderer {
    frame: FrameResources,
    executor: FrameExecutor,
    pipeline: Pipeline,
    swapchain: Swapchain,
    device: Arc<VulkanDevice>,
}

impl VulkanRenderer {
    pub fn new<W>(window: &W, framebuffer: FramebufferSize, config: &Config) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        log::info!("Initializing Vulkan...");

        let device = VulkanDevice::new(&config.window.title, config.validation_enabled(), window)?;

        let support = device.surface.query_support(device.physical_device)?;
        let swapchain_config = SwapchainConfig::negotiate(
            &support,
            vk::Extent2D {
                width: framebuffer.width,
                height: framebuffer.height,
            },
        )?;
        let swapchain = Swapchain::new(device.clone(), &swapchain_config)?;
        log::info!(
            "Swapchain ready: {} views, {:?}/{:?}, {:?}",
            swapchain.image_views.len(),
            swapchain.format,
            swapchain.color_space,
            swapchain.present_mode
        );

        let pipeline =
            Pipeline::new(device.clone(), &config.graphics.shader_path, swapchain.format)?;

        let frame = FrameResources::new(device.clone())?;

        log::info!("Vulkan initialized successfully!");
        Ok(Self {
            frame,
            executor: FrameExecutor::default(),
            pipeline,
            swapchain,
            device,
        })
    }

    pub fn draw_frame(&mut self) -> Result<()> {
        let mut ops = VulkanFrameOps {
            device: &self.device,
            swapchain: &self.swapchain,
            pipeline: &self.pipeline,
            frame: &mut self.frame,
        };
        self.executor.draw_frame(&mut ops)?;
        Ok(())
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    pub fn frames_presented(&self) -> u64 {
        self.executor.frames_presented()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        log::info!("Cleaning up Vulkan resources...");

        // Wait for GPU to finish before destroying anything
        if let Err(e) = self.device.wait_idle() {
            log::error!("wait_idle before teardown failed: {}", e);
        }
    }
}

// Renderer - backend selection
//
// Call sites talk to RenderApi; the concrete backend is one variant of
// Renderer, picked from configuration at startup.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::VulkanRenderer;
use crate::config::{Config, GraphicsApi};
use crate::error::Result;

/// Framebuffer size in physical pixels, as reported by the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferSize {
    pub width: u32,
    pub height: u32,
}

pub trait RenderApi {
    fn api(&self) -> GraphicsApi;
    fn draw_frame(&mut self) -> Result<()>;
    fn wait_idle(&self) -> Result<()>;
    fn frames_presented(&self) -> u64;
}

pub enum Renderer {
    Vulkan(VulkanRenderer),
}

impl Renderer {
    pub fn new<W>(window: &W, framebuffer: FramebufferSize, config: &Config) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        match config.graphics.api {
            GraphicsApi::Vulkan => Ok(Renderer::Vulkan(VulkanRenderer::new(
                window,
                framebuffer,
                config,
            )?)),
        }
    }
}

impl RenderApi for Renderer {
    fn api(&self) -> GraphicsApi {
        match self {
            Renderer::Vulkan(_) => GraphicsApi::Vulkan,
        }
    }

    fn draw_frame(&mut self) -> Result<()> {
        match self {
            Renderer::Vulkan(vulkan) => vulkan.draw_frame(),
        }
    }

    fn wait_idle(&self) -> Result<()> {
        match self {
            Renderer::Vulkan(vulkan) => vulkan.wait_idle(),
        }
    }

    fn frames_presented(&self) -> u64 {
        match self {
            Renderer::Vulkan(vulkan) => vulkan.frames_presented(),
        }
    }
}

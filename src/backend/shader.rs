// Shader module loading
//
// Vulkan consumes SPIR-V bytecode. The blob is read from disk at startup
// and turned into a single module carrying both pipeline stages.

use ash::vk;
use std::fs::File;
use std::path::Path;

use super::VulkanDevice;
use crate::error::{RenderError, Result, VkResultExt};

pub const VERTEX_ENTRY: &std::ffi::CStr = c"vertMain";
pub const FRAGMENT_ENTRY: &std::ffi::CStr = c"fragMain";

/// Read a SPIR-V blob fully into memory as 4-byte words.
pub fn read_shader_file(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // read_spv rejects partial words and fixes up alignment and endianness
    let words = ash::util::read_spv(&mut file).map_err(|e| RenderError::InvalidShader {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    log::debug!("Loaded shader {:?} ({} words)", path, words.len());
    Ok(words)
}

pub fn create_shader_module(device: &VulkanDevice, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);

    unsafe { device.device.create_shader_module(&create_info, None) }
        .creating("create shader module")
}

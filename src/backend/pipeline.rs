// Graphics pipeline creation
//
// One fixed-function pipeline: no vertex input, triangle list, dynamic
// viewport/scissor, and dynamic rendering straight into the swapchain
// format (no render pass object).

use ash::vk;
use std::path::Path;
use std::sync::Arc;

use super::shader::{self, FRAGMENT_ENTRY, VERTEX_ENTRY};
use super::VulkanDevice;
use crate::error::{Result, VkResultExt};

/// State set at record time instead of baked into the pipeline
pub const DYNAMIC_STATES: [vk::DynamicState; 2] =
    [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];

pub struct Pipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    device: Arc<VulkanDevice>,
}

impl Pipeline {
    /// Load the shader blob at `shader_path` and build the pipeline
    /// targeting `color_format`.
    pub fn new(
        device: Arc<VulkanDevice>,
        shader_path: &Path,
        color_format: vk::Format,
    ) -> Result<Self> {
        log::info!("Creating graphics pipeline from {:?}", shader_path);

        let code = shader::read_shader_file(shader_path)?;
        let module = shader::create_shader_module(&device, &code)?;

        let result = Self::create_pipeline(&device, module, color_format);

        // The module is only needed while the pipeline is being built
        unsafe { device.device.destroy_shader_module(module, None) };

        let (pipeline, layout) = result?;
        Ok(Self {
            pipeline,
            layout,
            device,
        })
    }

    fn create_pipeline(
        device: &VulkanDevice,
        module: vk::ShaderModule,
        color_format: vk::Format,
    ) -> Result<(vk::Pipeline, vk::PipelineLayout)> {
        // Shader stages
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(module)
                .name(VERTEX_ENTRY),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(module)
                .name(FRAGMENT_ENTRY),
        ];

        // Vertex input: none, positions come from the vertex index
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Counts only; the actual viewport and scissor are dynamic
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        // Color blending (no blending, opaque)
        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)];

        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&color_blend_attachments);

        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&DYNAMIC_STATES);

        // No descriptor sets, no push constants
        let layout_info = vk::PipelineLayoutCreateInfo::default();

        let pipeline_layout = unsafe { device.device.create_pipeline_layout(&layout_info, None) }
            .creating("create pipeline layout")?;

        let color_formats = [color_format];
        let mut rendering_info =
            vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(pipeline_layout)
            .render_pass(vk::RenderPass::null())
            .push_next(&mut rendering_info);

        let pipelines = unsafe {
            device
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        }
        .map_err(|(_, e)| e)
        .creating("create graphics pipeline");

        let pipelines = match pipelines {
            Ok(pipelines) => pipelines,
            Err(e) => {
                unsafe { device.device.destroy_pipeline_layout(pipeline_layout, None) };
                return Err(e);
            }
        };

        log::info!("Graphics pipeline created (target format {:?})", color_format);
        Ok((pipelines[0], pipeline_layout))
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        log::debug!("Destroying graphics pipeline");
        unsafe {
            self.device.device.destroy_pipeline(self.pipeline, None);
            self.device.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

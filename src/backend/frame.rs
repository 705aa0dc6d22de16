// Frame execution
//
// Drives one acquire -> record -> submit -> present cycle per loop
// iteration with a single command buffer and a single sync set.
//
// FRAME TIMELINE:
// ┌──────────────────────────────────────────────────────────────────────┐
// │  wait_idle ─> acquire ─> reset fence ─> record ─> submit ─> wait     │
// │    fence ─> present                                                  │
// │                                                                      │
// │  Nothing overlaps: the host never records frame N+1 while the        │
// │  device still executes frame N.                                      │
// └──────────────────────────────────────────────────────────────────────┘

use ash::vk;
use std::sync::Arc;

use super::pipeline::Pipeline;
use super::swapchain::Swapchain;
use super::sync::{FenceStatus, FrameSync};
use super::VulkanDevice;
use crate::error::{RenderError, Result, VkResultExt};

/// Upper bound for the post-submit completion wait (10 s).
pub const FRAME_TIMEOUT_NS: u64 = 10_000_000_000;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// Host-side view of the command buffer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    Initial,
    Recording,
    Executable,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    pub index: u32,
    pub suboptimal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Image(AcquiredImage),
    /// Nothing was acquired and no semaphore will be signaled
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Optimal,
    Suboptimal,
    OutOfDate,
}

/// Device-side steps of a frame, in the order the executor calls them.
pub trait FrameOps {
    fn wait_idle(&mut self) -> Result<()>;
    fn acquire_image(&mut self) -> Result<AcquireOutcome>;
    fn command_buffer_state(&self) -> CommandBufferState;
    fn reset_fence(&mut self) -> Result<()>;
    fn record(&mut self, image_index: u32) -> Result<()>;
    fn submit(&mut self) -> Result<()>;
    fn wait_for_completion(&mut self, timeout_ns: u64) -> Result<FenceStatus>;
    fn present(&mut self, image_index: u32) -> Result<PresentOutcome>;
}

/// The per-frame state machine. Returns to `Idle` after every cycle,
/// including failed ones.
pub struct FrameExecutor {
    state: FrameState,
    frames_presented: u64,
    timeout_ns: u64,
}

impl Default for FrameExecutor {
    fn default() -> Self {
        Self::new(FRAME_TIMEOUT_NS)
    }
}

impl FrameExecutor {
    pub fn new(timeout_ns: u64) -> Self {
        Self {
            state: FrameState::Idle,
            frames_presented: 0,
            timeout_ns,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Run one cycle. `Ok(None)` means the swapchain was out of date at
    /// acquire and the cycle ended without drawing.
    pub fn draw_frame<O: FrameOps>(&mut self, ops: &mut O) -> Result<Option<PresentOutcome>> {
        let result = self.run_cycle(ops);
        self.state = FrameState::Idle;
        result
    }

    fn run_cycle<O: FrameOps>(&mut self, ops: &mut O) -> Result<Option<PresentOutcome>> {
        debug_assert_eq!(self.state, FrameState::Idle);

        // Coarse stand-in for a per-frame fence wait
        ops.wait_idle()?;

        self.state = FrameState::Acquiring;
        let image = match ops.acquire_image()? {
            AcquireOutcome::Image(image) => image,
            AcquireOutcome::OutOfDate => {
                log::warn!("acquire_next_image returned ERROR_OUT_OF_DATE_KHR, skipping frame");
                return Ok(None);
            }
        };
        if image.suboptimal {
            log::warn!("Acquired image {} from a suboptimal swapchain", image.index);
        }

        ops.reset_fence()?;
        if ops.command_buffer_state() == CommandBufferState::Recording {
            return Err(RenderError::StillRecording);
        }

        self.state = FrameState::Recording;
        ops.record(image.index)?;
        ops.submit()?;

        self.state = FrameState::Submitted;
        if ops.wait_for_completion(self.timeout_ns)? == FenceStatus::TimedOut {
            return Err(RenderError::FrameTimeout(self.timeout_ns));
        }

        self.state = FrameState::Presenting;
        let outcome = ops.present(image.index)?;
        match outcome {
            PresentOutcome::Optimal => {}
            PresentOutcome::Suboptimal => log::warn!("queue_present returned SUBOPTIMAL_KHR"),
            PresentOutcome::OutOfDate => log::warn!("queue_present returned ERROR_OUT_OF_DATE_KHR"),
        }

        self.frames_presented += 1;
        Ok(Some(outcome))
    }
}

/// Command pool, the one command buffer, and the sync set
pub struct FrameResources {
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,
    pub sync: FrameSync,
    state: CommandBufferState,
    device: Arc<VulkanDevice>,
}

impl FrameResources {
    pub fn new(device: Arc<VulkanDevice>) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device.queue_families.graphics)
            // RESET: Allow individual buffer reset
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let command_pool = unsafe { device.device.create_command_pool(&pool_info, None) }
            .creating("create command pool")?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe { device.device.allocate_command_buffers(&alloc_info) }
            .creating("allocate command buffer")?[0];

        let sync = FrameSync::new(&device)?;

        Ok(Self {
            command_pool,
            command_buffer,
            sync,
            state: CommandBufferState::Initial,
            device,
        })
    }
}

impl Drop for FrameResources {
    fn drop(&mut self) {
        log::debug!("Destroying frame sync objects and command pool");
        self.sync.destroy(&self.device.device);
        // Also frees the command buffer
        unsafe { self.device.device.destroy_command_pool(self.command_pool, None) };
    }
}

/// Everything one frame touches, borrowed for the duration of the frame
pub struct VulkanFrameOps<'a> {
    pub device: &'a VulkanDevice,
    pub swapchain: &'a Swapchain,
    pub pipeline: &'a Pipeline,
    pub frame: &'a mut FrameResources,
}

impl FrameOps for VulkanFrameOps<'_> {
    fn wait_idle(&mut self) -> Result<()> {
        self.device.wait_idle()
    }

    fn acquire_image(&mut self) -> Result<AcquireOutcome> {
        match self
            .swapchain
            .acquire_next_image(u64::MAX, self.frame.sync.image_available)
        {
            Ok((index, suboptimal)) => {
                Ok(AcquireOutcome::Image(AcquiredImage { index, suboptimal }))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(e).during_frame("acquire next image"),
        }
    }

    fn command_buffer_state(&self) -> CommandBufferState {
        self.frame.state
    }

    fn reset_fence(&mut self) -> Result<()> {
        self.frame.sync.reset_fence(&self.device.device)
    }

    fn record(&mut self, image_index: u32) -> Result<()> {
        let device = &self.device.device;
        let cmd = self.frame.command_buffer;

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .during_frame("reset command buffer")?;
            device
                .begin_command_buffer(cmd, &vk::CommandBufferBeginInfo::default())
                .during_frame("begin command buffer")?;
        }
        self.frame.state = CommandBufferState::Recording;

        let image = self.swapchain.images[image_index as usize];
        let view = self.swapchain.image_views[image_index as usize];
        record_triangle(device, cmd, image, view, self.swapchain.extent, self.pipeline.pipeline);

        unsafe { device.end_command_buffer(cmd) }.during_frame("end command buffer")?;
        self.frame.state = CommandBufferState::Executable;
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        let wait_semaphores = [self.frame.sync.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.frame.command_buffer];
        let signal_semaphores = [self.frame.sync.render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores) // Wait for image to be available
            .wait_dst_stage_mask(&wait_stages) // Which stage waits
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores); // Signal when done

        unsafe {
            self.device.device.queue_submit(
                self.device.graphics_queue,
                &[submit_info],
                self.frame.sync.in_flight_fence, // Signal this fence when GPU is done
            )
        }
        .during_frame("submit command buffer")?;

        self.frame.state = CommandBufferState::Pending;
        Ok(())
    }

    fn wait_for_completion(&mut self, timeout_ns: u64) -> Result<FenceStatus> {
        let status = self.frame.sync.wait_fence(&self.device.device, timeout_ns)?;
        if status == FenceStatus::Signaled {
            self.frame.state = CommandBufferState::Executable;
        }
        Ok(status)
    }

    fn present(&mut self, image_index: u32) -> Result<PresentOutcome> {
        match self.swapchain.present(
            self.device.present_queue,
            image_index,
            &[self.frame.sync.render_finished], // Wait for rendering to finish
        ) {
            Ok(false) => Ok(PresentOutcome::Optimal),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(e).during_frame("present image"),
        }
    }
}

/// An image layout change expressed as a synchronization2 barrier
struct LayoutTransition {
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_access: vk::AccessFlags2,
    dst_access: vk::AccessFlags2,
    src_stage: vk::PipelineStageFlags2,
    dst_stage: vk::PipelineStageFlags2,
}

const TO_COLOR_ATTACHMENT: LayoutTransition = LayoutTransition {
    old_layout: vk::ImageLayout::UNDEFINED,
    new_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    src_access: vk::AccessFlags2::empty(),
    dst_access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
    src_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
    dst_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
};

const TO_PRESENT: LayoutTransition = LayoutTransition {
    old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    new_layout: vk::ImageLayout::PRESENT_SRC_KHR,
    src_access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
    dst_access: vk::AccessFlags2::empty(),
    src_stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
    dst_stage: vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
};

fn transition_image_layout(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    transition: &LayoutTransition,
) {
    let barriers = [vk::ImageMemoryBarrier2::default()
        .src_stage_mask(transition.src_stage)
        .src_access_mask(transition.src_access)
        .dst_stage_mask(transition.dst_stage)
        .dst_access_mask(transition.dst_access)
        .old_layout(transition.old_layout)
        .new_layout(transition.new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })];

    let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&barriers);

    unsafe { device.cmd_pipeline_barrier2(cmd, &dependency_info) };
}

fn record_triangle(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    view: vk::ImageView,
    extent: vk::Extent2D,
    pipeline: vk::Pipeline,
) {
    transition_image_layout(device, cmd, image, &TO_COLOR_ATTACHMENT);

    let color_attachments = [vk::RenderingAttachmentInfo::default()
        .image_view(view)
        .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .clear_value(vk::ClearValue {
            color: vk::ClearColorValue { float32: CLEAR_COLOR },
        })];

    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };

    let rendering_info = vk::RenderingInfo::default()
        .render_area(render_area)
        .layer_count(1)
        .color_attachments(&color_attachments);

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };

    unsafe {
        device.cmd_begin_rendering(cmd, &rendering_info);
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline);
        device.cmd_set_viewport(cmd, 0, &[viewport]);
        device.cmd_set_scissor(cmd, 0, &[render_area]);
        device.cmd_draw(cmd, 3, 1, 0, 0);
        device.cmd_end_rendering(cmd);
    }

    transition_image_layout(device, cmd, image, &TO_PRESENT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        WaitIdle,
        Acquire,
        ResetFence,
        Record(u32),
        Submit,
        Wait,
        Present(u32),
    }

    /// Records calls and mirrors the command buffer lifecycle.
    struct MockOps {
        calls: Vec<Call>,
        cb_state: CommandBufferState,
        states_at_cycle_start: Vec<CommandBufferState>,
        image_count: u32,
        next_image: u32,
        fence_status: FenceStatus,
        present_outcome: PresentOutcome,
        fail_acquire: bool,
        /// Number of upcoming acquires that report an out-of-date swapchain
        out_of_date_acquires: usize,
    }

    impl MockOps {
        fn new(image_count: u32) -> Self {
            Self {
                calls: Vec::new(),
                cb_state: CommandBufferState::Initial,
                states_at_cycle_start: Vec::new(),
                image_count,
                next_image: 0,
                fence_status: FenceStatus::Signaled,
                present_outcome: PresentOutcome::Optimal,
                fail_acquire: false,
                out_of_date_acquires: 0,
            }
        }

        fn count(&self, call: fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| call(c)).count()
        }
    }

    impl FrameOps for MockOps {
        fn wait_idle(&mut self) -> Result<()> {
            self.states_at_cycle_start.push(self.cb_state);
            self.calls.push(Call::WaitIdle);
            Ok(())
        }

        fn acquire_image(&mut self) -> Result<AcquireOutcome> {
            self.calls.push(Call::Acquire);
            if self.fail_acquire {
                return Err(RenderError::Frame {
                    what: "acquire next image",
                    source: vk::Result::ERROR_DEVICE_LOST,
                });
            }
            if self.out_of_date_acquires > 0 {
                self.out_of_date_acquires -= 1;
                return Ok(AcquireOutcome::OutOfDate);
            }
            let index = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count;
            Ok(AcquireOutcome::Image(AcquiredImage { index, suboptimal: false }))
        }

        fn command_buffer_state(&self) -> CommandBufferState {
            self.cb_state
        }

        fn reset_fence(&mut self) -> Result<()> {
            self.calls.push(Call::ResetFence);
            Ok(())
        }

        fn record(&mut self, image_index: u32) -> Result<()> {
            assert_ne!(self.cb_state, CommandBufferState::Recording);
            self.calls.push(Call::Record(image_index));
            self.cb_state = CommandBufferState::Executable;
            Ok(())
        }

        fn submit(&mut self) -> Result<()> {
            self.calls.push(Call::Submit);
            self.cb_state = CommandBufferState::Pending;
            Ok(())
        }

        fn wait_for_completion(&mut self, _timeout_ns: u64) -> Result<FenceStatus> {
            self.calls.push(Call::Wait);
            if self.fence_status == FenceStatus::Signaled {
                self.cb_state = CommandBufferState::Executable;
            }
            Ok(self.fence_status)
        }

        fn present(&mut self, image_index: u32) -> Result<PresentOutcome> {
            self.calls.push(Call::Present(image_index));
            Ok(self.present_outcome)
        }
    }

    #[test]
    fn n_iterations_run_n_ordered_cycles() {
        let mut ops = MockOps::new(3);
        let mut executor = FrameExecutor::default();

        for _ in 0..5 {
            assert_eq!(executor.draw_frame(&mut ops).unwrap(), Some(PresentOutcome::Optimal));
            assert_eq!(executor.state(), FrameState::Idle);
        }

        assert_eq!(executor.frames_presented(), 5);
        let expected: Vec<Call> = (0..5u32)
            .flat_map(|frame| {
                let image = frame % 3;
                [
                    Call::WaitIdle,
                    Call::Acquire,
                    Call::ResetFence,
                    Call::Record(image),
                    Call::Submit,
                    Call::Wait,
                    Call::Present(image),
                ]
            })
            .collect();
        assert_eq!(ops.calls, expected);
    }

    #[test]
    fn command_buffer_never_recording_at_cycle_start() {
        let mut ops = MockOps::new(2);
        let mut executor = FrameExecutor::default();
        for _ in 0..4 {
            executor.draw_frame(&mut ops).unwrap();
        }
        assert_eq!(ops.states_at_cycle_start.len(), 4);
        assert!(ops
            .states_at_cycle_start
            .iter()
            .all(|state| *state != CommandBufferState::Recording));
    }

    #[test]
    fn buffer_left_recording_is_refused() {
        let mut ops = MockOps::new(2);
        ops.cb_state = CommandBufferState::Recording;
        let mut executor = FrameExecutor::default();

        let err = executor.draw_frame(&mut ops).unwrap_err();
        assert!(matches!(err, RenderError::StillRecording));
        assert_eq!(ops.count(|c| matches!(c, Call::Record(_))), 0);
        assert_eq!(executor.state(), FrameState::Idle);
    }

    #[test]
    fn suboptimal_present_is_tolerated() {
        let mut ops = MockOps::new(2);
        ops.present_outcome = PresentOutcome::Suboptimal;
        let mut executor = FrameExecutor::default();

        let suboptimal = Some(PresentOutcome::Suboptimal);
        assert_eq!(executor.draw_frame(&mut ops).unwrap(), suboptimal);
        assert_eq!(executor.draw_frame(&mut ops).unwrap(), suboptimal);
        assert_eq!(executor.frames_presented(), 2);
    }

    #[test]
    fn out_of_date_present_is_tolerated() {
        let mut ops = MockOps::new(2);
        ops.present_outcome = PresentOutcome::OutOfDate;
        let mut executor = FrameExecutor::default();

        let out_of_date = Some(PresentOutcome::OutOfDate);
        assert_eq!(executor.draw_frame(&mut ops).unwrap(), out_of_date);
        assert_eq!(executor.frames_presented(), 1);
        assert_eq!(executor.state(), FrameState::Idle);

        assert_eq!(executor.draw_frame(&mut ops).unwrap(), out_of_date);
        assert_eq!(executor.frames_presented(), 2);
        assert_eq!(ops.count(|c| matches!(c, Call::Present(_))), 2);
    }

    #[test]
    fn out_of_date_acquire_skips_the_cycle() {
        let mut ops = MockOps::new(2);
        ops.out_of_date_acquires = 1;
        let mut executor = FrameExecutor::default();

        assert_eq!(executor.draw_frame(&mut ops).unwrap(), None);
        assert_eq!(ops.calls, vec![Call::WaitIdle, Call::Acquire]);
        assert_eq!(executor.frames_presented(), 0);
        assert_eq!(executor.state(), FrameState::Idle);

        assert_eq!(executor.draw_frame(&mut ops).unwrap(), Some(PresentOutcome::Optimal));
        assert_eq!(executor.frames_presented(), 1);
        assert_eq!(ops.count(|c| matches!(c, Call::Present(0))), 1);
    }

    #[test]
    fn fence_timeout_skips_present() {
        let mut ops = MockOps::new(2);
        ops.fence_status = FenceStatus::TimedOut;
        let mut executor = FrameExecutor::new(1_000);

        let err = executor.draw_frame(&mut ops).unwrap_err();
        assert!(matches!(err, RenderError::FrameTimeout(1_000)));
        assert_eq!(ops.count(|c| matches!(c, Call::Present(_))), 0);
        assert_eq!(executor.frames_presented(), 0);
        assert_eq!(executor.state(), FrameState::Idle);
    }

    #[test]
    fn acquire_failure_is_not_retried() {
        let mut ops = MockOps::new(2);
        ops.fail_acquire = true;
        let mut executor = FrameExecutor::default();

        let err = executor.draw_frame(&mut ops).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::FrameFailed);
        assert_eq!(ops.calls, vec![Call::WaitIdle, Call::Acquire]);
    }

    #[test]
    fn barriers_mirror_each_other() {
        assert_eq!(TO_COLOR_ATTACHMENT.new_layout, TO_PRESENT.old_layout);
        assert_eq!(TO_COLOR_ATTACHMENT.dst_access, TO_PRESENT.src_access);
        assert_eq!(TO_PRESENT.new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        assert_eq!(TO_PRESENT.dst_stage, vk::PipelineStageFlags2::BOTTOM_OF_PIPE);
    }
}

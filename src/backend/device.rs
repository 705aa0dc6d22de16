// Vulkan Device - Core GPU interface
//
// Responsibilities:
// - Instance creation with layer/extension checks
// - Window surface creation
// - Physical device selection (first device meeting every requirement)
// - Logical device + graphics/present queue creation

use ash::{vk, Entry};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

use super::surface::Surface;
use crate::error::{RenderError, Result, VkResultExt};

pub const VALIDATION_LAYERS: &[&CStr] = &[c"VK_LAYER_KHRONOS_validation"];

pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[
    ash::khr::swapchain::NAME,
    ash::khr::spirv_1_4::NAME,
    ash::khr::synchronization2::NAME,
    ash::khr::create_renderpass2::NAME,
];

/// Enabled when advertised; the feature struct is only chained alongside it.
pub const OPTIONAL_DEVICE_EXTENSIONS: &[&CStr] = &[ash::ext::extended_dynamic_state::NAME];

/// The feature flags this renderer depends on, in one place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFeatureSupport {
    pub dynamic_rendering: bool,
    pub synchronization2: bool,
    pub extended_dynamic_state: bool,
    pub shader_draw_parameters: bool,
}

impl DeviceFeatureSupport {
    pub const ALL: Self = Self {
        dynamic_rendering: true,
        synchronization2: true,
        extended_dynamic_state: true,
        shader_draw_parameters: true,
    };

    /// True if every feature set in `required` is also set here.
    pub fn covers(&self, required: &Self) -> bool {
        (!required.dynamic_rendering || self.dynamic_rendering)
            && (!required.synchronization2 || self.synchronization2)
            && (!required.extended_dynamic_state || self.extended_dynamic_state)
            && (!required.shader_draw_parameters || self.shader_draw_parameters)
    }
}

pub struct DeviceRequirements<'a> {
    pub min_api_version: u32,
    pub extensions: &'a [&'a CStr],
    pub features: DeviceFeatureSupport,
}

pub const DEVICE_REQUIREMENTS: DeviceRequirements<'static> = DeviceRequirements {
    min_api_version: vk::API_VERSION_1_3,
    extensions: REQUIRED_DEVICE_EXTENSIONS,
    features: DeviceFeatureSupport::ALL,
};

/// Read-only snapshot of one enumerated GPU, taken for selection only.
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub name: String,
    pub api_version: u32,
    pub queue_families: Vec<vk::QueueFlags>,
    pub extensions: Vec<CString>,
    pub features: DeviceFeatureSupport,
}

impl DeviceCandidate {
    fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Result<Self> {
        let props = unsafe { instance.get_physical_device_properties(physical_device) };

        let queue_families = unsafe {
            instance.get_physical_device_queue_family_properties(physical_device)
        }
        .iter()
        .map(|family| family.queue_flags)
        .collect();

        let extensions: Vec<CString> =
            unsafe { instance.enumerate_device_extension_properties(physical_device) }
                .creating("enumerate device extensions")?
                .iter()
                .filter_map(|ext| ext.extension_name_as_c_str().ok().map(CStr::to_owned))
                .collect();
        let has_dynamic_state_ext = extensions
            .iter()
            .any(|ext: &CString| ext.as_c_str() == ash::ext::extended_dynamic_state::NAME);

        let mut vulkan11 = vk::PhysicalDeviceVulkan11Features::default();
        let mut vulkan13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut dynamic_state = vk::PhysicalDeviceExtendedDynamicStateFeaturesEXT::default();
        {
            let mut features2 = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut vulkan11)
                .push_next(&mut vulkan13);
            if has_dynamic_state_ext {
                features2 = features2.push_next(&mut dynamic_state);
            }
            unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };
        }

        // The extended dynamic states are core (and mandatory) from 1.3 on
        let extended_dynamic_state = if has_dynamic_state_ext {
            dynamic_state.extended_dynamic_state == vk::TRUE
        } else {
            props.api_version >= vk::API_VERSION_1_3
        };

        Ok(Self {
            name: props
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "<unnamed>".to_string()),
            api_version: props.api_version,
            queue_families,
            extensions,
            features: DeviceFeatureSupport {
                dynamic_rendering: vulkan13.dynamic_rendering == vk::TRUE,
                synchronization2: vulkan13.synchronization2 == vk::TRUE,
                extended_dynamic_state,
                shader_draw_parameters: vulkan11.shader_draw_parameters == vk::TRUE,
            },
        })
    }

    /// Required extensions plus every optional one this device advertises.
    pub fn enabled_extensions(&self) -> Vec<&'static CStr> {
        let mut names = REQUIRED_DEVICE_EXTENSIONS.to_vec();
        names.extend(
            OPTIONAL_DEVICE_EXTENSIONS
                .iter()
                .copied()
                .filter(|name| self.supports_extension(name)),
        );
        names
    }

    pub fn supports_extension(&self, name: &CStr) -> bool {
        self.extensions.iter().any(|ext| ext.as_c_str() == name)
    }

    /// First requirement this device fails, if any.
    pub fn unmet_requirement(&self, req: &DeviceRequirements<'_>) -> Option<String> {
        if self.api_version < req.min_api_version {
            return Some(format!(
                "API version {}.{} below minimum",
                vk::api_version_major(self.api_version),
                vk::api_version_minor(self.api_version)
            ));
        }
        if !self
            .queue_families
            .iter()
            .any(|flags| flags.contains(vk::QueueFlags::GRAPHICS))
        {
            return Some("no graphics queue family".to_string());
        }
        let available: Vec<&CStr> = self.extensions.iter().map(CString::as_c_str).collect();
        if let Some(missing) = find_missing(req.extensions, &available) {
            return Some(format!("missing extension {}", missing.to_string_lossy()));
        }
        if !self.features.covers(&req.features) {
            return Some(format!("missing features (has {:?})", self.features));
        }
        None
    }

    pub fn is_suitable(&self, req: &DeviceRequirements<'_>) -> bool {
        self.unmet_requirement(req).is_none()
    }
}

/// Index of the first candidate, in enumeration order, meeting every requirement.
pub fn select_first_suitable(
    candidates: &[DeviceCandidate],
    req: &DeviceRequirements<'_>,
) -> Option<usize> {
    candidates.iter().position(|candidate| candidate.is_suitable(req))
}

/// First entry of `required` absent from `available`.
pub fn find_missing<'a>(required: &[&'a CStr], available: &[&CStr]) -> Option<&'a CStr> {
    required
        .iter()
        .copied()
        .find(|name| !available.contains(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Families to request a queue from, each exactly once.
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Pick the graphics family, then the present family by precedence:
/// the graphics family itself, else any graphics+present family (used for
/// both roles), else any present-only family.
pub fn select_queue_families(
    families: &[vk::QueueFlags],
    present_support: &[bool],
) -> Result<QueueFamilies> {
    let supports_present = |i: usize| present_support.get(i).copied().unwrap_or(false);

    let graphics = families
        .iter()
        .position(|flags| flags.contains(vk::QueueFlags::GRAPHICS))
        .ok_or(RenderError::NoQueueFamily("graphics"))?;

    if supports_present(graphics) {
        return Ok(QueueFamilies {
            graphics: graphics as u32,
            present: graphics as u32,
        });
    }

    if let Some(both) = (0..families.len())
        .find(|&i| families[i].contains(vk::QueueFlags::GRAPHICS) && supports_present(i))
    {
        return Ok(QueueFamilies {
            graphics: both as u32,
            present: both as u32,
        });
    }

    let present = (0..families.len())
        .find(|&i| supports_present(i))
        .ok_or(RenderError::NoQueueFamily("graphics and present"))?;

    Ok(QueueFamilies {
        graphics: graphics as u32,
        present: present as u32,
    })
}

/// Instance, entry and the optional debug messenger, destroyed together.
///
/// Owned from the moment the instance exists so a later startup failure
/// still tears it down.
pub struct InstanceContext {
    raw: ash::Instance,
    entry: Entry,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl InstanceContext {
    pub fn entry(&self) -> &Entry {
        &self.entry
    }
}

impl std::ops::Deref for InstanceContext {
    type Target = ash::Instance;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        log::debug!("Destroying Vulkan instance");
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.raw.destroy_instance(None);
        }
    }
}

/// Vulkan device wrapper with automatic cleanup
///
/// IMPORTANT: `surface` is declared before `instance`; fields drop top to
/// bottom after the logical device is destroyed in `Drop`.
pub struct VulkanDevice {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,

    // Queue handles (may be the same queue)
    pub queue_families: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,

    pub surface: Surface,
    pub instance: InstanceContext,
}

impl VulkanDevice {
    /// Create the device context bound to `window`.
    ///
    /// Objects are created in dependency order: instance, surface,
    /// physical device, logical device and queues. Anything already
    /// created is destroyed in reverse order if a later step fails.
    pub fn new<W>(app_name: &str, enable_validation: bool, window: &W) -> Result<Arc<Self>>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        log::info!("Creating Vulkan device: {}", app_name);

        let display_handle = window.display_handle()?.as_raw();
        let window_handle = window.window_handle()?.as_raw();

        let entry = unsafe { Entry::load() }?;

        let raw = Self::create_instance(&entry, app_name, display_handle, enable_validation)?;
        let mut instance = InstanceContext {
            raw,
            entry,
            debug_utils: None,
        };

        if enable_validation {
            instance.debug_utils = Some(Self::setup_debug_messenger(&instance.entry, &instance)?);
        }

        let surface = unsafe {
            ash_window::create_surface(
                instance.entry(),
                &instance,
                display_handle,
                window_handle,
                None,
            )
        }
        .creating("create window surface")?;
        let surface = Surface::new(instance.entry(), &instance, surface);

        let (physical_device, candidate) = Self::pick_physical_device(&instance)?;

        let present_support = (0..candidate.queue_families.len() as u32)
            .map(|family| surface.supports_present(physical_device, family))
            .collect::<Result<Vec<_>>>()?;
        let queue_families = select_queue_families(&candidate.queue_families, &present_support)?;
        log::info!(
            "Queue families: graphics={} present={}",
            queue_families.graphics,
            queue_families.present
        );

        let extensions = candidate.enabled_extensions();
        let device =
            Self::create_logical_device(&instance, physical_device, queue_families, &extensions)?;
        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };

        log::info!("Selected GPU: {}", candidate.name);
        log::info!(
            "API Version: {}.{}.{}",
            vk::api_version_major(candidate.api_version),
            vk::api_version_minor(candidate.api_version),
            vk::api_version_patch(candidate.api_version)
        );
        log::debug!("Device extensions: {:?}", extensions);

        Ok(Arc::new(Self {
            device,
            physical_device,
            queue_families,
            graphics_queue,
            present_queue,
            surface,
            instance,
        }))
    }

    fn required_instance_extensions(
        display_handle: RawDisplayHandle,
        enable_validation: bool,
    ) -> Result<Vec<&'static CStr>> {
        let window_extensions = ash_window::enumerate_required_extensions(display_handle)
            .creating("query window system extensions")?;

        // ash-window hands back pointers into its own static name table
        let mut extensions: Vec<&'static CStr> = window_extensions
            .iter()
            .map(|&name| unsafe { CStr::from_ptr(name) })
            .collect();

        if enable_validation {
            extensions.push(ash::ext::debug_utils::NAME);
        }
        Ok(extensions)
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        display_handle: RawDisplayHandle,
        enable_validation: bool,
    ) -> Result<ash::Instance> {
        let app_name_cstr = CString::new(app_name).unwrap_or_else(|_| c"VRE".to_owned());

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"VRE")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_3);

        // Validation layers
        let layers: &[&CStr] = if enable_validation { VALIDATION_LAYERS } else { &[] };
        let layer_properties = unsafe { entry.enumerate_instance_layer_properties() }
            .creating("enumerate instance layers")?;
        let available_layers: Vec<&CStr> = layer_properties
            .iter()
            .filter_map(|layer| layer.layer_name_as_c_str().ok())
            .collect();
        if let Some(missing) = find_missing(layers, &available_layers) {
            return Err(RenderError::MissingLayer(missing.to_string_lossy().into_owned()));
        }

        // Required extensions
        let extensions = Self::required_instance_extensions(display_handle, enable_validation)?;
        let extension_properties = unsafe { entry.enumerate_instance_extension_properties(None) }
            .creating("enumerate instance extensions")?;
        let available_extensions: Vec<&CStr> = extension_properties
            .iter()
            .filter_map(|ext| ext.extension_name_as_c_str().ok())
            .collect();
        if let Some(missing) = find_missing(&extensions, &available_extensions) {
            return Err(RenderError::MissingExtension(missing.to_string_lossy().into_owned()));
        }

        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|name| name.as_ptr()).collect();
        let extension_ptrs: Vec<*const c_char> =
            extensions.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);

        unsafe { entry.create_instance(&create_info, None) }.creating("create Vulkan instance")
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
            .creating("create debug messenger")?;

        Ok((debug_utils, messenger))
    }

    fn pick_physical_device(
        instance: &ash::Instance,
    ) -> Result<(vk::PhysicalDevice, DeviceCandidate)> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .creating("enumerate physical devices")?;

        let mut candidates = devices
            .iter()
            .map(|&device| DeviceCandidate::query(instance, device))
            .collect::<Result<Vec<_>>>()?;

        for candidate in &candidates {
            if let Some(reason) = candidate.unmet_requirement(&DEVICE_REQUIREMENTS) {
                log::debug!("Skipping GPU {}: {}", candidate.name, reason);
            }
        }

        let index = select_first_suitable(&candidates, &DEVICE_REQUIREMENTS)
            .ok_or(RenderError::NoSuitableDevice)?;
        Ok((devices[index], candidates.swap_remove(index)))
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: QueueFamilies,
        extensions: &[&CStr],
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let extension_ptrs: Vec<*const c_char> =
            extensions.iter().map(|name| name.as_ptr()).collect();

        let mut vulkan11 =
            vk::PhysicalDeviceVulkan11Features::default().shader_draw_parameters(true);
        let mut vulkan13 = vk::PhysicalDeviceVulkan13Features::default()
            .synchronization2(true)
            .dynamic_rendering(true);
        let mut dynamic_state = vk::PhysicalDeviceExtendedDynamicStateFeaturesEXT::default()
            .extended_dynamic_state(true);
        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .push_next(&mut vulkan11)
            .push_next(&mut vulkan13);
        if extensions.contains(&ash::ext::extended_dynamic_state::NAME) {
            features2 = features2.push_next(&mut dynamic_state);
        }

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs)
            .push_next(&mut features2);

        unsafe { instance.create_device(physical_device, &create_info, None) }
            .creating("create logical device")
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.during_frame("wait for device idle")
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        let _ = self.wait_idle();

        // Surface, messenger and instance follow as fields drop
        unsafe { self.device.destroy_device(None) };
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suitable_candidate(name: &str) -> DeviceCandidate {
        DeviceCandidate {
            name: name.to_string(),
            api_version: vk::API_VERSION_1_3,
            queue_families: vec![vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE],
            extensions: REQUIRED_DEVICE_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_owned())
                .collect(),
            features: DeviceFeatureSupport::ALL,
        }
    }

    // ── layers / extensions ───────────────────────────────────────────────

    #[test]
    fn find_missing_reports_first_absent_name() {
        let available = [c"VK_KHR_surface", c"VK_KHR_xcb_surface"];
        assert_eq!(find_missing(&[c"VK_KHR_surface"], &available), None);
        assert_eq!(
            find_missing(&[c"VK_KHR_surface", c"VK_EXT_debug_utils"], &available),
            Some(c"VK_EXT_debug_utils")
        );
    }

    #[test]
    fn empty_requirement_is_always_met() {
        assert_eq!(find_missing(&[], &[]), None);
    }

    // ── physical device selection ─────────────────────────────────────────

    #[test]
    fn fully_capable_device_is_suitable() {
        assert!(suitable_candidate("gpu").is_suitable(&DEVICE_REQUIREMENTS));
    }

    #[test]
    fn old_api_version_is_rejected() {
        let mut gpu = suitable_candidate("old");
        gpu.api_version = vk::API_VERSION_1_2;
        assert!(!gpu.is_suitable(&DEVICE_REQUIREMENTS));
    }

    #[test]
    fn compute_only_device_is_rejected() {
        let mut gpu = suitable_candidate("compute");
        gpu.queue_families = vec![vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER];
        assert!(!gpu.is_suitable(&DEVICE_REQUIREMENTS));
    }

    #[test]
    fn each_missing_extension_is_rejected() {
        for skipped in REQUIRED_DEVICE_EXTENSIONS {
            let mut gpu = suitable_candidate("partial");
            gpu.extensions.retain(|ext| ext.as_c_str() != *skipped);
            let reason = gpu.unmet_requirement(&DEVICE_REQUIREMENTS).unwrap();
            assert!(reason.contains(&*skipped.to_string_lossy()), "{reason}");
        }
    }

    #[test]
    fn missing_feature_is_rejected() {
        let mut gpu = suitable_candidate("no-sync2");
        gpu.features.synchronization2 = false;
        assert!(!gpu.is_suitable(&DEVICE_REQUIREMENTS));
        assert!(DeviceFeatureSupport::ALL.covers(&DeviceFeatureSupport::default()));
    }

    #[test]
    fn optional_extension_enabled_only_when_advertised() {
        let without = suitable_candidate("plain");
        assert_eq!(without.enabled_extensions(), REQUIRED_DEVICE_EXTENSIONS.to_vec());

        let mut with = suitable_candidate("eds");
        with.extensions.push(ash::ext::extended_dynamic_state::NAME.to_owned());
        let enabled = with.enabled_extensions();
        assert_eq!(enabled.len(), REQUIRED_DEVICE_EXTENSIONS.len() + 1);
        assert!(enabled.contains(&ash::ext::extended_dynamic_state::NAME));
    }

    #[test]
    fn first_suitable_device_wins_over_later_ones() {
        let mut first = suitable_candidate("integrated");
        first.queue_families = vec![vk::QueueFlags::TRANSFER];
        let second = suitable_candidate("discrete-a");
        let third = suitable_candidate("discrete-b");
        let candidates = [first, second, third];
        assert_eq!(select_first_suitable(&candidates, &DEVICE_REQUIREMENTS), Some(1));
    }

    #[test]
    fn no_device_with_required_extensions_selects_nothing() {
        let candidates: Vec<_> = (0..3)
            .map(|i| {
                let mut gpu = suitable_candidate(&format!("gpu{i}"));
                gpu.extensions.clear();
                gpu
            })
            .collect();
        assert_eq!(select_first_suitable(&candidates, &DEVICE_REQUIREMENTS), None);
        assert_eq!(select_first_suitable(&[], &DEVICE_REQUIREMENTS), None);
    }

    // ── queue families ────────────────────────────────────────────────────

    const G: vk::QueueFlags = vk::QueueFlags::GRAPHICS;
    const T: vk::QueueFlags = vk::QueueFlags::TRANSFER;

    #[test]
    fn graphics_family_reused_for_present() {
        let families = select_queue_families(&[G, T], &[true, true]).unwrap();
        assert_eq!(families, QueueFamilies { graphics: 0, present: 0 });
        assert!(families.is_shared());
        assert_eq!(families.unique(), vec![0]);
    }

    #[test]
    fn later_combined_family_takes_both_roles() {
        let families = select_queue_families(&[G, T, G], &[false, true, true]).unwrap();
        assert_eq!(families, QueueFamilies { graphics: 2, present: 2 });
    }

    #[test]
    fn present_only_family_gives_two_families() {
        let families = select_queue_families(&[G, T], &[false, true]).unwrap();
        assert_eq!(families, QueueFamilies { graphics: 0, present: 1 });
        assert!(!families.is_shared());
        assert_eq!(families.unique(), vec![0, 1]);
    }

    #[test]
    fn no_present_family_is_fatal() {
        let err = select_queue_families(&[G, T], &[false, false]).unwrap_err();
        assert!(matches!(err, RenderError::NoQueueFamily(_)));
    }

    #[test]
    fn no_graphics_family_is_fatal() {
        let err = select_queue_families(&[T], &[true]).unwrap_err();
        assert!(matches!(err, RenderError::NoQueueFamily("graphics")));
    }
}

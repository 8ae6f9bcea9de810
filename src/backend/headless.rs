//! A backend that creates no device objects at all.
//!
//! Every create call hands out a fresh fake handle and remembers what was asked for, every destroy call forgets it
//! again. This makes the whole graph compiler observable without a GPU: tests and tools can inspect which objects
//! exist, with which usage and size, which binding set writes were issued, and which frames were waited on.
//! Allocation failures can be injected to exercise error paths.

use std::collections::HashMap;

use anyhow::Result;
use ash::vk;
use ash::vk::Handle;

use crate::backend::{
    Backend, BufferCreateInfo, FramebufferCreateInfo, ImageCreateInfo, ImageViewCreateInfo, SurfaceImage,
};
use crate::descriptor::descriptor_pool::BindingPoolSize;
use crate::descriptor::layout::BindingSetLayout;
use crate::descriptor::write::ResolvedWrite;
use crate::Error;

const SURFACE_IMAGE_COUNT: u32 = 3;

/// Backend without a device, for tests and offline inspection.
#[derive(Debug)]
pub struct HeadlessBackend {
    frames_in_flight: usize,
    surface: vk::Extent2D,
    next_handle: u64,
    surface_images: Vec<vk::Image>,
    images: HashMap<vk::Image, ImageCreateInfo>,
    views: HashMap<vk::ImageView, ImageViewCreateInfo>,
    buffers: HashMap<vk::Buffer, BufferCreateInfo>,
    framebuffers: HashMap<vk::Framebuffer, FramebufferCreateInfo>,
    layouts: HashMap<vk::DescriptorSetLayout, BindingSetLayout>,
    pools: HashMap<vk::DescriptorPool, BindingPoolSize>,
    sets: HashMap<vk::DescriptorSet, vk::DescriptorPool>,
    writes: Vec<ResolvedWrite>,
    waits: Vec<usize>,
    idle_waits: usize,
    destroyed: usize,
    allocations_left: Option<usize>,
}

impl HeadlessBackend {
    /// Create a headless backend with a surface of the given size.
    pub fn new(frames_in_flight: usize, width: u32, height: u32) -> Self {
        let mut backend = Self {
            frames_in_flight: frames_in_flight.max(1),
            surface: vk::Extent2D {
                width,
                height,
            },
            next_handle: 1,
            surface_images: vec![],
            images: HashMap::new(),
            views: HashMap::new(),
            buffers: HashMap::new(),
            framebuffers: HashMap::new(),
            layouts: HashMap::new(),
            pools: HashMap::new(),
            sets: HashMap::new(),
            writes: vec![],
            waits: vec![],
            idle_waits: 0,
            destroyed: 0,
            allocations_left: None,
        };
        backend.surface_images = (0..SURFACE_IMAGE_COUNT)
            .map(|_| vk::Image::from_raw(backend.next_raw()))
            .collect();
        backend
    }

    fn next_raw(&mut self) -> u64 {
        let raw = self.next_handle;
        self.next_handle += 1;
        raw
    }

    /// Consume one allocation from the failure budget.
    fn allocate(&mut self, what: &str) -> Result<u64> {
        if let Some(left) = self.allocations_left.as_mut() {
            if *left == 0 {
                return Err(Error::AllocationFailed(what.to_owned()).into());
            }
            *left -= 1;
        }
        Ok(self.next_raw())
    }

    /// Change the size of the output surface, as if the window was resized.
    pub fn set_surface_extent(&mut self, width: u32, height: u32) {
        self.surface = vk::Extent2D {
            width,
            height,
        };
    }

    /// Let the next `count` images, views, buffers and framebuffers succeed, and fail every one after that.
    pub fn fail_allocations_after(&mut self, count: usize) {
        self.allocations_left = Some(count);
    }

    /// Stop injecting allocation failures.
    pub fn clear_allocation_failures(&mut self) {
        self.allocations_left = None;
    }

    /// All live images.
    pub fn images(&self) -> &HashMap<vk::Image, ImageCreateInfo> {
        &self.images
    }

    /// Find a live image by its debug name.
    pub fn image_named(&self, name: &str) -> Option<(vk::Image, &ImageCreateInfo)> {
        self.images
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(image, info)| (*image, info))
    }

    /// All live image views.
    pub fn views(&self) -> &HashMap<vk::ImageView, ImageViewCreateInfo> {
        &self.views
    }

    /// Find a live image view by its debug name.
    pub fn view_named(&self, name: &str) -> Option<(vk::ImageView, &ImageViewCreateInfo)> {
        self.views
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(view, info)| (*view, info))
    }

    /// All live buffers.
    pub fn buffers(&self) -> &HashMap<vk::Buffer, BufferCreateInfo> {
        &self.buffers
    }

    /// Find a live buffer by its debug name.
    pub fn buffer_named(&self, name: &str) -> Option<(vk::Buffer, &BufferCreateInfo)> {
        self.buffers
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(buffer, info)| (*buffer, info))
    }

    /// All live framebuffers.
    pub fn framebuffers(&self) -> &HashMap<vk::Framebuffer, FramebufferCreateInfo> {
        &self.framebuffers
    }

    /// Number of live binding set layouts.
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// All live binding set pools.
    pub fn pools(&self) -> &HashMap<vk::DescriptorPool, BindingPoolSize> {
        &self.pools
    }

    /// Number of live binding sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Every binding set write issued so far, in order.
    pub fn writes(&self) -> &[ResolvedWrite] {
        &self.writes
    }

    /// Forget all recorded writes.
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Every frame index passed to [`Backend::wait_for_frame()`], in order.
    pub fn waits(&self) -> &[usize] {
        &self.waits
    }

    /// Number of calls to [`Backend::wait_idle()`].
    pub fn idle_waits(&self) -> usize {
        self.idle_waits
    }

    /// Number of objects destroyed so far.
    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Number of live images, views, buffers and framebuffers.
    pub fn live_object_count(&self) -> usize {
        self.images.len() + self.views.len() + self.buffers.len() + self.framebuffers.len()
    }

    fn forget<K: std::hash::Hash + Eq + std::fmt::Debug, V>(map: &mut HashMap<K, V>, key: K, destroyed: &mut usize) {
        if map.remove(&key).is_some() {
            *destroyed += 1;
        } else {
            warn!("Destroying unknown object {key:?}");
        }
    }
}

impl Backend for HeadlessBackend {
    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn surface_extent(&self) -> vk::Extent2D {
        self.surface
    }

    fn surface_image(&self, index: u32) -> Result<SurfaceImage> {
        let image = self
            .surface_images
            .get(index as usize)
            .copied()
            .ok_or(Error::Uncategorized("surface image index out of range"))?;
        Ok(SurfaceImage {
            image,
            extent: self.surface,
        })
    }

    fn create_image(&mut self, info: &ImageCreateInfo) -> Result<vk::Image> {
        let image = vk::Image::from_raw(self.allocate(&info.name)?);
        self.images.insert(image, info.clone());
        Ok(image)
    }

    fn destroy_image(&mut self, image: vk::Image) {
        Self::forget(&mut self.images, image, &mut self.destroyed);
    }

    fn create_image_view(&mut self, info: &ImageViewCreateInfo) -> Result<vk::ImageView> {
        let view = vk::ImageView::from_raw(self.allocate(&info.name)?);
        self.views.insert(view, info.clone());
        Ok(view)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        Self::forget(&mut self.views, view, &mut self.destroyed);
    }

    fn create_buffer(&mut self, info: &BufferCreateInfo) -> Result<vk::Buffer> {
        let buffer = vk::Buffer::from_raw(self.allocate(&info.name)?);
        self.buffers.insert(buffer, info.clone());
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: vk::Buffer) {
        Self::forget(&mut self.buffers, buffer, &mut self.destroyed);
    }

    fn create_framebuffer(&mut self, info: &FramebufferCreateInfo) -> Result<vk::Framebuffer> {
        let framebuffer = vk::Framebuffer::from_raw(self.allocate(&info.name)?);
        self.framebuffers.insert(framebuffer, info.clone());
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&mut self, framebuffer: vk::Framebuffer) {
        Self::forget(&mut self.framebuffers, framebuffer, &mut self.destroyed);
    }

    fn create_binding_set_layout(&mut self, layout: &BindingSetLayout) -> Result<vk::DescriptorSetLayout> {
        let handle = vk::DescriptorSetLayout::from_raw(self.next_raw());
        self.layouts.insert(handle, layout.clone());
        Ok(handle)
    }

    fn destroy_binding_set_layout(&mut self, layout: vk::DescriptorSetLayout) {
        Self::forget(&mut self.layouts, layout, &mut self.destroyed);
    }

    fn create_binding_set_pool(&mut self, size: &BindingPoolSize) -> Result<vk::DescriptorPool> {
        let pool = vk::DescriptorPool::from_raw(self.next_raw());
        self.pools.insert(pool, size.clone());
        Ok(pool)
    }

    fn destroy_binding_set_pool(&mut self, pool: vk::DescriptorPool) {
        self.sets.retain(|_, owner| *owner != pool);
        Self::forget(&mut self.pools, pool, &mut self.destroyed);
    }

    fn allocate_binding_sets(
        &mut self,
        pool: vk::DescriptorPool,
        layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Vec<vk::DescriptorSet>> {
        let capacity = self
            .pools
            .get(&pool)
            .map(|size| size.max_sets as usize)
            .ok_or(Error::Uncategorized("allocating from an unknown binding set pool"))?;
        let used = self.sets.values().filter(|owner| **owner == pool).count();
        if used + layouts.len() > capacity {
            return Err(Error::VkError(vk::Result::ERROR_OUT_OF_POOL_MEMORY).into());
        }
        let sets = layouts
            .iter()
            .map(|_| vk::DescriptorSet::from_raw(self.next_raw()))
            .collect::<Vec<_>>();
        for set in &sets {
            self.sets.insert(*set, pool);
        }
        Ok(sets)
    }

    fn write_binding_sets(&mut self, writes: &[ResolvedWrite]) {
        self.writes.extend_from_slice(writes);
    }

    fn wait_for_frame(&mut self, frame_index: usize) -> Result<()> {
        self.waits.push(frame_index);
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.idle_waits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_info(name: &str) -> ImageCreateInfo {
        ImageCreateInfo {
            name: name.to_owned(),
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width: 4,
                height: 4,
                depth: 1,
            },
            mip_levels: 1,
            layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            usage: vk::ImageUsageFlags::SAMPLED,
        }
    }

    #[test]
    fn handles_are_unique_and_tracked() {
        let mut backend = HeadlessBackend::new(2, 64, 64);
        let a = backend.create_image(&image_info("a")).unwrap();
        let b = backend.create_image(&image_info("b")).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.image_named("b").map(|(image, _)| image), Some(b));
        backend.destroy_image(a);
        assert_eq!(backend.images().len(), 1);
        assert_eq!(backend.destroyed_count(), 1);
    }

    #[test]
    fn injected_failures() {
        let mut backend = HeadlessBackend::new(1, 64, 64);
        backend.fail_allocations_after(1);
        assert!(backend.create_image(&image_info("ok")).is_ok());
        let err = backend.create_image(&image_info("fails")).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::AllocationFailed(name)) if name == "fails"));
        backend.clear_allocation_failures();
        assert!(backend.create_image(&image_info("ok again")).is_ok());
    }

    #[test]
    fn surface_images_follow_surface_size() {
        let mut backend = HeadlessBackend::new(2, 64, 32);
        backend.set_surface_extent(128, 16);
        let image = backend.surface_image(0).unwrap();
        assert_eq!(image.extent.width, 128);
        assert!(backend.surface_image(SURFACE_IMAGE_COUNT).is_err());
    }
}

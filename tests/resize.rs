use std::collections::HashSet;

use anyhow::Result;

use deimos::descriptor::write::Descriptor;
use deimos::prelude::*;

mod framework;

struct Scene {
    graph: RenderGraph<HeadlessBackend>,
    color: ResourceId,
    lut: ResourceId,
    per_pixel: ResourceId,
    draw: PassId,
    post: PassId,
}

fn make_scene() -> Result<Scene> {
    let mut graph = framework::make_graph_with_settings(2, |settings| settings.present("color"));
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::in_flight());
    let lut = graph.declare_texture(
        "lut",
        TextureDesc::new(vk::Format::R8G8B8A8_UNORM, ImageExtent::absolute_2d(64, 64)),
        ResourceFlags::persistent(),
    );
    let per_pixel = graph.declare_buffer(
        "per_pixel",
        BufferDesc::new(BufferSize::PerPixel {
            stride: 16,
            scale: 1.0,
        }),
        ResourceFlags::transient(),
    );
    graph.add_pass(PassBuilder::compute("classify").read(lut).write(per_pixel).build())?;
    let draw = graph.add_pass(
        PassBuilder::graphics("draw")
            .read(per_pixel)
            .clear_color_target(color, ClearColor::Float([0.0; 4]))
            .build(),
    )?;
    let post = graph.add_pass(PassBuilder::compute("post").sample(color).sample(lut).build())?;

    let layout = BindingSetLayout::new()
        .slot(0, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, vk::ShaderStageFlags::COMPUTE)
        .slot(1, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 1, vk::ShaderStageFlags::COMPUTE)
        .slot(2, vk::DescriptorType::STORAGE_BUFFER, 1, vk::ShaderStageFlags::COMPUTE);
    graph.manage_binding_set("post", &layout, SetMode::InFlight)?;
    graph.update_binding_set("post", BindingWrite::sampled_image(0, post, color, vk::Sampler::null()))?;
    graph.update_binding_set("post", BindingWrite::sampled_image(1, post, lut, vk::Sampler::null()))?;
    graph.update_binding_set("post", BindingWrite::storage_buffer(2, per_pixel))?;
    graph.compile_ahead_of_time()?;

    Ok(Scene {
        graph,
        color,
        lut,
        per_pixel,
        draw,
        post,
    })
}

fn snapshot(graph: &RenderGraph<HeadlessBackend>) -> (HashSet<vk::Image>, HashSet<vk::ImageView>, HashSet<vk::Framebuffer>) {
    let backend = graph.backend();
    (
        backend.images().keys().copied().collect(),
        backend.views().keys().copied().collect(),
        backend.framebuffers().keys().copied().collect(),
    )
}

#[test]
fn resizing_to_the_same_size_is_a_no_op() -> Result<()> {
    let mut scene = make_scene()?;
    framework::record_frames(&mut scene.graph, 2)?;
    let before = snapshot(&scene.graph);
    let writes = scene.graph.backend().writes().len();
    let view = scene.graph.view(scene.post, scene.color, 0)?;

    scene.graph.on_output_resize(vk::Extent2D {
        width: framework::SURFACE_WIDTH,
        height: framework::SURFACE_HEIGHT,
    })?;
    framework::record_frames(&mut scene.graph, 2)?;

    assert_eq!(snapshot(&scene.graph), before);
    assert_eq!(scene.graph.backend().writes().len(), writes);
    assert_eq!(scene.graph.view(scene.post, scene.color, 0)?, view);
    assert_eq!(scene.graph.retired_count(), 0);
    assert_eq!(scene.graph.backend().destroyed_count(), 0);
    Ok(())
}

#[test]
fn surface_relative_resources_are_recreated() -> Result<()> {
    let mut scene = make_scene()?;
    framework::record_frames(&mut scene.graph, 2)?;
    let old_color = scene.graph.physical(scene.color)?.image(0);
    let old_lut = scene.graph.physical(scene.lut)?.image(0);
    let old_buffer = scene.graph.physical(scene.per_pixel)?.buffer(0);
    let old_view = scene.graph.view(scene.post, scene.color, 1)?;
    let old_lut_view = scene.graph.view(scene.post, scene.lut, 1)?;
    let old_framebuffer = scene.graph.framebuffer(scene.draw, 0);

    scene.graph.backend_mut().set_surface_extent(1024, 768);
    scene.graph.on_output_resize(vk::Extent2D {
        width: 1024,
        height: 768,
    })?;

    let color = scene.graph.physical(scene.color)?;
    assert_ne!(color.image(0), old_color);
    assert_eq!((color.extent().width, color.extent().height), (1024, 768));
    assert_eq!(color.last_observed(0), AccessState::UNDEFINED);
    assert_eq!(scene.graph.physical(scene.lut)?.image(0), old_lut);
    assert_ne!(scene.graph.physical(scene.per_pixel)?.buffer(0), old_buffer);
    assert_eq!(scene.graph.physical(scene.per_pixel)?.size(), 16 * 1024 * 768);
    assert_ne!(scene.graph.view(scene.post, scene.color, 1)?, old_view);
    assert_eq!(scene.graph.view(scene.post, scene.lut, 1)?, old_lut_view);
    assert_ne!(scene.graph.framebuffer(scene.draw, 0), old_framebuffer);
    assert_eq!(scene.graph.surface_extent().width, 1024);

    let framebuffer = scene.graph.framebuffer(scene.draw, 1).expect("draw framebuffer was rebuilt");
    let info = &scene.graph.backend().framebuffers()[&framebuffer];
    assert_eq!(info.name, "draw@1");
    assert_eq!((info.width, info.height), (1024, 768));
    Ok(())
}

#[test]
fn old_objects_are_destroyed_after_the_retire_delay() -> Result<()> {
    let mut scene = make_scene()?;
    framework::record_frames(&mut scene.graph, 2)?;
    let live = scene.graph.backend().live_object_count();

    scene.graph.on_output_resize(vk::Extent2D {
        width: 640,
        height: 480,
    })?;
    // 2 color images, 4 color views, 1 buffer, 2 framebuffers.
    assert_eq!(scene.graph.retired_count(), 9);
    assert_eq!(scene.graph.backend().live_object_count(), live + 9);

    scene.graph.record_frame(0, 0)?;
    assert_eq!(scene.graph.backend().destroyed_count(), 0);
    scene.graph.record_frame(1, 0)?;
    assert_eq!(scene.graph.backend().destroyed_count(), 9);
    assert_eq!(scene.graph.retired_count(), 0);
    assert_eq!(scene.graph.backend().live_object_count(), live);
    Ok(())
}

#[test]
fn binding_writes_follow_recreated_resources() -> Result<()> {
    let mut scene = make_scene()?;
    scene.graph.backend_mut().clear_writes();

    scene.graph.on_output_resize(vk::Extent2D {
        width: 1920,
        height: 1080,
    })?;

    assert_eq!(scene.graph.backend().idle_waits(), 1);

    // The color and buffer writes are issued again for both frame sets, the lut write is untouched.
    let writes = scene.graph.backend().writes().to_vec();
    assert_eq!(writes.len(), 4);
    assert!(writes.iter().all(|write| write.binding != 1));
    for frame in 0..2 {
        let set = scene.graph.binding_set("post", frame)?;
        let view = scene.graph.view(scene.post, scene.color, frame)?;
        assert!(writes.iter().any(|write| write.set == set
            && matches!(write.descriptor, Descriptor::Image { view: written, .. } if written == view)));
    }
    Ok(())
}

#[test]
fn failed_resize_keeps_old_objects_and_can_be_retried() -> Result<()> {
    let mut scene = make_scene()?;
    framework::record_frames(&mut scene.graph, 2)?;
    let old_framebuffer = scene.graph.framebuffer(scene.draw, 0);
    let old_buffer = scene.graph.physical(scene.per_pixel)?.buffer(0);
    scene.graph.backend_mut().clear_writes();

    // The color images and their views succeed, the per-pixel buffer and the draw framebuffers fail.
    scene.graph.backend_mut().set_surface_extent(1024, 768);
    scene.graph.backend_mut().fail_allocations_after(6);
    let err = scene
        .graph
        .on_output_resize(vk::Extent2D {
            width: 1024,
            height: 768,
        })
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::AllocationFailed(_))));

    let color = scene.graph.physical(scene.color)?;
    assert_eq!((color.extent().width, color.extent().height), (1024, 768));
    let per_pixel = scene.graph.physical(scene.per_pixel)?;
    assert_eq!(per_pixel.buffer(0), old_buffer);
    assert_eq!(per_pixel.size(), 16 * u64::from(framework::SURFACE_WIDTH * framework::SURFACE_HEIGHT));
    // No framebuffer may keep pointing at the retired color views.
    assert_ne!(scene.graph.framebuffer(scene.draw, 0), old_framebuffer);
    assert_eq!(scene.graph.framebuffer(scene.draw, 0), None);
    assert_eq!(scene.graph.surface_extent().width, framework::SURFACE_WIDTH);
    // 2 color images, 4 color views, 2 framebuffers.
    assert_eq!(scene.graph.retired_count(), 8);
    // Only the color write was issued again, once per frame set.
    let writes = scene.graph.backend().writes().to_vec();
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|write| write.binding == 0));

    scene.graph.backend_mut().clear_allocation_failures();
    scene.graph.on_output_resize(vk::Extent2D {
        width: 1024,
        height: 768,
    })?;
    assert_eq!(scene.graph.physical(scene.per_pixel)?.size(), 16 * 1024 * 768);
    assert_eq!(scene.graph.surface_extent().width, 1024);
    let framebuffer = scene.graph.framebuffer(scene.draw, 0).expect("draw framebuffer was rebuilt");
    let info = &scene.graph.backend().framebuffers()[&framebuffer];
    assert_eq!(info.name, "draw@0");
    assert_eq!((info.width, info.height), (1024, 768));
    framework::record_frames(&mut scene.graph, 4)?;

    scene.graph.destroy();
    assert_eq!(scene.graph.backend().live_object_count(), 0);
    Ok(())
}

#[test]
fn resize_before_compile_only_stores_the_size() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::transient());
    graph.add_pass(PassBuilder::graphics("draw").load_target(color).build())?;
    graph.on_output_resize(vk::Extent2D {
        width: 320,
        height: 200,
    })?;
    assert_eq!(graph.surface_extent().width, 320);
    assert!(graph.backend().images().is_empty());

    // Compilation uses the size reported by the backend.
    graph.compile_ahead_of_time()?;
    let extent = graph.physical(color)?.extent();
    assert_eq!((extent.width, extent.height), (framework::SURFACE_WIDTH, framework::SURFACE_HEIGHT));
    Ok(())
}

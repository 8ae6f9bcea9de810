use anyhow::Result;

use deimos::prelude::*;

mod framework;

#[test]
fn multiplicity_follows_resource_flags() -> Result<()> {
    let mut graph = framework::make_graph(3);
    let overlapping = graph.declare_texture("overlapping", framework::color_texture(), ResourceFlags::in_flight());
    let persistent = graph.declare_texture(
        "persistent",
        framework::color_texture(),
        ResourceFlags {
            persistent: true,
            allow_in_flight_overlap: true,
        },
    );
    let transient = graph.declare_texture("transient", framework::color_texture(), ResourceFlags::transient());
    graph.add_pass(
        PassBuilder::compute("write")
            .write(overlapping)
            .write(persistent)
            .write(transient)
            .build(),
    )?;
    graph.compile_ahead_of_time()?;

    assert_eq!(graph.physical(overlapping)?.allocation_count(), 3);
    assert_eq!(graph.physical(persistent)?.allocation_count(), 1);
    assert_eq!(graph.physical(transient)?.allocation_count(), 1);

    let backend = graph.backend();
    assert!(backend.image_named("overlapping@0").is_some());
    assert!(backend.image_named("overlapping@2").is_some());
    assert!(backend.image_named("persistent").is_some());
    assert_eq!(backend.images().len(), 5);

    // Every frame slot of a multiplied resource gets its own image, shared resources reuse theirs.
    let physical = graph.physical(overlapping)?;
    assert_ne!(physical.image(0), physical.image(1));
    let physical = graph.physical(transient)?;
    assert_eq!(physical.image(0), physical.image(2));
    Ok(())
}

#[test]
fn views_are_created_per_pass_and_frame() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::in_flight());
    let draw = graph.add_pass(
        PassBuilder::graphics("draw")
            .clear_color_target(color, ClearColor::Float([0.0; 4]))
            .build(),
    )?;
    let post = graph.add_pass(PassBuilder::graphics("post").sample(color).build())?;
    graph.compile_ahead_of_time()?;

    let backend = graph.backend();
    assert_eq!(backend.views().len(), 4);
    let (view, info) = backend.view_named("draw::color@1").expect("render target view exists");
    assert_eq!(graph.view(draw, color, 1)?, view);
    assert_eq!(info.aspect, vk::ImageAspectFlags::COLOR);
    assert!(backend.view_named("post::color@0").is_some());
    assert_ne!(graph.view(draw, color, 0)?, graph.view(post, color, 0)?);
    Ok(())
}

#[test]
fn usage_is_inferred_from_touches() -> Result<()> {
    let mut graph = framework::make_graph_with_settings(1, |settings| settings.present("color"));
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::transient());
    let depth = graph.declare_texture(
        "depth",
        TextureDesc::new(vk::Format::D24_UNORM_S8_UINT, ImageExtent::surface()),
        ResourceFlags::transient(),
    );
    let particles = graph.declare_buffer(
        "particles",
        framework::fixed_buffer(1024).usage(vk::BufferUsageFlags::VERTEX_BUFFER),
        ResourceFlags::transient(),
    );
    graph.add_pass(PassBuilder::compute("simulate").write(particles).build())?;
    graph.add_pass(
        PassBuilder::graphics("draw")
            .clear_color_target(color, ClearColor::Float([0.0; 4]))
            .clear_depth_target(depth, ClearDepthStencil::default())
            .build(),
    )?;
    graph.add_pass(PassBuilder::graphics("outline").sample(depth).build())?;
    graph.compile_ahead_of_time()?;

    let color = graph.physical(color)?.image_usage();
    assert!(color.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC));
    assert!(!color.contains(vk::ImageUsageFlags::SAMPLED));

    let depth = graph.physical(depth)?;
    assert!(depth
        .image_usage()
        .contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED));
    assert_eq!(depth.aspect(), vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL);

    let particles = graph.physical(particles)?.buffer_usage();
    assert!(particles.contains(vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::VERTEX_BUFFER));
    Ok(())
}

#[test]
fn extents_resolve_against_the_surface() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let half = graph.declare_texture(
        "half",
        TextureDesc::new(vk::Format::R16G16B16A16_SFLOAT, ImageExtent::SurfaceRelative {
            scale_x: 0.5,
            scale_y: 0.5,
        }),
        ResourceFlags::transient(),
    );
    let lut = graph.declare_texture(
        "lut",
        TextureDesc::new(vk::Format::R8_UNORM, ImageExtent::absolute_2d(32, 16)),
        ResourceFlags::persistent(),
    );
    let per_pixel = graph.declare_buffer(
        "per_pixel",
        BufferDesc::new(BufferSize::PerPixel {
            stride: 4,
            scale: 1.0,
        }),
        ResourceFlags::transient(),
    );
    graph.add_pass(PassBuilder::compute("work").write(half).read(lut).write(per_pixel).build())?;
    graph.compile_ahead_of_time()?;

    let extent = graph.physical(half)?.extent();
    assert_eq!((extent.width, extent.height), (framework::SURFACE_WIDTH / 2, framework::SURFACE_HEIGHT / 2));
    let extent = graph.physical(lut)?.extent();
    assert_eq!((extent.width, extent.height, extent.depth), (32, 16, 1));
    assert_eq!(
        graph.physical(per_pixel)?.size(),
        4 * framework::SURFACE_WIDTH as u64 * framework::SURFACE_HEIGHT as u64
    );
    Ok(())
}

#[test]
fn framebuffers_follow_target_multiplicity() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let overlapping = graph.declare_texture("overlapping", framework::color_texture(), ResourceFlags::in_flight());
    let shared = graph.declare_texture("shared", framework::color_texture(), ResourceFlags::transient());
    let a = graph.add_pass(PassBuilder::graphics("a").load_target(overlapping).build())?;
    let b = graph.add_pass(PassBuilder::graphics("b").load_target(shared).build())?;
    let compute = graph.add_pass(PassBuilder::compute("c").read(shared).build())?;
    graph.compile_ahead_of_time()?;

    assert_ne!(graph.framebuffer(a, 0), graph.framebuffer(a, 1));
    assert_eq!(graph.framebuffer(b, 0), graph.framebuffer(b, 1));
    assert!(graph.framebuffer(compute, 0).is_none());
    assert_eq!(graph.backend().framebuffers().len(), 3);

    let (_, info) = graph
        .backend()
        .framebuffers()
        .iter()
        .find(|(_, info)| info.name == "b")
        .expect("framebuffer of `b` exists");
    assert_eq!((info.width, info.height, info.layers), (framework::SURFACE_WIDTH, framework::SURFACE_HEIGHT, 1));
    assert_eq!(info.attachments.len(), 1);
    assert_eq!(info.attachments[0].layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    Ok(())
}

#[test]
fn untouched_resources_are_not_allocated() -> Result<()> {
    let mut graph = framework::make_graph(1);
    let unused = graph.declare_texture("unused", framework::color_texture(), ResourceFlags::transient());
    let used = graph.declare_buffer("used", framework::fixed_buffer(16), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("write").write(used).build())?;
    graph.compile_ahead_of_time()?;

    assert!(graph.physical(unused).is_err());
    assert!(graph.physical(used).is_ok());
    assert!(graph.backend().images().is_empty());
    Ok(())
}

#[test]
fn allocation_failures_are_reported() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::in_flight());
    graph.add_pass(PassBuilder::graphics("draw").load_target(color).build())?;
    // Both images succeed, the first view fails.
    graph.backend_mut().fail_allocations_after(2);

    let err = graph.compile_ahead_of_time().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::AllocationFailed(_))));
    assert!(!graph.is_compiled());
    assert!(matches!(
        graph.record_frame(0, 0).unwrap_err().downcast_ref::<Error>(),
        Some(Error::NotCompiled)
    ));
    // Nothing from the failed attempt is left behind.
    assert_eq!(graph.backend().live_object_count(), 0);

    graph.backend_mut().clear_allocation_failures();
    graph.compile_ahead_of_time()?;
    assert_eq!(graph.backend().images().len(), 2);
    assert_eq!(graph.backend().views().len(), 2);
    framework::record_frames(&mut graph, 2)?;

    graph.destroy();
    assert_eq!(graph.backend().live_object_count(), 0);
    Ok(())
}

#[test]
fn failing_framebuffers_release_the_whole_graph() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::in_flight());
    let data = graph.declare_buffer("data", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(data).build())?;
    graph.add_pass(PassBuilder::graphics("draw").read(data).load_target(color).build())?;
    // Two images, two views, one buffer and the first framebuffer succeed.
    graph.backend_mut().fail_allocations_after(6);

    let err = graph.compile_ahead_of_time().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::AllocationFailed(_))));
    assert_eq!(graph.backend().live_object_count(), 0);
    assert_eq!(graph.backend().destroyed_count(), 6);
    Ok(())
}

#[test]
fn destroy_releases_every_object() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::in_flight());
    let data = graph.declare_buffer("data", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(data).build())?;
    graph.add_pass(PassBuilder::graphics("draw").read(data).load_target(color).build())?;
    graph.compile_ahead_of_time()?;
    framework::record_frames(&mut graph, 4)?;
    assert!(graph.backend().live_object_count() > 0);

    graph.destroy();
    assert_eq!(graph.backend().live_object_count(), 0);
    assert_eq!(graph.backend().set_count(), 0);
    assert_eq!(graph.backend().layout_count(), 0);
    Ok(())
}

#[test]
fn present_composites_into_the_surface() -> Result<()> {
    let mut graph = framework::make_graph_with_settings(2, |settings| settings.present("color"));
    let color = graph.declare_texture("color", framework::color_texture(), ResourceFlags::in_flight());
    graph.add_pass(
        PassBuilder::graphics("draw")
            .clear_color_target(color, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))
            .build(),
    )?;
    graph.compile_ahead_of_time()?;

    let commands = graph.record_frame(1, 2)?;
    let surface = graph.backend().surface_image(2)?;
    let blit = commands
        .iter()
        .find_map(|command| match command {
            Command::Blit {
                src,
                dst,
                ..
            } => Some((*src, *dst)),
            _ => None,
        })
        .expect("present blit is recorded");
    assert_eq!(blit, (graph.physical(color)?.image(1).expect("color is an image"), surface.image));

    let surface_barriers = commands
        .image_barriers()
        .filter(|barrier| barrier.resource.is_none())
        .collect::<Vec<_>>();
    assert_eq!(surface_barriers.len(), 2);
    assert_eq!(surface_barriers[0].dst.layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(surface_barriers[1].dst.layout, vk::ImageLayout::PRESENT_SRC_KHR);

    // The render target is transitioned for the copy, which is what the slot remembers for next time.
    let to_source = framework::image_barriers_for(&commands, color);
    assert_eq!(to_source.last().map(|barrier| barrier.dst.layout), Some(vk::ImageLayout::TRANSFER_SRC_OPTIMAL));
    assert_eq!(graph.physical(color)?.last_observed(1).layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    assert_eq!(graph.physical(color)?.last_observed(0), AccessState::UNDEFINED);
    Ok(())
}

#[test]
fn recording_validates_frame_index() -> Result<()> {
    let mut graph = framework::make_graph(2);
    let data = graph.declare_buffer("data", framework::fixed_buffer(64), ResourceFlags::transient());
    graph.add_pass(PassBuilder::compute("fill").write(data).build())?;
    graph.compile_ahead_of_time()?;

    let err = graph.record_frame(2, 0).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::FrameIndexOutOfRange(2))));
    framework::record_frames(&mut graph, 3)?;
    assert_eq!(graph.backend().waits(), &[0, 1, 0]);
    Ok(())
}

//! wgpu blit renderer for the preview window.
//!
//! A single RGBA8 texture is uploaded per frame and drawn as a fullscreen
//! triangle. The surface is configured once at the camera resolution; the
//! window is not resizable.

use anyhow::{anyhow, Context, Result};
use wgpu::*;
use winit::window::Window;

const BACKGROUND: Color = Color::BLACK;

pub(crate) struct Gpu {
    device: Device,
    queue: Queue,
    adapter: Adapter,
}

impl Gpu {
    async fn open(instance: &Instance, surface: &Surface) -> Result<Self> {
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::LowPower,
                force_fallback_adapter: false,
                compatible_surface: Some(surface),
            })
            .await
            .ok_or_else(|| anyhow!("no compatible graphics adapter found"))?;
        log::info!("graphics adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor::default(), None)
            .await
            .context("failed to open graphics device")?;

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }
}

struct FrameTexture {
    inner: wgpu::Texture,
    size: Extent3d,
    format: TextureFormat,
}

impl FrameTexture {
    fn empty(gpu: &Gpu) -> Self {
        let format = TextureFormat::Rgba8UnormSrgb;
        Self {
            inner: gpu.device.create_texture(&TextureDescriptor {
                label: Some("frame"),
                size: Extent3d::default(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                format,
                view_formats: &[],
            }),
            size: Extent3d::default(),
            format,
        }
    }

    /// Upload pixel data, reallocating on size change. Returns true when the
    /// texture was reallocated (bind group must be rebuilt).
    fn update(&mut self, gpu: &Gpu, size: Extent3d, data: &[u8]) -> Result<bool> {
        if (size.width * size.height * 4) as usize != data.len() {
            return Err(anyhow!(
                "texture upload of {} bytes does not match {}x{} RGBA",
                data.len(),
                size.width,
                size.height
            ));
        }

        let mut reallocated = false;
        if self.size != size {
            log::trace!(
                "reallocating frame texture ({}x{} -> {}x{})",
                self.size.width,
                self.size.height,
                size.width,
                size.height
            );
            reallocated = true;
            self.inner = gpu.device.create_texture(&TextureDescriptor {
                label: Some("frame"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: self.format,
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                view_formats: &[],
            });
            self.size = size;
        }

        gpu.queue.write_texture(
            ImageCopyTexture {
                texture: &self.inner,
                mip_level: 0,
                origin: Origin3d::default(),
                aspect: TextureAspect::All,
            },
            data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: None,
            },
            size,
        );

        Ok(reallocated)
    }
}

pub(crate) struct Renderer {
    gpu: Gpu,
    surface: Surface,
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,
    texture: FrameTexture,
    /// Surface must be destroyed before the window; field order matters.
    window: Window,
}

impl Renderer {
    pub(crate) fn new(instance: Instance, window: Window) -> Result<Self> {
        let surface = unsafe { instance.create_surface(&window)? };
        let gpu = pollster::block_on(Gpu::open(&instance, &surface))?;

        let surface_format = *surface
            .get_capabilities(&gpu.adapter)
            .formats
            .first()
            .ok_or_else(|| anyhow!("adapter cannot render to window surface"))?;

        let shader = gpu.device.create_shader_module(ShaderModuleDescriptor {
            label: Some("fullscreen texture shader"),
            source: ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = gpu
            .device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: None,
                entries: &[
                    BindGroupLayoutEntry {
                        binding: 0,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Texture {
                            sample_type: TextureSampleType::Float { filterable: false },
                            view_dimension: TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    BindGroupLayoutEntry {
                        binding: 1,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Sampler(SamplerBindingType::NonFiltering),
                        count: None,
                    },
                ],
            });

        let pipeline = gpu
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some("textured_quad"),
                layout: Some(&gpu.device.create_pipeline_layout(
                    &PipelineLayoutDescriptor {
                        label: None,
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    },
                )),
                vertex: VertexState {
                    module: &shader,
                    entry_point: "vert",
                    buffers: &[],
                },
                fragment: Some(FragmentState {
                    module: &shader,
                    entry_point: "frag",
                    targets: &[Some(ColorTargetState {
                        format: surface_format,
                        write_mask: ColorWrites::ALL,
                        blend: None,
                    })],
                }),
                primitive: PrimitiveState::default(),
                depth_stencil: None,
                multisample: Default::default(),
                multiview: None,
            });

        let texture = FrameTexture::empty(&gpu);
        let bind_group = create_bind_group(&gpu, &bind_group_layout, &texture);

        let mut this = Self {
            gpu,
            surface,
            pipeline,
            bind_group_layout,
            bind_group,
            texture,
            window,
        };
        this.configure_surface()?;
        Ok(this)
    }

    pub(crate) fn update_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        if self.texture.update(&self.gpu, size, rgba)? {
            // A reallocated texture invalidates the bind group holding it.
            self.bind_group = create_bind_group(&self.gpu, &self.bind_group_layout, &self.texture);
        }
        Ok(())
    }

    pub(crate) fn redraw(&mut self) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {err}");
                self.configure_surface()?;
                self.surface
                    .get_current_texture()
                    .context("failed to acquire frame after reconfiguring surface")?
            }
            Err(err) => return Err(anyhow!("failed to acquire frame: {err}")),
        };

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: None });
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(BACKGROUND),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }

        self.gpu.queue.submit([encoder.finish()]);
        frame.present();
        Ok(())
    }

    fn configure_surface(&mut self) -> Result<()> {
        let surface_format = *self
            .surface
            .get_capabilities(&self.gpu.adapter)
            .formats
            .first()
            .ok_or_else(|| anyhow!("adapter cannot render to window surface"))?;
        let size = self.window.inner_size();
        log::debug!(
            "configuring surface at {}x{} (format: {:?})",
            size.width,
            size.height,
            surface_format
        );
        self.surface.configure(
            &self.gpu.device,
            &SurfaceConfiguration {
                usage: TextureUsages::RENDER_ATTACHMENT,
                format: surface_format,
                width: size.width,
                height: size.height,
                present_mode: PresentMode::Fifo,
                alpha_mode: CompositeAlphaMode::Auto,
                view_formats: Vec::new(),
            },
        );
        Ok(())
    }
}

fn create_bind_group(
    gpu: &Gpu,
    layout: &BindGroupLayout,
    texture: &FrameTexture,
) -> BindGroup {
    let sampler = gpu.device.create_sampler(&SamplerDescriptor::default());
    gpu.device.create_bind_group(&BindGroupDescriptor {
        label: Some("frame_bind_group"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(
                    &texture.inner.create_view(&Default::default()),
                ),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(&sampler),
            },
        ],
    })
}

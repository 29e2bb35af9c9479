use bytemuck::{Pod, Zeroable};

// --- Unit quad, expanded per instance into a disc ---
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
}

impl Vertex2D {
    pub const QUAD_VERTICES: [Self; 4] = [
        Vertex2D { position: [-0.5, -0.5] }, // 0: Bottom-left
        Vertex2D { position: [ 0.5, -0.5] }, // 1: Bottom-right
        Vertex2D { position: [ 0.5,  0.5] }, // 2: Top-right
        Vertex2D { position: [-0.5,  0.5] }, // 3: Top-left
    ];

    pub const QUAD_INDICES: [u16; 6] = [
        0, 1, 2, // First triangle: BL, BR, TR
        0, 2, 3, // Second triangle: BL, TR, TL
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0, // location 0 for base quad position
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

// --- Instance data for discs (nodes and pulse halos) ---
//
// A disc carries two colors; the fragment shader blends from `color_center`
// at the middle to `color_edge` at the rim, which gives the radial-gradient
// fill. A flat halo sets both to the same value.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CircleInstance {
    pub position: [f32; 2],     // disc center, surface pixels
    pub radius: f32,            // pixels
    pub color_center: [f32; 4], // RGBA, linear space
    pub color_edge: [f32; 4],   // RGBA, linear space
}

impl CircleInstance {
    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1, // instance position
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 2, // instance radius
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: (mem::size_of::<[f32; 2]>() + mem::size_of::<f32>())
                        as wgpu::BufferAddress,
                    shader_location: 3, // gradient center color
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: (mem::size_of::<[f32; 2]>()
                        + mem::size_of::<f32>()
                        + mem::size_of::<[f32; 4]>())
                        as wgpu::BufferAddress,
                    shader_location: 4, // gradient edge color
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// --- Vertex data for connection lines ---
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2], // surface pixels
    pub color: [f32; 4],    // RGBA, linear space
}

impl LineVertex {
    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0, // line vertex position
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1, // line vertex color
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

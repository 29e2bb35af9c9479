// Pixel-space projection for the drawable surface.
//
// The animation works in surface pixels with the origin at the top-left and
// y growing downward, so the projection is a fixed orthographic map of
// (0..width, 0..height) onto NDC. There is no camera: the effect is
// decorative and takes no input, only resizes.
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Uniform shared by both pipelines. Padded to a 16-byte boundary.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ViewportUniform {
    pub view_proj: [[f32; 4]; 4],
    /// 1 when the surface format is not sRGB and the shader must convert.
    pub needs_srgb_output_conversion: u32,
    pub _padding: [u32; 3],
}

#[derive(Debug)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width as f32;
            self.height = height as f32;
        }
    }

    /// Maps surface pixels to NDC. Top and bottom are swapped relative to
    /// the usual GL convention so that y points down, matching the
    /// coordinate space the graph lives in.
    pub fn build_projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(0.0, self.width, self.height, 0.0, -1.0, 1.0)
    }

    pub fn uniform(&self, needs_srgb_output_conversion: bool) -> ViewportUniform {
        ViewportUniform {
            view_proj: self.build_projection_matrix().to_cols_array_2d(),
            needs_srgb_output_conversion: needs_srgb_output_conversion as u32,
            _padding: [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec4, Vec4Swizzles};

    fn project(viewport: &Viewport, x: f32, y: f32) -> glam::Vec2 {
        let clip = viewport.build_projection_matrix() * Vec4::new(x, y, 0.0, 1.0);
        clip.xy() / clip.w
    }

    #[test]
    fn corners_map_to_ndc() {
        let viewport = Viewport::new(800, 600);

        let top_left = project(&viewport, 0.0, 0.0);
        assert!((top_left - glam::Vec2::new(-1.0, 1.0)).length() < 1e-5);

        let bottom_right = project(&viewport, 800.0, 600.0);
        assert!((bottom_right - glam::Vec2::new(1.0, -1.0)).length() < 1e-5);

        let center = project(&viewport, 400.0, 300.0);
        assert!(center.length() < 1e-5);
    }

    #[test]
    fn degenerate_resize_is_ignored() {
        let mut viewport = Viewport::new(800, 600);
        viewport.resize(0, 0);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
    }
}

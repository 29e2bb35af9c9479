// sRGB byte colors with conversion into the linear space the pipelines
// blend in.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }

    pub fn into_linear_rgba(self) -> [f32; 4] {
        [
            srgb_channel_to_linear(self.r),
            srgb_channel_to_linear(self.g),
            srgb_channel_to_linear(self.b),
            self.a,
        ]
    }

    pub fn into_linear_wgpu_color(self) -> wgpu::Color {
        let [r, g, b, a] = self.into_linear_rgba();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::rgb(r, g, b)
    }
}

fn srgb_channel_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_are_fixed_points() {
        assert_eq!(Color::rgb(0, 0, 0).into_linear_rgba(), [0.0, 0.0, 0.0, 1.0]);
        let white = Color::rgb(255, 255, 255).into_linear_rgba();
        for channel in &white[..3] {
            assert!((channel - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn mid_gray_expands_per_the_srgb_curve() {
        let [r, ..] = Color::rgb(128, 128, 128).into_linear_rgba();
        // srgb 0.502 -> linear ~0.2158
        assert!((r - 0.2158).abs() < 1e-3);
    }

    #[test]
    fn alpha_passes_through_untouched() {
        let color = Color::rgb(79, 70, 229).with_alpha(0.2);
        let [.., a] = color.into_linear_rgba();
        assert_eq!(a, 0.2);
    }
}

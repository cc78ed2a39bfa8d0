use glam::{Vec2, Vec4};
use image::RgbaImage;

pub fn is_empty(img: &RgbaImage) -> bool {
    img.width() == 0 || img.height() == 0
}

/// Pixel coordinate pairs and the weight of the upper one along one axis,
/// with the coordinates clamped to the image.
fn blerp_axis(coord: f32, dim: u32) -> (u32, u32, f32) {
    // Pixel centres lie at half integers.
    let x = coord * dim as f32 - 0.5;
    let lo = x.floor();
    let w = x - lo;
    let max = (dim - 1) as f32;
    (
        lo.clamp(0.0, max) as u32,
        (lo + 1.0).clamp(0.0, max) as u32,
        w,
    )
}

/// Bilinearly interpolated RGBA at `coord`, in image unit coordinates
/// (`[0, 1]` across the image, Y down). Coordinates outside the image are
/// clamped to its edge. Channels are in `[0, 255]`. An empty image samples
/// as transparent black.
pub fn sample_clip(img: &RgbaImage, coord: Vec2) -> Vec4 {
    if is_empty(img) || !coord.is_finite() {
        return Vec4::ZERO;
    }
    let (x0, x1, wx) = blerp_axis(coord.x, img.width());
    let (y0, y1, wy) = blerp_axis(coord.y, img.height());
    let px = |x, y| Vec4::from_array(img.get_pixel(x, y).0.map(f32::from));
    (px(x0, y0) * (1.0 - wx) + px(x1, y0) * wx) * (1.0 - wy)
        + (px(x0, y1) * (1.0 - wx) + px(x1, y1) * wx) * wy
}

/// Composite a pre-multiplied fragment over a background with the "over"
/// operator. Colours are in `[0, 255]`.
pub fn composite_fragment(fg: Vec4, bg: Vec4) -> Vec4 {
    fg + bg * ((255.0 - fg.w) / 255.0)
}

/// Clamp a colour in `[0, 255]` and round it to 8 bits.
pub fn to_rgba8(c: Vec4) -> image::Rgba<u8> {
    image::Rgba(
        c.clamp(Vec4::ZERO, Vec4::splat(255.0))
            .round()
            .to_array()
            .map(|x| x as u8),
    )
}

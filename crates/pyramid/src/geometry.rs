//! Pure pyramid coordinate math.
//!
//! Image space is the pixel grid of the full-resolution image. Each zoom
//! level `z` views that grid scaled down by `2^(z-1)`, so level 1 is 1:1 and
//! higher levels are successively coarser. Screen space is device pixels,
//! related to image space through the continuous zoom and the viewport
//! offset (the screen position of the image origin).

use foundation::math::Vec2;

/// Image-space units per screen pixel at a continuous zoom.
pub fn zoom_scale(zoom: f64) -> f64 {
    2f64.powf(zoom - 1.0)
}

/// Pixel size of the whole image as seen at `zoom` (continuous).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapSize {
    pub width: f64,
    pub height: f64,
}

pub fn map_size_at_zoom(image_width: u32, image_height: u32, zoom: f64) -> MapSize {
    let scale = zoom_scale(zoom);
    MapSize {
        width: (image_width as f64 / scale).ceil(),
        height: (image_height as f64 / scale).ceil(),
    }
}

pub fn screen_to_image(point: Vec2, current_zoom: f64, offset: Vec2, dpr: f64) -> Vec2 {
    (point.scale(dpr) - offset).scale(zoom_scale(current_zoom))
}

/// Exact inverse of [`screen_to_image`]; round-trips within float tolerance.
pub fn image_to_screen(point: Vec2, current_zoom: f64, offset: Vec2, dpr: f64) -> Vec2 {
    (point.scale(1.0 / zoom_scale(current_zoom)) + offset).scale(1.0 / dpr)
}

/// Screen position of the image origin for a given focal point: the offset
/// that places `center` at the middle of the viewport.
pub fn viewport_offset(center: Vec2, current_zoom: f64, viewport: Vec2) -> Vec2 {
    viewport.scale(0.5) - center.scale(1.0 / zoom_scale(current_zoom))
}

/// Snap a level-space coordinate down to the origin of its tile.
pub fn quantize_to_tile(coordinate: f64, tile_size: u32) -> i64 {
    (coordinate / tile_size as f64).floor() as i64 * tile_size as i64
}

/// Truncate a continuous zoom to one decimal, as the tile resolution does
/// before comparing against the active level.
pub fn truncate_tenth(zoom: f64) -> f64 {
    (zoom * 10.0).floor() / 10.0
}

/// Integer layer for a continuous zoom. Rounded to one decimal first so
/// float noise just below an integer boundary does not flip the level early.
pub fn effective_level(zoom: f64) -> u32 {
    ((zoom * 10.0).round() / 10.0).floor().max(0.0) as u32
}

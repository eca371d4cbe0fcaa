use image::{imageops, RgbaImage};

use crate::shared::face_rect::FaceRect;

/// Crops `rect` out of `image`.
///
/// Parts of the rectangle outside the image come back fully transparent, so
/// the result is always `rect.width × rect.height`.
pub fn crop_padded(image: &RgbaImage, rect: FaceRect) -> RgbaImage {
    let mut out = RgbaImage::new(rect.width, rect.height);
    let (width, height) = image.dimensions();
    if rect.x >= width || rect.y >= height {
        return out;
    }

    let visible_w = rect.width.min(width - rect.x);
    let visible_h = rect.height.min(height - rect.y);
    let visible = imageops::crop_imm(image, rect.x, rect.y, visible_w, visible_h).to_image();
    imageops::replace(&mut out, &visible, 0, 0);
    out
}

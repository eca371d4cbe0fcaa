/// A crop rectangle in pixel coordinates of the searched image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a `width × height` rectangle centered on `(center_x, center_y)`
    /// and shifted so it stays inside an `image_width × image_height` image.
    ///
    /// When the rectangle is larger than the image on an axis, it is pinned
    /// to the origin on that axis.
    pub fn centered_on(
        center_x: i64,
        center_y: i64,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let x = center_x - i64::from(width / 2);
        let y = center_y - i64::from(height / 2);

        let x = x.min(i64::from(image_width) - i64::from(width)).max(0);
        let y = y.min(i64::from(image_height) - i64::from(height)).max(0);

        Self {
            x: x as u32,
            y: y as u32,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

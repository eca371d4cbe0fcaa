/// The fixed set of avatar variants produced for every input image.
///
/// Each variant is a rectangle anchored at the origin: `(0, 0, width, height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AvatarSize {
    S38x38,
    S86x86,
    S136x234,
    S204x175,
    S204x350,
}

impl AvatarSize {
    pub const ALL: &[AvatarSize] = &[
        AvatarSize::S38x38,
        AvatarSize::S86x86,
        AvatarSize::S136x234,
        AvatarSize::S204x175,
        AvatarSize::S204x350,
    ];

    /// `(x, y, width, height)` of the variant.
    pub const fn rect(self) -> (u32, u32, u32, u32) {
        match self {
            AvatarSize::S38x38 => (0, 0, 38, 38),
            AvatarSize::S86x86 => (0, 0, 86, 86),
            AvatarSize::S136x234 => (0, 0, 136, 234),
            AvatarSize::S204x175 => (0, 0, 204, 175),
            AvatarSize::S204x350 => (0, 0, 204, 350),
        }
    }

    pub const fn width(self) -> u32 {
        self.rect().2
    }

    pub const fn height(self) -> u32 {
        self.rect().3
    }

    pub const fn dimensions(self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn file_name(self) -> String {
        avatar_file_name(self.width(), self.height())
    }
}

/// Output file name for a crop of the given size.
pub fn avatar_file_name(width: u32, height: u32) -> String {
    format!("avatar_{width}x{height}.png")
}

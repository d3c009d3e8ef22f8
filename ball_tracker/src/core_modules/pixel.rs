// THEORY (single-pixel color):
// The `Pixel` module is the most fundamental unit of the tracker. It is a plain
// data container for one RGBA pixel plus the single-pixel color transforms the
// segmenter needs. Nothing here looks at neighbors or at previous frames.
//
// The segmenter thresholds in HSV on the 8-bit scale used by common vision
// libraries, so the conversion here produces exactly that representation:
//   • value      V = max(R, G, B)                      0..=255
//   • saturation S = 255 · (V − min) / V, 0 when V = 0 0..=255
//   • hue        H = angle in degrees / 2, rounded     0..=179
// Alpha is carried along but never influences color.

pub mod pixel {
    pub type Channel = u8;
    pub type Chroma = u8;
    pub type HueDegrees = f32;
    /// Hue on the half-degree axis, `0..180`.
    pub type Hue8 = u8;
    pub type Saturation8 = u8;
    pub type Value8 = u8;

    /// A plain data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        pub alpha: Channel,
    }

    /// An HSV triple on the 8-bit scale.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hsv8 {
        pub hue: Hue8,
        pub saturation: Saturation8,
        pub value: Value8,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        fn maximum_channel(&self) -> Channel {
            self.red.max(self.green.max(self.blue))
        }

        fn minimum_channel(&self) -> Channel {
            self.red.min(self.green.min(self.blue))
        }

        /// HSV Value (V): brightness defined as max(R, G, B).
        pub fn value_hsv(&self) -> Value8 {
            self.maximum_channel()
        }

        /// Chroma (C): max(R,G,B) - min(R,G,B). Zero for any gray.
        pub fn chroma(&self) -> Chroma {
            self.maximum_channel() - self.minimum_channel()
        }

        /// Saturation (HSV) scaled to 0..=255, rounded to nearest.
        pub fn saturation_hsv(&self) -> Saturation8 {
            let value = self.maximum_channel() as u32;
            if value == 0 {
                return 0;
            }
            ((self.chroma() as u32 * 255 + value / 2) / value) as Saturation8
        }

        /// Hue angle in degrees [0, 360). Grays report 0.
        pub fn hue_degrees(&self) -> HueDegrees {
            let maximum_channel = self.maximum_channel();
            let chroma = self.chroma();
            if chroma == 0 {
                return 0.0;
            }

            let red = self.red as f32;
            let green = self.green as f32;
            let blue = self.blue as f32;
            let inverse_chroma = 1.0 / chroma as f32;

            // Ties resolve red first, then green.
            let (base_difference, sector_offset) = if maximum_channel == self.red {
                (green - blue, 0.0)
            } else if maximum_channel == self.green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference * inverse_chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        /// Hue halved into the 8-bit axis. 359.5° and above wrap to 0.
        pub fn hue_8bit(&self) -> Hue8 {
            ((self.hue_degrees() / 2.0).round() as u16 % 180) as Hue8
        }

        pub fn to_hsv8(&self) -> Hsv8 {
            Hsv8 {
                hue: self.hue_8bit(),
                saturation: self.saturation_hsv(),
                value: self.value_hsv(),
            }
        }
    }

    impl From<image::Rgba<u8>> for Pixel {
        fn from(rgba: image::Rgba<u8>) -> Self {
            let [red, green, blue, alpha] = rgba.0;
            Pixel::new(red, green, blue, alpha)
        }
    }
}

// THEORY:
// The `Pixel` module is the most fundamental unit of the scanner. It is a "dumb"
// data container for a single RGBA pixel plus the handful of single-pixel
// heuristics the color features are built from. Anything that needs more than
// one pixel (region averages, smoothing across frames, classification) lives in
// higher modules like `Chunk` and `FrameAnalyzer`.
//
// The second half of the module defines `ColorFeatureVector`, the fixed-length
// description of a region's appearance that flows through the rest of the
// pipeline: three averaged color channels plus one derived channel (luminance).
// The length is part of the type, so a vector of the wrong length cannot be
// constructed at all.

pub mod pixel {
    use std::ops::Index;

    pub type Byte = u8;
    pub type Bytes = Vec<Byte>;
    pub type Channel = Byte;
    pub type Luminance = f64;

    pub const CHANNELS: usize = 4;

    /// Number of components in a `ColorFeatureVector`: red, green, blue, luminance.
    pub const FEATURE_LEN: usize = 4;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
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

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        pub fn luminance(&self) -> Luminance {
            rec601_luminance(self.red as f64, self.green as f64, self.blue as f64)
        }
    }

    /// Rec. 601 luma of an RGB triple expressed on the 0..255 scale.
    pub fn rec601_luminance(red: f64, green: f64, blue: f64) -> Luminance {
        0.299_f64 * red + 0.587_f64 * green + 0.114_f64 * blue
    }

    /// Panics on a slice that is not exactly one RGBA pixel long; callers slice
    /// the frame buffer in `CHANNELS`-sized steps.
    impl From<&[Byte]> for Pixel {
        fn from(bytes: &[Byte]) -> Self {
            if bytes.len() != CHANNELS {
                panic!("Cannot convert {} bytes into pixel.", bytes.len());
            }
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<Pixel> for Bytes {
        fn from(pixel: Pixel) -> Self {
            vec![pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }

    /// The averaged appearance of one grid cell in one frame.
    ///
    /// Components are `[red, green, blue, luminance]`, all on the 0..255 scale.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct ColorFeatureVector(pub [f64; FEATURE_LEN]);

    impl ColorFeatureVector {
        pub fn new(components: [f64; FEATURE_LEN]) -> Self {
            Self(components)
        }

        /// Builds a feature from averaged RGB channels, deriving the luminance channel.
        pub fn from_rgb(red: f64, green: f64, blue: f64) -> Self {
            Self([red, green, blue, rec601_luminance(red, green, blue)])
        }

        pub fn components(&self) -> &[f64; FEATURE_LEN] {
            &self.0
        }

        pub fn is_finite(&self) -> bool {
            self.0.iter().all(|c| c.is_finite())
        }

        pub fn squared_distance(&self, other: &ColorFeatureVector) -> f64 {
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum()
        }
    }

    impl From<Pixel> for ColorFeatureVector {
        fn from(pixel: Pixel) -> Self {
            ColorFeatureVector::from_rgb(pixel.red as f64, pixel.green as f64, pixel.blue as f64)
        }
    }

    impl Index<usize> for ColorFeatureVector {
        type Output = f64;

        fn index(&self, index: usize) -> &f64 {
            &self.0[index]
        }
    }
}

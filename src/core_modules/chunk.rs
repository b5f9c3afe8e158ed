// THEORY:
// The `Chunk` module represents a spatial grouping of pixels: one square cell of
// the scan grid, cut out of a full camera frame. Its core operation is
// `average_feature`, which pools every pixel of the cell into a single
// `ColorFeatureVector`. Pooling cancels single-pixel sensor noise and reduces a
// cell of thousands of pixels to four numbers the classifier can work with.
//
// Like `Pixel`, `Chunk` is a "dumb" data container. The frame it is cut from is
// represented by `RgbaFrame`, the crate's default implementation of the
// `FeatureSource` boundary. Any other frame representation (a camera buffer,
// a GPU readback) only has to implement `FeatureSource` to feed the analyzer.

pub mod chunk {
    use crate::core_modules::pixel::pixel::{Bytes, CHANNELS, ColorFeatureVector, Pixel};

    /// A "dumb" data container representing a square block of pixels.
    pub struct Chunk {
        /// A flattened vector containing all the in-frame `Pixel` data within this chunk.
        pub pixels: Vec<Pixel>,
    }

    impl Chunk {
        pub fn new(pixels: Vec<Pixel>) -> Self {
            Self { pixels }
        }

        /// Averages every pixel of the chunk into one feature vector.
        /// An empty chunk yields the zero vector.
        pub fn average_feature(&self) -> ColorFeatureVector {
            let num_pixels = self.pixels.len();
            if num_pixels == 0 {
                return ColorFeatureVector::default();
            }

            let mut sum_r = 0u64;
            let mut sum_g = 0u64;
            let mut sum_b = 0u64;

            for pixel in &self.pixels {
                sum_r += pixel.red as u64;
                sum_g += pixel.green as u64;
                sum_b += pixel.blue as u64;
            }

            let count = num_pixels as f64;
            ColorFeatureVector::from_rgb(
                sum_r as f64 / count,
                sum_g as f64 / count,
                sum_b as f64 / count,
            )
        }
    }

    /// The feature-extraction boundary: anything that can report its size and
    /// average a square region into a `ColorFeatureVector`.
    ///
    /// Implementations must be deterministic for identical pixel input.
    pub trait FeatureSource {
        /// `(width, height)` in pixels.
        fn dimensions(&self) -> (u32, u32);

        /// Averages the square region with top-left corner `(x, y)` and side `side`.
        fn region_feature(&self, x: u32, y: u32, side: u32) -> ColorFeatureVector;
    }

    /// A row-major RGBA8 frame buffer.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RgbaFrame {
        pub width: u32,
        pub height: u32,
        pub data: Vec<u8>,
    }

    impl RgbaFrame {
        pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
            Self {
                width,
                height,
                data,
            }
        }

        /// A frame filled with a single color.
        pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
            let bytes: Vec<u8> = pixel.into();
            let data = bytes
                .iter()
                .copied()
                .cycle()
                .take(width as usize * height as usize * CHANNELS)
                .collect();
            Self::new(width, height, data)
        }

        /// Paints the square region with top-left `(x, y)` and side `side`.
        /// Pixels falling outside the frame or the buffer are ignored.
        pub fn fill_region(&mut self, x: u32, y: u32, side: u32, pixel: Pixel) {
            let bytes: Bytes = pixel.into();
            for pixel_y in y..y.saturating_add(side).min(self.height) {
                for pixel_x in x..x.saturating_add(side).min(self.width) {
                    let byte_index =
                        (pixel_y as usize * self.width as usize + pixel_x as usize) * CHANNELS;
                    if let Some(slot) = self.data.get_mut(byte_index..byte_index + CHANNELS) {
                        slot.copy_from_slice(&bytes);
                    }
                }
            }
        }

        /// Cuts the square region out of the frame, skipping out-of-frame pixels.
        pub fn chunk(&self, x: u32, y: u32, side: u32) -> Chunk {
            let mut chunk_pixels = Vec::with_capacity((side as usize).pow(2));

            for i in 0..(side as u64 * side as u64) {
                let pixel_y = y as u64 + i / side as u64;
                let pixel_x = x as u64 + i % side as u64;
                if pixel_x >= self.width as u64 || pixel_y >= self.height as u64 {
                    continue;
                }
                let byte_index = ((pixel_y * self.width as u64 + pixel_x) as usize) * CHANNELS;

                if byte_index + CHANNELS <= self.data.len() {
                    chunk_pixels.push(Pixel::from(&self.data[byte_index..byte_index + CHANNELS]));
                }
            }

            Chunk::new(chunk_pixels)
        }
    }

    impl FeatureSource for RgbaFrame {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn region_feature(&self, x: u32, y: u32, side: u32) -> ColorFeatureVector {
            self.chunk(x, y, side).average_feature()
        }
    }

    impl From<image::RgbaImage> for RgbaFrame {
        fn from(image: image::RgbaImage) -> Self {
            let (width, height) = image.dimensions();
            RgbaFrame::new(width, height, image.into_raw())
        }
    }

    impl From<&image::RgbaImage> for RgbaFrame {
        fn from(image: &image::RgbaImage) -> Self {
            let (width, height) = image.dimensions();
            RgbaFrame::new(width, height, image.as_raw().clone())
        }
    }
}

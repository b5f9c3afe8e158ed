// THEORY:
// The `ColorClassifier` turns one smoothed `ColorFeatureVector` into one of the
// six cube colors. It is a 1-nearest-neighbor classifier whose entire training
// set is the validated `ReferencePalette`: one representative vector per color.
//
// Key architectural principles:
// 1.  **Fixed training set**: `train` accepts the palette once. There is no
//     online learning; the classifier never changes after construction.
// 2.  **Deterministic ties**: candidates are visited in color-index order and a
//     candidate only wins on a strictly smaller distance, so an exact tie always
//     resolves to the lowest color index.
// 3.  **Failure at the edge**: a malformed palette is rejected by
//     `ReferencePalette::new` (surfaced through `train`). Once built, `classify`
//     cannot fail.

use crate::core_modules::palette::{CubeColor, PaletteEntry, ReferencePalette};
use crate::core_modules::pixel::pixel::ColorFeatureVector;
use crate::error::ConfigurationError;

#[derive(Debug, Clone)]
pub struct ColorClassifier {
    samples: Vec<PaletteEntry>,
}

impl ColorClassifier {
    /// Builds a classifier from an already validated palette.
    pub fn train(palette: &ReferencePalette) -> Self {
        Self {
            samples: palette.entries().to_vec(),
        }
    }

    /// Validates raw palette entries and builds a classifier from them.
    pub fn train_from_entries(entries: Vec<PaletteEntry>) -> Result<Self, ConfigurationError> {
        let palette = ReferencePalette::new(entries)?;
        Ok(Self::train(&palette))
    }

    pub fn classify(&self, feature: &ColorFeatureVector) -> CubeColor {
        let mut best_color = CubeColor::default();
        let mut best_distance = f64::INFINITY;

        for sample in &self.samples {
            let distance = sample.feature.squared_distance(feature);
            if distance < best_distance {
                best_distance = distance;
                best_color = sample.color;
            }
        }

        best_color
    }
}

impl Default for ColorClassifier {
    fn default() -> Self {
        Self::train(&ReferencePalette::reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_reference_vector_classifies_to_itself() {
        let palette = ReferencePalette::reference();
        let classifier = ColorClassifier::train(&palette);
        for entry in palette.entries() {
            assert_eq!(classifier.classify(&entry.feature), entry.color);
        }
    }

    #[rstest]
    #[case((250, 220, 30), CubeColor::Yellow)]
    #[case((240, 100, 20), CubeColor::Orange)]
    #[case((20, 140, 80), CubeColor::Green)]
    #[case((235, 235, 230), CubeColor::White)]
    #[case((170, 30, 45), CubeColor::Red)]
    #[case((10, 60, 160), CubeColor::Blue)]
    fn noisy_samples_land_on_nearest_color(#[case] rgb: (u8, u8, u8), #[case] expected: CubeColor) {
        let classifier = ColorClassifier::default();
        let feature = ColorFeatureVector::from_rgb(rgb.0 as f64, rgb.1 as f64, rgb.2 as f64);
        assert_eq!(classifier.classify(&feature), expected);
    }

    #[test]
    fn exact_tie_resolves_to_lowest_index() {
        let mut entries = ReferencePalette::reference().entries().to_vec();
        // Place Orange and Blue at the same distance from the origin.
        entries[CubeColor::Orange.index()].feature = ColorFeatureVector::new([10.0, 0.0, 0.0, 0.0]);
        entries[CubeColor::Blue.index()].feature = ColorFeatureVector::new([0.0, 10.0, 0.0, 0.0]);
        entries[CubeColor::Yellow.index()].feature = ColorFeatureVector::new([500.0, 0.0, 0.0, 0.0]);
        let classifier = ColorClassifier::train_from_entries(entries).unwrap();

        let origin = ColorFeatureVector::new([0.0, 0.0, 0.0, 0.0]);
        assert_eq!(classifier.classify(&origin), CubeColor::Orange);
    }

    #[test]
    fn malformed_palette_fails_training() {
        let mut entries = ReferencePalette::reference().entries().to_vec();
        entries.truncate(3);
        assert_eq!(
            ColorClassifier::train_from_entries(entries).unwrap_err(),
            ConfigurationError::WrongEntryCount(3)
        );
        assert_eq!(
            ColorClassifier::train_from_entries(vec![]).unwrap_err(),
            ConfigurationError::EmptyPalette
        );
    }
}

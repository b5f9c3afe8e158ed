// THEORY:
// The `palette` module holds the fixed reference data of the scanner: the six
// color identities a cube face can show, in the order the faces are scanned, and
// the `ReferencePalette` that gives each identity one representative feature
// vector and a one-character external label.
//
// The palette is built once and validated once. Everything downstream (the
// classifier, the session's label mapping) can then rely on it holding exactly
// one entry per color, stored in scan order, with distinct labels.

use crate::core_modules::pixel::pixel::ColorFeatureVector;
use crate::error::ConfigurationError;

/// The six colors of a cube, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CubeColor {
    #[default]
    Yellow,
    Orange,
    Green,
    White,
    Red,
    Blue,
}

impl CubeColor {
    pub const COUNT: usize = 6;

    /// All colors in scan order (index 0..5).
    pub const ALL: [CubeColor; 6] = [
        CubeColor::Yellow,
        CubeColor::Orange,
        CubeColor::Green,
        CubeColor::White,
        CubeColor::Red,
        CubeColor::Blue,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<CubeColor> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            CubeColor::Yellow => "Yellow",
            CubeColor::Orange => "Orange",
            CubeColor::Green => "Green",
            CubeColor::White => "White",
            CubeColor::Red => "Red",
            CubeColor::Blue => "Blue",
        }
    }

    /// The label this color carries in the reference palette.
    pub fn reference_label(self) -> char {
        match self {
            CubeColor::Yellow => 'Y',
            CubeColor::Orange => 'O',
            CubeColor::Green => 'G',
            CubeColor::White => 'W',
            CubeColor::Red => 'R',
            CubeColor::Blue => 'B',
        }
    }

    /// Representative sticker color as 8-bit RGB.
    pub fn reference_rgb(self) -> (u8, u8, u8) {
        match self {
            CubeColor::Yellow => (255, 213, 0),
            CubeColor::Orange => (255, 88, 0),
            CubeColor::Green => (0, 155, 72),
            CubeColor::White => (255, 255, 255),
            CubeColor::Red => (183, 18, 52),
            CubeColor::Blue => (0, 70, 173),
        }
    }
}

/// One row of the palette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteEntry {
    pub color: CubeColor,
    pub feature: ColorFeatureVector,
    pub label: char,
}

impl PaletteEntry {
    pub fn new(color: CubeColor, feature: ColorFeatureVector, label: char) -> Self {
        Self {
            color,
            feature,
            label,
        }
    }
}

/// An immutable, validated mapping from every `CubeColor` to its representative
/// feature and external label. Entries are stored in scan order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePalette {
    entries: Vec<PaletteEntry>,
}

impl ReferencePalette {
    /// Validates and orders the given entries.
    pub fn new(mut entries: Vec<PaletteEntry>) -> Result<Self, ConfigurationError> {
        if entries.is_empty() {
            return Err(ConfigurationError::EmptyPalette);
        }
        if entries.len() != CubeColor::COUNT {
            return Err(ConfigurationError::WrongEntryCount(entries.len()));
        }

        entries.sort_by_key(|entry| entry.color);
        for (color, entry) in CubeColor::ALL.iter().zip(entries.iter()) {
            if entry.color != *color {
                return Err(ConfigurationError::MissingColor(color.name()));
            }
            if !entry.feature.is_finite() {
                return Err(ConfigurationError::NonFiniteVector(color.name()));
            }
        }

        for (i, entry) in entries.iter().enumerate() {
            if entries[i + 1..].iter().any(|other| other.label == entry.label) {
                return Err(ConfigurationError::DuplicateLabel(entry.label));
            }
        }

        // The solver alphabet is fixed over the reference labels.
        for entry in &entries {
            if entry.label != entry.color.reference_label() {
                return Err(ConfigurationError::UnsupportedLabel {
                    color: entry.color.name(),
                    label: entry.label,
                    expected: entry.color.reference_label(),
                });
            }
        }

        Ok(Self { entries })
    }

    /// The built-in palette: reference sticker colors labelled `Y O G W R B`.
    pub fn reference() -> Self {
        let entries = CubeColor::ALL
            .iter()
            .map(|&color| {
                let (r, g, b) = color.reference_rgb();
                PaletteEntry::new(
                    color,
                    ColorFeatureVector::from_rgb(r as f64, g as f64, b as f64),
                    color.reference_label(),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn entry(&self, color: CubeColor) -> &PaletteEntry {
        &self.entries[color.index()]
    }

    /// All six labels indexed by color.
    pub fn labels(&self) -> [char; CubeColor::COUNT] {
        let mut labels = ['?'; CubeColor::COUNT];
        for entry in &self.entries {
            labels[entry.color.index()] = entry.label;
        }
        labels
    }
}

impl Default for ReferencePalette {
    fn default() -> Self {
        Self::reference()
    }
}

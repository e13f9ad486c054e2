// SPDX-License-Identifier: Apache-2.0

//! Monochrome layer masks read from binary PBM ("P4") files.
//!
//! The rasteriser draws features white on black, so a feature pixel is one
//! whose bit is clear in the file. Row padding bits are set.

use bitvec::vec::BitVec;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum MaskError {
    Io { path: PathBuf, error: std::io::Error },
    BadHeader { path: PathBuf, message: String },
    Truncated { path: PathBuf, expected: usize, actual: usize },
}

impl MaskError {
    pub fn path(&self) -> &Path {
        match self {
            MaskError::Io { path, .. } => path,
            MaskError::BadHeader { path, .. } => path,
            MaskError::Truncated { path, .. } => path,
        }
    }
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::Io { path, error } => {
                write!(f, "cannot read mask {}: {}", path.display(), error)
            }
            MaskError::BadHeader { path, message } => {
                write!(f, "malformed PBM header in {}: {}", path.display(), message)
            }
            MaskError::Truncated {
                path,
                expected,
                actual,
            } => write!(
                f,
                "truncated PBM data in {}: expected {} bytes, got {}",
                path.display(),
                expected,
                actual
            ),
        }
    }
}

impl std::error::Error for MaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MaskError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: usize,
    height: usize,
    features: BitVec,
}

impl fmt::Debug for BinaryMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryMask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("feature_pixels", &self.features.count_ones())
            .finish()
    }
}

/// Reads one whitespace-delimited header token, skipping `#` comments.
fn next_header_token(data: &[u8], pos: &mut usize) -> Option<String> {
    loop {
        while *pos < data.len() && data[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if *pos < data.len() && data[*pos] == b'#' {
            while *pos < data.len() && data[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while *pos < data.len() && !data[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if start == *pos {
        None
    } else {
        Some(String::from_utf8_lossy(&data[start..*pos]).into_owned())
    }
}

impl BinaryMask {
    /// An all-clear mask.
    pub fn new(width: usize, height: usize) -> Self {
        BinaryMask {
            width,
            height,
            features: BitVec::repeat(false, width * height),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// Whether `(x, y)` is a feature pixel. Out-of-range positions are not.
    pub fn get(&self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            Some(i) => self.features[i],
            None => false,
        }
    }

    /// Sets or clears a feature pixel; out-of-range positions are ignored.
    pub fn set(&mut self, x: i32, y: i32, feature: bool) {
        if let Some(i) = self.index(x, y) {
            self.features.set(i, feature);
        }
    }

    /// Marks every pixel of the inclusive rectangle as a feature.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, true);
            }
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features.count_ones()
    }

    pub fn from_pbm_bytes(data: &[u8], path: &Path) -> Result<Self, MaskError> {
        let bad_header = |message: &str| MaskError::BadHeader {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        let mut pos = 0;
        match next_header_token(data, &mut pos) {
            Some(magic) if magic == "P4" => {}
            Some(magic) => return Err(bad_header(&format!("unsupported magic {:?}", magic))),
            None => return Err(bad_header("empty file")),
        }
        let mut dimension = |what: &str| -> Result<usize, MaskError> {
            let token =
                next_header_token(data, &mut pos).ok_or_else(|| bad_header(&format!("missing {}", what)))?;
            token
                .parse::<usize>()
                .map_err(|_| bad_header(&format!("invalid {} {:?}", what, token)))
        };
        let width = dimension("width")?;
        let height = dimension("height")?;
        // Exactly one whitespace byte separates the header from the raster.
        pos += 1;

        let stride = width.div_ceil(8);
        let expected = stride * height;
        let raster = data.get(pos..).unwrap_or(&[]);
        if raster.len() < expected {
            return Err(MaskError::Truncated {
                path: path.to_path_buf(),
                expected,
                actual: raster.len(),
            });
        }

        let mut mask = BinaryMask::new(width, height);
        for y in 0..height {
            let row = &raster[y * stride..(y + 1) * stride];
            for x in 0..width {
                let bit = row[x / 8] & (0x80 >> (x % 8));
                if bit == 0 {
                    mask.features.set(y * width + x, true);
                }
            }
        }
        Ok(mask)
    }

    pub fn read(path: &Path) -> Result<Self, MaskError> {
        let data = std::fs::read(path).map_err(|error| MaskError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let mask = Self::from_pbm_bytes(&data, path)?;
        log::debug!(
            "read mask {} ({}x{}, {} feature pixels)",
            path.display(),
            mask.width,
            mask.height,
            mask.feature_count()
        );
        Ok(mask)
    }

    pub fn to_pbm_bytes(&self) -> Vec<u8> {
        let stride = self.width.div_ceil(8);
        let mut out = format!("P4\n{} {}\n", self.width, self.height).into_bytes();
        for y in 0..self.height {
            let mut row = vec![0xffu8; stride];
            for x in 0..self.width {
                if self.features[y * self.width + x] {
                    row[x / 8] &= !(0x80 >> (x % 8));
                }
            }
            out.extend_from_slice(&row);
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<(), MaskError> {
        std::fs::write(path, self.to_pbm_bytes()).map_err(|error| MaskError::Io {
            path: path.to_path_buf(),
            error,
        })
    }
}

/// A physical mask layer named by the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Active,
    Poly,
    Metal,
    Buried,
    Vias,
    Caps,
    Gates,
}

impl Layer {
    pub const ALL: [Layer; 7] = [
        Layer::Active,
        Layer::Poly,
        Layer::Metal,
        Layer::Buried,
        Layer::Vias,
        Layer::Caps,
        Layer::Gates,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Layer::Active => "active",
            Layer::Poly => "poly",
            Layer::Metal => "metal",
            Layer::Buried => "buried",
            Layer::Vias => "vias",
            Layer::Caps => "caps",
            Layer::Gates => "gates",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Layer::ALL.iter().copied().find(|l| l.keyword() == keyword)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// The set of masks available to one extraction. Layers that were not
/// given are absent and read as all-clear.
#[derive(Debug, Clone, Default)]
pub struct LayerMasks {
    masks: BTreeMap<Layer, BinaryMask>,
}

impl LayerMasks {
    pub fn new() -> Self {
        LayerMasks::default()
    }

    pub fn insert(&mut self, layer: Layer, mask: BinaryMask) {
        self.masks.insert(layer, mask);
    }

    pub fn with(mut self, layer: Layer, mask: BinaryMask) -> Self {
        self.insert(layer, mask);
        self
    }

    pub fn get(&self, layer: Layer) -> Option<&BinaryMask> {
        self.masks.get(&layer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Layer, &BinaryMask)> {
        self.masks.iter().map(|(l, m)| (*l, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn feature_pixels_are_clear_bits() {
        // 10 pixels wide: two bytes per row, last six bits are padding.
        let mut data = b"P4\n# drawn by hand\n10 2\n".to_vec();
        data.extend_from_slice(&[0b0111_1111, 0b1111_1111, 0b1111_1111, 0b0011_1111]);
        let mask = BinaryMask::from_pbm_bytes(&data, Path::new("t.pbm")).unwrap();
        assert_eq!(mask.width(), 10);
        assert_eq!(mask.height(), 2);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(mask.get(8, 1));
        assert!(mask.get(9, 1));
        assert_eq!(mask.feature_count(), 3);
    }

    #[test]
    fn out_of_range_is_not_a_feature() {
        let mut mask = BinaryMask::new(3, 3);
        mask.fill_rect(0, 0, 2, 2);
        assert!(!mask.get(-1, 0));
        assert!(!mask.get(0, 3));
        assert!(!mask.get(3, 0));
        mask.set(5, 5, true);
        assert_eq!(mask.feature_count(), 9);
    }

    #[test]
    fn written_bytes_read_back() {
        let mut mask = BinaryMask::new(13, 4);
        mask.fill_rect(2, 1, 11, 2);
        let bytes = mask.to_pbm_bytes();
        assert!(bytes.starts_with(b"P4\n13 4\n"));
        let back = BinaryMask::from_pbm_bytes(&bytes, Path::new("m.pbm")).unwrap();
        assert_eq!(back, mask);
    }

    #[test]
    fn rejects_ascii_pbm() {
        let err = BinaryMask::from_pbm_bytes(b"P1\n2 2\n0 1 1 0\n", Path::new("a.pbm"))
            .unwrap_err();
        assert!(matches!(err, MaskError::BadHeader { .. }));
        assert!(err.to_string().contains("unsupported magic"));
    }

    #[test]
    fn reports_truncated_raster() {
        let err = BinaryMask::from_pbm_bytes(b"P4\n16 4\n\xff\xff", Path::new("s.pbm"))
            .unwrap_err();
        match err {
            MaskError::Truncated {
                expected, actual, ..
            } => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn layer_keywords_round_trip() {
        for layer in Layer::ALL {
            assert_eq!(Layer::from_keyword(layer.keyword()), Some(layer));
        }
        assert_eq!(Layer::from_keyword("diffusion"), None);
    }

    #[test]
    fn absent_layers_are_none() {
        let masks = LayerMasks::new().with(Layer::Active, BinaryMask::new(2, 2));
        assert!(masks.get(Layer::Active).is_some());
        assert!(masks.get(Layer::Caps).is_none());
        assert_eq!(masks.iter().count(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BinaryMask::read(&dir.path().join("absent.pbm")).unwrap_err();
        assert!(matches!(err, MaskError::Io { .. }));
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Synthetic dies for tests: masks drawn from rectangles or ASCII art,
//! written out as PBM files next to a configuration.

use dienet::config::Method;
use dienet::mask::{BinaryMask, Layer, LayerMasks};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a mask from ASCII art: `#` is a feature pixel. Row 0 is the top
/// of the image.
pub fn mask_from_rows(rows: &[&str]) -> BinaryMask {
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let mut mask = BinaryMask::new(width, rows.len());
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            if c == '#' {
                mask.set(x as i32, y as i32, true);
            }
        }
    }
    mask
}

/// A die under construction. Coordinates are grid coordinates (origin at
/// the top left) except for metal links, which use the bottom-left frame
/// like the configuration file.
#[derive(Debug, Clone)]
pub struct SyntheticDie {
    pub method: Method,
    pub width: usize,
    pub height: usize,
    layers: BTreeMap<Layer, BinaryMask>,
    metal_links: Vec<(i32, i32, i32, i32)>,
}

impl SyntheticDie {
    /// An empty die with every layer `method` requires present and blank.
    pub fn new(method: Method, width: usize, height: usize) -> Self {
        let layers = method
            .required_layers()
            .iter()
            .map(|&l| (l, BinaryMask::new(width, height)))
            .collect();
        SyntheticDie {
            method,
            width,
            height,
            layers,
            metal_links: Vec::new(),
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut BinaryMask {
        let (w, h) = (self.width, self.height);
        self.layers
            .entry(layer)
            .or_insert_with(|| BinaryMask::new(w, h))
    }

    /// Draws an inclusive rectangle on `layer`.
    pub fn rect(mut self, layer: Layer, x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        self.layer_mut(layer).fill_rect(x0, y0, x1, y1);
        self
    }

    /// Draws ASCII art on `layer`, anchored at the top left corner.
    pub fn rows(mut self, layer: Layer, rows: &[&str]) -> Self {
        let art = mask_from_rows(rows);
        let mask = self.layer_mut(layer);
        for y in 0..art.height() as i32 {
            for x in 0..art.width() as i32 {
                if art.get(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        self
    }

    pub fn metal_link(mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        self.metal_links.push((x1, y1, x2, y2));
        self
    }

    pub fn masks(&self) -> LayerMasks {
        let mut masks = LayerMasks::new();
        for (layer, mask) in &self.layers {
            masks.insert(*layer, mask.clone());
        }
        masks
    }

    pub fn metal_links(&self) -> Vec<dienet::metal_link::MetalLink> {
        self.metal_links
            .iter()
            .map(|&(x1, y1, x2, y2)| dienet::metal_link::MetalLink::new(x1, y1, x2, y2))
            .collect()
    }

    /// The configuration text naming every layer as `masks/<keyword>`, with
    /// outputs `die.grid` and `die.net`.
    pub fn config_text(&self) -> String {
        let mut text = format!("die.grid die.net {} {}\n", self.width, self.height);
        text.push_str(self.method.keyword());
        text.push('\n');
        for layer in self.layers.keys() {
            text.push_str(&format!("{} masks/{}\n", layer.keyword(), layer.keyword()));
        }
        for (x1, y1, x2, y2) in &self.metal_links {
            text.push_str(&format!("metal-link {} {} {} {}\n", x1, y1, x2, y2));
        }
        text
    }

    /// Writes the masks under `dir/masks` and the configuration as
    /// `dir/die.conf`; returns the configuration path.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let mask_dir = dir.join("masks");
        std::fs::create_dir_all(&mask_dir).expect("create mask directory");
        for (layer, mask) in &self.layers {
            mask.write(&mask_dir.join(format!("{}.pbm", layer.keyword())))
                .expect("write mask");
        }
        let config = dir.join("die.conf");
        std::fs::write(&config, self.config_text()).expect("write configuration");
        log::debug!("synthetic die written to {}", dir.display());
        config
    }
}

/// Two active squares bridged by a poly strip, each square tied to its own
/// metal pad through a via: one transistor between two terminal nets.
pub fn single_transistor_die() -> SyntheticDie {
    SyntheticDie::new(Method::NmosPolySingleMetal, 28, 20)
        .rect(Layer::Active, 4, 4, 23, 13)
        .rect(Layer::Poly, 13, 4, 14, 17)
        .rect(Layer::Metal, 5, 6, 8, 9)
        .rect(Layer::Metal, 18, 6, 21, 9)
        .rect(Layer::Vias, 6, 7, 7, 8)
        .rect(Layer::Vias, 19, 7, 20, 8)
}

/// A poly island fully inside active: the overlap has no gate connection.
pub fn floating_gate_die() -> SyntheticDie {
    SyntheticDie::new(Method::NmosPolySingleMetal, 16, 16)
        .rect(Layer::Active, 2, 2, 13, 13)
        .rect(Layer::Poly, 6, 6, 9, 9)
        .rect(Layer::Metal, 0, 0, 1, 1)
}

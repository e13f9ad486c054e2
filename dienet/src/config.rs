// SPDX-License-Identifier: Apache-2.0

//! The line-oriented extraction configuration.
//!
//! ```text
//! die.grid die.net 5000 4000
//! nmos-poly-single-metal
//! active masks/active
//! poly masks/poly
//! metal masks/metal
//! vias masks/vias
//! metal-link 10 20 4800 20
//! ```
//!
//! The first line names the grid and netlist outputs and the die size. Each
//! further line is a method keyword, a layer keyword followed by a mask path
//! (`.pbm` is implied), or a `metal-link`. Relative paths are resolved
//! against the directory holding the configuration.

use crate::mask::{BinaryMask, Layer, LayerMasks, MaskError};
use crate::metal_link::MetalLink;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The process a die was built with; decides the pipeline and the grid
/// layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Active and poly layers with a single metal; three grid channels.
    NmosPolySingleMetal,
    /// Metal gates over active; two grid channels.
    NmosMetalGate,
}

impl Method {
    pub fn keyword(self) -> &'static str {
        match self {
            Method::NmosPolySingleMetal => "nmos-poly-single-metal",
            Method::NmosMetalGate => "nmos-metal-gate",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        [Method::NmosPolySingleMetal, Method::NmosMetalGate]
            .into_iter()
            .find(|m| m.keyword() == keyword)
    }

    pub fn channels(self) -> usize {
        match self {
            Method::NmosPolySingleMetal => 3,
            Method::NmosMetalGate => 2,
        }
    }

    pub fn required_layers(self) -> &'static [Layer] {
        match self {
            Method::NmosPolySingleMetal => &[Layer::Active, Layer::Poly, Layer::Metal],
            Method::NmosMetalGate => &[Layer::Active, Layer::Gates, Layer::Metal],
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    MissingToken {
        line: usize,
        what: &'static str,
    },
    InvalidNumber {
        line: usize,
        token: String,
    },
    UnknownKeyword {
        line: usize,
        keyword: String,
    },
    MissingMethod,
    MissingMask {
        method: Method,
        layer: Layer,
    },
    MaskSize {
        layer: Layer,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    Mask(MaskError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(f, "cannot read configuration {}: {}", path.display(), error)
            }
            ConfigError::MissingToken { line, what } => {
                write!(f, "configuration line {}: missing {}", line, what)
            }
            ConfigError::InvalidNumber { line, token } => {
                write!(f, "configuration line {}: invalid number {:?}", line, token)
            }
            ConfigError::UnknownKeyword { line, keyword } => {
                write!(f, "configuration line {}: unknown keyword {}", line, keyword)
            }
            ConfigError::MissingMethod => write!(f, "Method missing, nothing to do"),
            ConfigError::MissingMask { method, layer } => {
                write!(f, "method {} requires a {} mask", method, layer)
            }
            ConfigError::MaskSize {
                layer,
                expected,
                actual,
            } => write!(
                f,
                "{} mask is {}x{}, expected {}x{}",
                layer, actual.0, actual.1, expected.0, expected.1
            ),
            ConfigError::Mask(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { error, .. } => Some(error),
            ConfigError::Mask(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MaskError> for ConfigError {
    fn from(e: MaskError) -> Self {
        ConfigError::Mask(e)
    }
}

impl ConfigError {
    /// True for failures to open or read a file, as opposed to bad content.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            ConfigError::Io { .. } | ConfigError::Mask(MaskError::Io { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub grid_path: PathBuf,
    pub netlist_path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub method: Method,
    pub layers: BTreeMap<Layer, PathBuf>,
    pub metal_links: Vec<MetalLink>,
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn mask_path(base_dir: &Path, path: &str) -> PathBuf {
    if path.ends_with(".pbm") {
        resolve(base_dir, path)
    } else {
        resolve(base_dir, &format!("{}.pbm", path))
    }
}

fn number<T: std::str::FromStr>(
    tokens: &mut std::str::SplitWhitespace<'_>,
    line: usize,
    what: &'static str,
) -> Result<T, ConfigError> {
    let token = tokens
        .next()
        .ok_or(ConfigError::MissingToken { line, what })?;
    token.parse().map_err(|_| ConfigError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

impl ExtractionConfig {
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

        let (line, first) = lines.next().unwrap_or((1, ""));
        let mut tokens = first.split_whitespace();
        let grid_path = tokens.next().ok_or(ConfigError::MissingToken {
            line,
            what: "grid path",
        })?;
        let netlist_path = tokens.next().ok_or(ConfigError::MissingToken {
            line,
            what: "netlist path",
        })?;
        let width = number(&mut tokens, line, "width")?;
        let height = number(&mut tokens, line, "height")?;

        let mut method = None;
        let mut layers = BTreeMap::new();
        let mut metal_links = Vec::new();
        for (line, text) in lines {
            let text = text.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let (keyword, rest) = match text.split_once(char::is_whitespace) {
                Some((k, r)) => (k, r.trim()),
                None => (text, ""),
            };
            if let Some(m) = Method::from_keyword(keyword) {
                method = Some(m);
            } else if let Some(layer) = Layer::from_keyword(keyword) {
                if rest.is_empty() {
                    return Err(ConfigError::MissingToken {
                        line,
                        what: "mask path",
                    });
                }
                layers.insert(layer, mask_path(base_dir, rest));
            } else if keyword == "metal-link" {
                let mut tokens = rest.split_whitespace();
                metal_links.push(MetalLink::new(
                    number(&mut tokens, line, "x1")?,
                    number(&mut tokens, line, "y1")?,
                    number(&mut tokens, line, "x2")?,
                    number(&mut tokens, line, "y2")?,
                ));
            } else {
                return Err(ConfigError::UnknownKeyword {
                    line,
                    keyword: keyword.to_string(),
                });
            }
        }

        let method = method.ok_or(ConfigError::MissingMethod)?;
        if let Some(&layer) = method
            .required_layers()
            .iter()
            .find(|l| !layers.contains_key(*l))
        {
            return Err(ConfigError::MissingMask { method, layer });
        }

        Ok(ExtractionConfig {
            grid_path: resolve(base_dir, grid_path),
            netlist_path: resolve(base_dir, netlist_path),
            width,
            height,
            method,
            layers,
            metal_links,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        ExtractionConfig::parse(&text, base_dir)
    }

    /// Reads every configured mask and checks it against the die size.
    pub fn load_masks(&self) -> Result<LayerMasks, ConfigError> {
        let mut masks = LayerMasks::new();
        for (&layer, path) in &self.layers {
            let mask = BinaryMask::read(path)?;
            if (mask.width(), mask.height()) != (self.width, self.height) {
                return Err(ConfigError::MaskSize {
                    layer,
                    expected: (self.width, self.height),
                    actual: (mask.width(), mask.height()),
                });
            }
            log::debug!(
                "{} mask {}: {} feature pixels",
                layer,
                path.display(),
                mask.feature_count()
            );
            masks.insert(layer, mask);
        }
        Ok(masks)
    }
}

// SPDX-License-Identifier: Apache-2.0

//! The fatal errors of an extraction run.

use crate::circuit_grid::GridError;
use crate::config::ConfigError;
use crate::disambiguate::LayoutFault;
use crate::gate_nets::GateMetalFault;
use crate::mask::MaskError;
use crate::metal_link::MetalLinkFault;
use crate::nets::NetConflict;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExtractError {
    /// Every transistor zone that cannot be resolved, reported together.
    Layout(Vec<LayoutFault>),
    NetConflict(Box<NetConflict>),
    MetalLink(MetalLinkFault),
    /// A gate pixel also marked as capacitor, bottom-left-origin frame.
    GateCapacitorOverlap { x: i32, y: i32 },
    GateMetal(GateMetalFault),
    Mask(MaskError),
    Grid(GridError),
    Config(ConfigError),
    Io { path: PathBuf, error: std::io::Error },
}

impl ExtractError {
    /// Process exit status for this error: 2 when a file could not be
    /// opened, read or written, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        let io = match self {
            ExtractError::Mask(MaskError::Io { .. }) => true,
            ExtractError::Grid(GridError::Io { .. }) => true,
            ExtractError::Config(e) => e.is_io(),
            ExtractError::Io { .. } => true,
            _ => false,
        };
        if io {
            2
        } else {
            1
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Layout(faults) => {
                write!(f, "{} unresolvable transistor zone(s)", faults.len())?;
                for fault in faults {
                    write!(f, "\n{}", fault)?;
                }
                Ok(())
            }
            ExtractError::NetConflict(c) => write!(f, "{}", c),
            ExtractError::MetalLink(e) => write!(f, "{}", e),
            ExtractError::GateCapacitorOverlap { x, y } => {
                write!(f, "Gates and capacitors overlap at ({}, {})", x, y)
            }
            ExtractError::GateMetal(e) => write!(f, "{}", e),
            ExtractError::Mask(e) => write!(f, "{}", e),
            ExtractError::Grid(e) => write!(f, "{}", e),
            ExtractError::Config(e) => write!(f, "{}", e),
            ExtractError::Io { path, error } => write!(f, "{}: {}", path.display(), error),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::GateMetal(e) => Some(e),
            ExtractError::Mask(e) => Some(e),
            ExtractError::Grid(e) => Some(e),
            ExtractError::Config(e) => Some(e),
            ExtractError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<Box<NetConflict>> for ExtractError {
    fn from(e: Box<NetConflict>) -> Self {
        ExtractError::NetConflict(e)
    }
}

impl From<MetalLinkFault> for ExtractError {
    fn from(e: MetalLinkFault) -> Self {
        ExtractError::MetalLink(e)
    }
}

impl From<GateMetalFault> for ExtractError {
    fn from(e: GateMetalFault) -> Self {
        ExtractError::GateMetal(e)
    }
}

impl From<MaskError> for ExtractError {
    fn from(e: MaskError) -> Self {
        ExtractError::Mask(e)
    }
}

impl From<GridError> for ExtractError {
    fn from(e: GridError) -> Self {
        ExtractError::Grid(e)
    }
}

impl From<ConfigError> for ExtractError {
    fn from(e: ConfigError) -> Self {
        ExtractError::Config(e)
    }
}

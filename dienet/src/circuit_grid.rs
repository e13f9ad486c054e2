// SPDX-License-Identifier: Apache-2.0

//! The per-pixel circuit id grid.
//!
//! One signed 32-bit little-endian cell per `(channel, x, y)`, channel
//! fastest-varying, `-1` meaning no circuit. The grid is memory mapped:
//! either a freshly created output file, an anonymous region, or a prior
//! run's output opened read-only.

use crate::circuit::CircuitId;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const NO_CIRCUIT: i32 = -1;

const CELL_BYTES: usize = 4;

#[derive(Debug)]
pub enum GridError {
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
    EmptyGrid {
        width: usize,
        height: usize,
        channels: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Io { path, error } => {
                write!(f, "circuit grid {}: {}", path.display(), error)
            }
            GridError::SizeMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "circuit grid {} holds {} bytes, expected {}",
                path.display(),
                actual,
                expected
            ),
            GridError::EmptyGrid {
                width,
                height,
                channels,
            } => write!(
                f,
                "cannot map an empty circuit grid ({}x{}, {} channels)",
                width, height, channels
            ),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridError::Io { error, .. } => Some(error),
            _ => None,
        }
    }
}

fn byte_len(width: usize, height: usize, channels: usize) -> Result<u64, GridError> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(GridError::EmptyGrid {
            width,
            height,
            channels,
        });
    }
    Ok(width as u64 * height as u64 * channels as u64 * CELL_BYTES as u64)
}

fn decode(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Read access shared by the writable grid and the read-only reader.
pub trait GridRead {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn channels(&self) -> usize;
    fn bytes(&self) -> &[u8];

    /// Raw cell value; positions outside the grid read as [`NO_CIRCUIT`].
    fn raw(&self, channel: usize, x: i32, y: i32) -> i32 {
        if x < 0 || y < 0 || channel >= self.channels() {
            return NO_CIRCUIT;
        }
        let (xu, yu) = (x as usize, y as usize);
        if xu >= self.width() || yu >= self.height() {
            return NO_CIRCUIT;
        }
        let cell = channel + self.channels() * (xu + yu * self.width());
        decode(self.bytes(), cell * CELL_BYTES)
    }

    fn get(&self, channel: usize, x: i32, y: i32) -> Option<CircuitId> {
        let v = self.raw(channel, x, y);
        if v < 0 {
            None
        } else {
            Some(CircuitId(v as usize))
        }
    }

    /// The channel holding metal circuits, always the last one.
    fn metal_channel(&self) -> usize {
        self.channels() - 1
    }

    /// The poly-only channel, present when the process has a poly layer.
    fn poly_channel(&self) -> Option<usize> {
        if self.channels() >= 3 {
            Some(1)
        } else {
            None
        }
    }
}

enum GridStorage {
    File { path: PathBuf, map: MmapMut },
    Anonymous(MmapMut),
}

pub struct CircuitGrid {
    width: usize,
    height: usize,
    channels: usize,
    storage: GridStorage,
}

impl fmt::Debug for CircuitGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish()
    }
}

impl CircuitGrid {
    /// Creates (or truncates) `path`, sizes it for the whole grid and maps
    /// it read-write with every cell set to [`NO_CIRCUIT`].
    pub fn create(
        path: &Path,
        channels: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, GridError> {
        let len = byte_len(width, height, channels)?;
        let io_err = |error| GridError::Io {
            path: path.to_path_buf(),
            error,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(io_err)?;
        file.set_len(len).map_err(io_err)?;
        // SAFETY: the file was just created by us and is not shared.
        let mut map = unsafe { MmapOptions::new().map_mut(&file) }.map_err(io_err)?;
        map.fill(0xff);
        log::debug!(
            "created circuit grid {} ({}x{}, {} channels, {} bytes)",
            path.display(),
            width,
            height,
            channels,
            len
        );
        Ok(CircuitGrid {
            width,
            height,
            channels,
            storage: GridStorage::File {
                path: path.to_path_buf(),
                map,
            },
        })
    }

    /// A grid backed by anonymous memory, for dry runs and tests.
    pub fn anonymous(channels: usize, width: usize, height: usize) -> Result<Self, GridError> {
        let len = byte_len(width, height, channels)?;
        let mut map = MmapOptions::new()
            .len(len as usize)
            .map_anon()
            .map_err(|error| GridError::Io {
                path: PathBuf::from("<anonymous>"),
                error,
            })?;
        map.fill(0xff);
        Ok(CircuitGrid {
            width,
            height,
            channels,
            storage: GridStorage::Anonymous(map),
        })
    }

    fn map_mut(&mut self) -> &mut MmapMut {
        match &mut self.storage {
            GridStorage::File { map, .. } => map,
            GridStorage::Anonymous(map) => map,
        }
    }

    /// Writes one cell. Positions outside the grid are ignored.
    pub fn set(&mut self, channel: usize, x: i32, y: i32, id: Option<CircuitId>) {
        if x < 0 || y < 0 || channel >= self.channels {
            return;
        }
        let (xu, yu) = (x as usize, y as usize);
        if xu >= self.width || yu >= self.height {
            return;
        }
        let value = match id {
            Some(CircuitId(v)) => v as i32,
            None => NO_CIRCUIT,
        };
        let offset = (channel + self.channels * (xu + yu * self.width)) * CELL_BYTES;
        self.map_mut()[offset..offset + CELL_BYTES].copy_from_slice(&value.to_le_bytes());
    }

    /// Rewrites every non-empty cell on every channel through `remap`.
    pub fn remap_all(&mut self, remap: impl Fn(CircuitId) -> Option<CircuitId>) {
        for cell in self.map_mut().chunks_exact_mut(CELL_BYTES) {
            let v = i32::from_le_bytes([cell[0], cell[1], cell[2], cell[3]]);
            if v < 0 {
                continue;
            }
            let value = match remap(CircuitId(v as usize)) {
                Some(CircuitId(n)) => n as i32,
                None => NO_CIRCUIT,
            };
            cell.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Flushes a file-backed grid to disk; a no-op for anonymous grids.
    pub fn flush(&self) -> Result<(), GridError> {
        match &self.storage {
            GridStorage::File { path, map } => map.flush().map_err(|error| GridError::Io {
                path: path.clone(),
                error,
            }),
            GridStorage::Anonymous(_) => Ok(()),
        }
    }
}

impl GridRead for CircuitGrid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn bytes(&self) -> &[u8] {
        match &self.storage {
            GridStorage::File { map, .. } => &map[..],
            GridStorage::Anonymous(map) => &map[..],
        }
    }
}

/// A prior run's grid, mapped read-only.
pub struct CircuitGridReader {
    width: usize,
    height: usize,
    channels: usize,
    map: Mmap,
}

impl fmt::Debug for CircuitGridReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitGridReader")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish()
    }
}

impl CircuitGridReader {
    pub fn open(
        path: &Path,
        channels: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, GridError> {
        let expected = byte_len(width, height, channels)?;
        let io_err = |error| GridError::Io {
            path: path.to_path_buf(),
            error,
        };
        let file = File::open(path).map_err(io_err)?;
        let actual = file.metadata().map_err(io_err)?.len();
        if actual != expected {
            return Err(GridError::SizeMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }
        // SAFETY: mapped read-only; the extraction that wrote it has finished.
        let map = unsafe { MmapOptions::new().map(&file) }.map_err(io_err)?;
        Ok(CircuitGridReader {
            width,
            height,
            channels,
            map,
        })
    }
}

impl GridRead for CircuitGridReader {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn bytes(&self) -> &[u8] {
        &self.map[..]
    }
}

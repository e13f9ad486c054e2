// SPDX-License-Identifier: Apache-2.0

//! Reading a netlist written by [`crate::netlist_writer`] back into memory,
//! for tools that consume extraction results.

use crate::circuit::{BoundingBox, CircuitId, CircuitKind, KindCounts, NetId, Side};
use crate::netlist_writer::POLY_SIDE_TAG;
use crate::nets::NetMember;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::SplitWhitespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetlistParseError {
    /// 1-based line number; one past the last line for a truncated file.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for NetlistParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for NetlistParseError {}

#[derive(Debug)]
pub enum NetlistError {
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    Parse {
        path: PathBuf,
        error: NetlistParseError,
    },
}

impl fmt::Display for NetlistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetlistError::Io { path, error } => {
                write!(f, "cannot read netlist {}: {}", path.display(), error)
            }
            NetlistError::Parse { path, error } => {
                write!(f, "malformed netlist {}: {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for NetlistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetlistError::Io { error, .. } => Some(error),
            NetlistError::Parse { error, .. } => Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetlistCircuit {
    pub kind: CircuitKind,
    pub net: Option<NetId>,
    pub net_poly_side: Option<NetId>,
    /// Bottom-left-origin frame, as written.
    pub bbox: BoundingBox,
    pub pixel_count: u64,
    pub neighbors: Vec<CircuitId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetlistTransistor {
    pub circuit: CircuitId,
    /// Bottom-left-origin frame, as written.
    pub x: i32,
    pub y: i32,
    pub terminal_1: Option<NetId>,
    pub gate: Option<NetId>,
    pub terminal_2: Option<NetId>,
    pub strength: f64,
}

/// Summary counts of a netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetlistStats {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub circuits: KindCounts,
    pub nets: usize,
    pub transistors: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Netlist {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub circuits: Vec<NetlistCircuit>,
    pub nets: Vec<Vec<NetMember>>,
    pub transistors: Vec<NetlistTransistor>,
    gate_index: BTreeMap<NetId, Vec<usize>>,
    terminal_index: BTreeMap<NetId, Vec<usize>>,
}

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> Lines<'a> {
    fn next_line(&mut self, what: &str) -> Result<SplitWhitespace<'a>, NetlistParseError> {
        match self.inner.next() {
            Some((i, text)) => {
                self.line = i + 1;
                Ok(text.split_whitespace())
            }
            None => Err(NetlistParseError {
                line: self.line + 1,
                message: format!("unexpected end of file, expected {}", what),
            }),
        }
    }

    fn error(&self, message: String) -> NetlistParseError {
        NetlistParseError {
            line: self.line,
            message,
        }
    }

    fn token<'b>(
        &self,
        tokens: &mut SplitWhitespace<'b>,
        what: &str,
    ) -> Result<&'b str, NetlistParseError> {
        tokens
            .next()
            .ok_or_else(|| self.error(format!("missing {}", what)))
    }

    fn number<T: std::str::FromStr>(
        &self,
        tokens: &mut SplitWhitespace<'_>,
        what: &str,
    ) -> Result<T, NetlistParseError> {
        let token = self.token(tokens, what)?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {} {:?}", what, token)))
    }

    fn net(
        &self,
        tokens: &mut SplitWhitespace<'_>,
        what: &str,
    ) -> Result<Option<NetId>, NetlistParseError> {
        let v: i64 = self.number(tokens, what)?;
        Ok(usize::try_from(v).ok().map(NetId))
    }

    /// Reads a `<count> <label>` section header.
    fn section(&mut self, label: &str) -> Result<usize, NetlistParseError> {
        let mut tokens = self.next_line(label)?;
        let count = self.number(&mut tokens, "count")?;
        match tokens.next() {
            Some(l) if l == label => Ok(count),
            other => Err(self.error(format!(
                "expected section {:?}, found {:?}",
                label,
                other.unwrap_or("")
            ))),
        }
    }

    /// Reads the leading entry id and checks that entries are numbered in
    /// order.
    fn entry_id(
        &self,
        tokens: &mut SplitWhitespace<'_>,
        expected: usize,
    ) -> Result<(), NetlistParseError> {
        let id: usize = self.number(tokens, "entry id")?;
        if id != expected {
            return Err(self.error(format!("entry id {} out of sequence, expected {}", id, expected)));
        }
        Ok(())
    }
}

impl Netlist {
    pub fn parse(text: &str) -> Result<Self, NetlistParseError> {
        let mut lines = Lines {
            inner: text.lines().enumerate(),
            line: 0,
        };

        let mut header = lines.next_line("header")?;
        let width = lines.number(&mut header, "width")?;
        let height = lines.number(&mut header, "height")?;
        let channels = lines.number(&mut header, "channel count")?;

        let circuit_count = lines.section("circuits")?;
        let mut circuits = Vec::new();
        for i in 0..circuit_count {
            let mut t = lines.next_line("circuit")?;
            lines.entry_id(&mut t, i)?;
            let code = lines.token(&mut t, "kind")?;
            let kind = single_char(code)
                .and_then(CircuitKind::from_code)
                .ok_or_else(|| lines.error(format!("unknown circuit kind {:?}", code)))?;
            let net = lines.net(&mut t, "net")?;
            let net_poly_side = lines.net(&mut t, "poly-side net")?;
            let bbox = BoundingBox {
                x0: lines.number(&mut t, "x0")?,
                y0: lines.number(&mut t, "y0")?,
                x1: lines.number(&mut t, "x1")?,
                y1: lines.number(&mut t, "y1")?,
            };
            let pixel_count = lines.number(&mut t, "pixel count")?;
            let mut neighbors = Vec::new();
            for token in t {
                let mut chars = token.chars();
                let id = chars
                    .next()
                    .and_then(CircuitKind::from_code)
                    .and_then(|_| chars.as_str().parse().ok())
                    .ok_or_else(|| lines.error(format!("invalid neighbor {:?}", token)))?;
                neighbors.push(CircuitId(id));
            }
            circuits.push(NetlistCircuit {
                kind,
                net,
                net_poly_side,
                bbox,
                pixel_count,
                neighbors,
            });
        }
        if let Some(bad) = circuits
            .iter()
            .flat_map(|c| c.neighbors.iter())
            .find(|n| n.0 >= circuit_count)
        {
            return Err(lines.error(format!("neighbor {} is not a circuit", bad)));
        }

        let net_count = lines.section("nets")?;
        let mut nets = Vec::new();
        for i in 0..net_count {
            let mut t = lines.next_line("net")?;
            lines.entry_id(&mut t, i)?;
            let mut members = Vec::new();
            for token in t {
                let raw: usize = token
                    .parse()
                    .map_err(|_| lines.error(format!("invalid net member {:?}", token)))?;
                let member = if raw >= POLY_SIDE_TAG {
                    NetMember {
                        side: Side::Poly,
                        circuit: CircuitId(raw - POLY_SIDE_TAG),
                    }
                } else {
                    NetMember::plain(CircuitId(raw))
                };
                if member.circuit.0 >= circuit_count {
                    return Err(lines.error(format!("net member {} is not a circuit", raw)));
                }
                members.push(member);
            }
            nets.push(members);
        }

        let transistor_count = lines.section("transistors")?;
        let mut transistors = Vec::new();
        for i in 0..transistor_count {
            let mut t = lines.next_line("transistor")?;
            lines.entry_id(&mut t, i)?;
            transistors.push(NetlistTransistor {
                circuit: CircuitId(lines.number(&mut t, "circuit")?),
                x: lines.number(&mut t, "x")?,
                y: lines.number(&mut t, "y")?,
                terminal_1: lines.net(&mut t, "terminal net")?,
                gate: lines.net(&mut t, "gate net")?,
                terminal_2: lines.net(&mut t, "terminal net")?,
                strength: lines.number(&mut t, "strength")?,
            });
        }

        let mut gate_index: BTreeMap<NetId, Vec<usize>> = BTreeMap::new();
        let mut terminal_index: BTreeMap<NetId, Vec<usize>> = BTreeMap::new();
        for (i, t) in transistors.iter().enumerate() {
            if let Some(g) = t.gate {
                gate_index.entry(g).or_default().push(i);
            }
            for net in [t.terminal_1, t.terminal_2].into_iter().flatten() {
                let entry = terminal_index.entry(net).or_default();
                if entry.last() != Some(&i) {
                    entry.push(i);
                }
            }
        }

        Ok(Netlist {
            width,
            height,
            channels,
            circuits,
            nets,
            transistors,
            gate_index,
            terminal_index,
        })
    }

    pub fn read(path: &Path) -> Result<Self, NetlistError> {
        let text = std::fs::read_to_string(path).map_err(|error| NetlistError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Netlist::parse(&text).map_err(|error| NetlistError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Indices of the transistors whose gate is on `net`.
    pub fn transistors_with_gate(&self, net: NetId) -> &[usize] {
        self.gate_index
            .get(&net)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Indices of the transistors with a terminal on `net`.
    pub fn transistors_with_terminal(&self, net: NetId) -> &[usize] {
        self.terminal_index
            .get(&net)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn kind_counts(&self) -> KindCounts {
        KindCounts::from_kinds(self.circuits.iter().map(|c| c.kind))
    }

    pub fn stats(&self) -> NetlistStats {
        NetlistStats {
            width: self.width,
            height: self.height,
            channels: self.channels,
            circuits: self.kind_counts(),
            nets: self.nets.len(),
            transistors: self.transistors.len(),
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

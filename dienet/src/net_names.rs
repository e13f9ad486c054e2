// SPDX-License-Identifier: Apache-2.0

//! Human names for nets, read from a pin file.
//!
//! Each pin line is `<layer> <x> <y> <name>`: the net of the circuit found at
//! grid position (x, y) of the given layer is called `name`. Layer `a` is
//! channel 0, `p` the poly channel and `m` the metal channel.

use crate::circuit::{CircuitId, NetId};
use crate::circuit_grid::GridRead;
use crate::netlist_reader::Netlist;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetNameError {
    Syntax { line: usize, message: String },
    UnknownLayer { line: usize, layer: String },
    NoCircuit { layer: char, x: i32, y: i32 },
    NoNet { circuit: CircuitId },
    Collision { existing: String, name: String },
    DuplicateName { name: String, first: NetId, second: NetId },
}

impl fmt::Display for NetNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetNameError::Syntax { line, message } => {
                write!(f, "pin file line {}: {}", line, message)
            }
            NetNameError::UnknownLayer { line, layer } => {
                write!(f, "Unknown layer type in pin file line {}: {}", line, layer)
            }
            NetNameError::NoCircuit { layer, x, y } => {
                write!(f, "No circuit at {} {} {}", layer, x, y)
            }
            NetNameError::NoNet { circuit } => {
                write!(f, "Circuit {} has no net in the netlist", circuit)
            }
            NetNameError::Collision { existing, name } => {
                write!(f, "Net name collision {} and {}", existing, name)
            }
            NetNameError::DuplicateName {
                name,
                first,
                second,
            } => write!(f, "Net name {} used for nets {} and {}", name, first, second),
        }
    }
}

impl std::error::Error for NetNameError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetNames {
    names: BTreeMap<NetId, String>,
    nets: BTreeMap<String, NetId>,
}

impl NetNames {
    pub fn load<G: GridRead>(
        pins: &str,
        grid: &G,
        netlist: &Netlist,
    ) -> Result<Self, NetNameError> {
        let mut result = NetNames::default();
        for (i, text) in pins.lines().enumerate() {
            let line = i + 1;
            let text = text.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = text.split_whitespace().collect();
            let &[layer, x, y, name] = tokens.as_slice() else {
                return Err(NetNameError::Syntax {
                    line,
                    message: format!("expected `<layer> <x> <y> <name>`, got {:?}", text),
                });
            };
            let coord = |s: &str| {
                s.parse::<i32>().map_err(|_| NetNameError::Syntax {
                    line,
                    message: format!("invalid coordinate {:?}", s),
                })
            };
            let (x, y) = (coord(x)?, coord(y)?);
            let (code, channel) = match layer {
                "a" => ('a', Some(0)),
                "p" => ('p', grid.poly_channel()),
                "m" => ('m', Some(grid.metal_channel())),
                _ => {
                    return Err(NetNameError::UnknownLayer {
                        line,
                        layer: layer.to_string(),
                    })
                }
            };
            let circuit = channel
                .and_then(|c| grid.get(c, x, y))
                .ok_or(NetNameError::NoCircuit { layer: code, x, y })?;
            let net = netlist
                .circuits
                .get(circuit.0)
                .and_then(|c| c.net)
                .ok_or(NetNameError::NoNet { circuit })?;
            result.insert(net, name)?;
        }
        log::debug!("{} net names loaded", result.names.len());
        Ok(result)
    }

    fn insert(&mut self, net: NetId, name: &str) -> Result<(), NetNameError> {
        if let Some(existing) = self.names.get(&net) {
            if existing != name {
                return Err(NetNameError::Collision {
                    existing: existing.clone(),
                    name: name.to_string(),
                });
            }
            return Ok(());
        }
        if let Some(&first) = self.nets.get(name) {
            return Err(NetNameError::DuplicateName {
                name: name.to_string(),
                first,
                second: net,
            });
        }
        self.names.insert(net, name.to_string());
        self.nets.insert(name.to_string(), net);
        Ok(())
    }

    /// The name of `net`, or its decimal id when it has none.
    pub fn net_name(&self, net: NetId) -> String {
        self.names
            .get(&net)
            .cloned()
            .unwrap_or_else(|| net.to_string())
    }

    pub fn find(&self, name: &str) -> Option<NetId> {
        self.nets.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Named nets in net order.
    pub fn iter(&self) -> impl Iterator<Item = (NetId, &str)> {
        self.names.iter().map(|(n, s)| (*n, s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{CircuitCatalog, CircuitKind};
    use crate::circuit_grid::CircuitGrid;
    use crate::test_utils::paint_circuit;
    use pretty_assertions::assert_eq;

    /// Active a0 on net 0 and metal m1 on net 1, with the netlist text that
    /// describes them.
    fn fixture() -> (CircuitGrid, Netlist) {
        let mut grid = CircuitGrid::anonymous(3, 4, 2).unwrap();
        let mut catalog = CircuitCatalog::new();
        paint_circuit(&mut catalog, &mut grid, 0, CircuitKind::Active, (0, 0, 1, 1));
        paint_circuit(&mut catalog, &mut grid, 2, CircuitKind::Metal, (2, 0, 3, 1));
        let netlist = Netlist::parse(
            "4 2 3\n2 circuits\n0 a 0 -1 0 0 1 1 4\n1 m 1 -1 2 0 3 1 4\n2 nets\n0 0\n1 1\n0 transistors\n",
        )
        .unwrap();
        (grid, netlist)
    }

    #[test]
    fn names_resolve_through_the_grid() {
        let (grid, netlist) = fixture();
        let pins = "# pins\n\na 1 1 vdd\nm 3 0 clk\na 0 0 vdd\n";
        let names = NetNames::load(pins, &grid, &netlist).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names.net_name(NetId(0)), "vdd");
        assert_eq!(names.net_name(NetId(1)), "clk");
        assert_eq!(names.net_name(NetId(7)), "7");
        assert_eq!(names.find("clk"), Some(NetId(1)));
        assert_eq!(names.find("gnd"), None);
        assert_eq!(
            names.iter().collect::<Vec<_>>(),
            vec![(NetId(0), "vdd"), (NetId(1), "clk")]
        );
    }

    #[test]
    fn conflicting_pins_are_rejected() {
        let (grid, netlist) = fixture();
        let err = NetNames::load("a 0 0 vdd\na 1 0 gnd\n", &grid, &netlist).unwrap_err();
        assert_eq!(err.to_string(), "Net name collision vdd and gnd");

        let err = NetNames::load("a 0 0 vdd\nm 2 1 vdd\n", &grid, &netlist).unwrap_err();
        assert_eq!(
            err,
            NetNameError::DuplicateName {
                name: "vdd".to_string(),
                first: NetId(0),
                second: NetId(1)
            }
        );
    }

    #[test]
    fn pins_off_any_circuit_are_rejected() {
        let (grid, netlist) = fixture();
        let err = NetNames::load("m 0 0 vdd\n", &grid, &netlist).unwrap_err();
        assert_eq!(err.to_string(), "No circuit at m 0 0");
        let err = NetNames::load("x 0 0 vdd\n", &grid, &netlist).unwrap_err();
        assert!(matches!(err, NetNameError::UnknownLayer { line: 1, .. }));
        let err = NetNames::load("a 0 vdd\n", &grid, &netlist).unwrap_err();
        assert!(matches!(err, NetNameError::Syntax { line: 1, .. }));
    }
}

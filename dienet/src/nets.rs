// SPDX-License-Identifier: Apache-2.0

//! Net propagation.
//!
//! Each unclaimed circuit seeds a breadth-first walk over the electrical
//! links of its kind: adjacency for shorted layers, vias between metal and
//! active/poly. A capacitor is claimed separately on each of its sides.
//! Reaching a circuit that already belongs to another net is fatal.

use crate::circuit::{BoundingBox, CircuitCatalog, CircuitId, CircuitKind, NetId, Side};
use crate::progress::ProgressMeter;
use crate::vias::ViaMap;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// One member of a net. The side is `Poly` only for the poly plate of a
/// capacitor, so plain members sort before capacitor poly plates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetMember {
    pub side: Side,
    pub circuit: CircuitId,
}

impl NetMember {
    pub fn plain(circuit: CircuitId) -> Self {
        NetMember {
            side: Side::Active,
            circuit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetRecord {
    pub members: BTreeSet<NetMember>,
}

/// One line of a conflict report: a net member with its neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDump {
    pub member: NetMember,
    pub kind: CircuitKind,
    pub bbox: BoundingBox,
    pub neighbors: Vec<(CircuitKind, CircuitId)>,
}

impl fmt::Display for MemberDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  - {}{}", self.kind.code(), self.member.circuit)?;
        if self.member.side == Side::Poly {
            write!(f, " (poly side)")?;
        }
        write!(f, " {}", self.bbox)?;
        for (kind, id) in &self.neighbors {
            write!(f, " {}{}", kind.code(), id)?;
        }
        Ok(())
    }
}

/// Two nets claiming the same circuit side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConflict {
    pub circuit: CircuitId,
    pub kind: CircuitKind,
    pub side: Side,
    pub bbox: BoundingBox,
    /// The net being built when the conflict was found.
    pub incoming: NetId,
    /// The net already holding the circuit.
    pub existing: NetId,
    pub incoming_members: Vec<MemberDump>,
    pub existing_members: Vec<MemberDump>,
}

impl fmt::Display for NetConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Network creation failure on {}{} {}, nets {} and {} want to link",
            self.kind.code(),
            self.circuit,
            self.bbox,
            self.incoming,
            self.existing
        )?;
        write!(f, "\n  net {}:", self.existing)?;
        for m in &self.existing_members {
            write!(f, "\n{}", m)?;
        }
        write!(f, "\n  net {}:", self.incoming)?;
        for m in &self.incoming_members {
            write!(f, "\n{}", m)?;
        }
        Ok(())
    }
}

fn dump_members(catalog: &CircuitCatalog, net: &NetRecord, height: i32) -> Vec<MemberDump> {
    net.members
        .iter()
        .map(|m| {
            let record = &catalog[m.circuit];
            MemberDump {
                member: *m,
                kind: record.kind,
                bbox: record.bbox.flipped(height),
                neighbors: record
                    .neighbors
                    .iter()
                    .map(|n| (catalog.kind(*n), *n))
                    .collect(),
            }
        })
        .collect()
}

/// Queues the circuits linked by vias to `id` that have no net yet.
fn push_via_links(
    pending: &mut VecDeque<(CircuitId, Side)>,
    catalog: &CircuitCatalog,
    linked: &[CircuitId],
) {
    for &other in linked {
        if catalog[other].net.is_none() {
            pending.push_back((other, Side::Active));
        }
    }
}

/// Queues everything `id`, just claimed on `side`, passes its net on to.
fn push_links(
    pending: &mut VecDeque<(CircuitId, Side)>,
    catalog: &CircuitCatalog,
    vias: &ViaMap,
    id: CircuitId,
    side: Side,
) {
    use CircuitKind::*;
    let record = &catalog[id];
    let neighbors = record.neighbors.iter().map(|n| (*n, catalog.kind(*n)));
    match record.kind {
        Active => {
            push_via_links(pending, catalog, vias.metals_of(id));
            for (n, kind) in neighbors {
                if matches!(kind, Buried | Capacitor) {
                    pending.push_back((n, Side::Active));
                }
            }
        }
        Poly => {
            push_via_links(pending, catalog, vias.metals_of(id));
            for (n, kind) in neighbors {
                let unclaimed = match kind {
                    Buried | Transistor => catalog[n].net.is_none(),
                    Capacitor => catalog[n].net_poly_side.is_none(),
                    _ => false,
                };
                if unclaimed {
                    pending.push_back((n, Side::Poly));
                }
            }
        }
        Metal => push_via_links(pending, catalog, vias.active_poly_of(id)),
        Buried => {
            push_via_links(pending, catalog, vias.metals_of(id));
            for (n, kind) in neighbors {
                if matches!(kind, Active | Capacitor) {
                    pending.push_back((n, Side::Active));
                }
                if matches!(kind, Poly | Transistor | Capacitor) {
                    pending.push_back((n, Side::Poly));
                }
            }
        }
        Transistor => {
            for (n, kind) in neighbors {
                if matches!(kind, Buried | Poly | Capacitor) {
                    pending.push_back((n, Side::Poly));
                }
            }
        }
        Capacitor => {
            for (n, kind) in neighbors {
                match side {
                    Side::Poly if matches!(kind, Buried | Poly | Transistor) => {
                        pending.push_back((n, Side::Poly))
                    }
                    Side::Active if matches!(kind, Buried | Active) => {
                        pending.push_back((n, Side::Active))
                    }
                    _ => {}
                }
            }
        }
        Disabled => {}
    }
}

/// Assigns a net to every live circuit reachable from a seed.
///
/// Every live circuit without a net seeds a new net, except capacitors
/// (they are only ever reached from a neighbor) and, when
/// `seed_transistors` is false, transistors (their gate net comes from
/// elsewhere).
pub fn build_nets(
    catalog: &mut CircuitCatalog,
    vias: &ViaMap,
    seed_transistors: bool,
    height: i32,
) -> Result<Vec<NetRecord>, Box<NetConflict>> {
    let mut progress = ProgressMeter::start("building nets");
    let mut nets: Vec<NetRecord> = Vec::new();
    let count = catalog.len();
    for i in 0..count {
        progress.tick(i, count);
        let seed = CircuitId(i);
        let record = &catalog[seed];
        if !record.is_live() || record.net.is_some() {
            continue;
        }
        match record.kind {
            CircuitKind::Capacitor => continue,
            CircuitKind::Transistor if !seed_transistors => continue,
            _ => {}
        }

        let net = NetId(nets.len());
        nets.push(NetRecord::default());
        let mut pending = VecDeque::new();
        pending.push_back((seed, Side::Active));
        while let Some((id, side)) = pending.pop_front() {
            let record = &catalog[id];
            if let Some(current) = record.net_on(side) {
                if current != net {
                    return Err(Box::new(NetConflict {
                        circuit: id,
                        kind: record.kind,
                        side,
                        bbox: record.bbox.flipped(height),
                        incoming: net,
                        existing: current,
                        incoming_members: dump_members(catalog, &nets[net.0], height),
                        existing_members: dump_members(catalog, &nets[current.0], height),
                    }));
                }
                continue;
            }

            let member_side = if record.kind == CircuitKind::Capacitor {
                side
            } else {
                Side::Active
            };
            nets[net.0].members.insert(NetMember {
                side: member_side,
                circuit: id,
            });
            catalog[id].set_net_on(side, net);
            push_links(&mut pending, catalog, vias, id, side);
        }
    }
    log::info!("  -> {} nets built", nets.len());
    Ok(nets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitRecord;
    use crate::vias::ViaRecord;
    use pretty_assertions::assert_eq;

    fn catalog_with(kinds: &[CircuitKind], edges: &[(usize, usize)]) -> CircuitCatalog {
        let mut catalog = CircuitCatalog::new();
        for (i, kind) in kinds.iter().enumerate() {
            catalog.push(CircuitRecord::new(*kind, i as i32, 0));
        }
        for &(a, b) in edges {
            catalog.link(CircuitId(a), CircuitId(b));
        }
        catalog
    }

    fn net_of(nets: &[NetRecord], n: usize) -> Vec<(Side, usize)> {
        nets[n]
            .members
            .iter()
            .map(|m| (m.side, m.circuit.0))
            .collect()
    }

    #[test]
    fn transistor_carries_the_gate_net_only() {
        use CircuitKind::*;
        // a0 - t1 - a2, poly p3 over t1, metal m4 via-linked to a0.
        let mut catalog = catalog_with(
            &[Active, Transistor, Active, Poly, Metal],
            &[(0, 1), (1, 2), (1, 3)],
        );
        let mut vias = ViaMap::default();
        vias.add(ViaRecord {
            metal: CircuitId(4),
            active_poly: CircuitId(0),
        });
        let nets = build_nets(&mut catalog, &vias, true, 10).unwrap();
        assert_eq!(nets.len(), 3);
        assert_eq!(net_of(&nets, 0), vec![(Side::Active, 0), (Side::Active, 4)]);
        assert_eq!(net_of(&nets, 1), vec![(Side::Active, 1), (Side::Active, 3)]);
        assert_eq!(net_of(&nets, 2), vec![(Side::Active, 2)]);
        assert_eq!(catalog[CircuitId(3)].net, Some(NetId(1)));
    }

    #[test]
    fn capacitor_belongs_to_two_nets() {
        use CircuitKind::*;
        // Active a0 and poly p2 on either plate of capacitor c1.
        let mut catalog = catalog_with(&[Active, Capacitor, Poly], &[(0, 1), (1, 2)]);
        let nets = build_nets(&mut catalog, &ViaMap::default(), true, 10).unwrap();
        assert_eq!(nets.len(), 2);
        assert_eq!(net_of(&nets, 0), vec![(Side::Active, 0), (Side::Active, 1)]);
        assert_eq!(net_of(&nets, 1), vec![(Side::Active, 2), (Side::Poly, 1)]);
        let cap = &catalog[CircuitId(1)];
        assert_eq!(cap.net, Some(NetId(0)));
        assert_eq!(cap.net_poly_side, Some(NetId(1)));
    }

    #[test]
    fn unseeded_transistors_stay_netless() {
        use CircuitKind::*;
        let mut catalog = catalog_with(&[Active, Transistor, Active], &[(0, 1), (1, 2)]);
        let nets = build_nets(&mut catalog, &ViaMap::default(), false, 10).unwrap();
        assert_eq!(nets.len(), 2);
        assert_eq!(catalog[CircuitId(1)].net, None);
    }

    #[test]
    fn second_claim_on_a_circuit_is_a_conflict() {
        use CircuitKind::*;
        // b0 is claimed by its own net first; a2 later reaches it through a
        // one-sided adjacency.
        let mut catalog = catalog_with(&[Buried, Poly, Active], &[]);
        catalog[CircuitId(2)].neighbors.insert(CircuitId(0));
        let conflict = build_nets(&mut catalog, &ViaMap::default(), true, 10).unwrap_err();
        assert_eq!(conflict.circuit, CircuitId(0));
        assert_eq!(conflict.incoming, NetId(2));
        assert_eq!(conflict.existing, NetId(0));
        let text = conflict.to_string();
        assert!(
            text.starts_with("Network creation failure on b0 (0, 9)-(0, 9), nets 2 and 0 want to link"),
            "{text}"
        );
        assert!(text.contains("\n  net 0:\n  - b0 (0, 9)-(0, 9)"));
        assert!(text.contains("\n  net 2:\n  - a2 (2, 9)-(2, 9) b0"));
    }

    #[test]
    fn metal_links_active_and_poly_through_vias() {
        use CircuitKind::*;
        let mut catalog = catalog_with(&[Active, Poly, Metal], &[]);
        let mut vias = ViaMap::default();
        vias.add(ViaRecord {
            metal: CircuitId(2),
            active_poly: CircuitId(0),
        });
        vias.add(ViaRecord {
            metal: CircuitId(2),
            active_poly: CircuitId(1),
        });
        let nets = build_nets(&mut catalog, &vias, true, 10).unwrap();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].members.len(), 3);
    }
}

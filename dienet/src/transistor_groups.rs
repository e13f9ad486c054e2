// SPDX-License-Identifier: Apache-2.0

//! Partition of a transistor's neighbors into terminal groups.

use crate::circuit::{is_active_poly_pair, CircuitCatalog, CircuitId, CircuitKind};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalGroup {
    pub members: BTreeSet<CircuitId>,
    /// Holds an active, buried or capacitor circuit.
    pub is_terminal: bool,
    /// Holds a poly, buried or capacitor circuit.
    pub is_gate: bool,
}

impl TerminalGroup {
    fn single(id: CircuitId, kind: CircuitKind) -> Self {
        TerminalGroup {
            members: BTreeSet::from([id]),
            is_terminal: kind.is_terminal_side(),
            is_gate: kind.is_gate_side(),
        }
    }

    fn absorb(&mut self, other: TerminalGroup) {
        self.members.extend(other.members);
        self.is_terminal |= other.is_terminal;
        self.is_gate |= other.is_gate;
    }

    /// The lowest member id; its net stands for the whole group.
    pub fn representative(&self) -> Option<CircuitId> {
        self.members.iter().next().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransistorGroups {
    pub groups: Vec<TerminalGroup>,
}

impl TransistorGroups {
    pub fn terminal_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_terminal).count()
    }

    pub fn gate_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_gate).count()
    }

    pub fn terminal_indices(&self) -> Vec<usize> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_terminal)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Groups the neighbors of `transistor`: two neighbors share a group when
/// they are adjacent to each other through anything but an active/poly
/// edge, closed transitively. Buried and capacitor neighbors are placed
/// first so that group order is stable across the ways a region can be
/// bridged.
pub fn group_neighbors(catalog: &CircuitCatalog, transistor: CircuitId) -> TransistorGroups {
    let neighbors = &catalog[transistor].neighbors;
    let bridging = |id: &&CircuitId| {
        matches!(
            catalog.kind(**id),
            CircuitKind::Buried | CircuitKind::Capacitor
        )
    };
    let ordered = neighbors
        .iter()
        .filter(bridging)
        .chain(neighbors.iter().filter(|id| !bridging(id)));

    let mut groups: Vec<TerminalGroup> = Vec::new();
    for &n in ordered {
        let n_record = &catalog[n];
        let touching: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| {
                g.members.iter().any(|m| {
                    n_record.neighbors.contains(m)
                        && !is_active_poly_pair(n_record.kind, catalog.kind(*m))
                })
            })
            .map(|(i, _)| i)
            .collect();

        let mut joined = TerminalGroup::single(n, n_record.kind);
        match touching.first() {
            None => groups.push(joined),
            Some(&first) => {
                // Merge later groups into the first one, back to front so the
                // indices stay valid.
                for &i in touching[1..].iter().rev() {
                    let merged = groups.remove(i);
                    joined.absorb(merged);
                }
                groups[first].absorb(joined);
            }
        }
    }
    TransistorGroups { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitRecord;

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

    fn members(g: &TerminalGroup) -> Vec<usize> {
        g.members.iter().map(|c| c.0).collect()
    }

    #[test]
    fn plain_transistor_has_two_terminals_and_a_gate() {
        use CircuitKind::*;
        let catalog = catalog_with(
            &[Transistor, Active, Active, Poly],
            &[(0, 1), (0, 2), (0, 3)],
        );
        let groups = group_neighbors(&catalog, CircuitId(0));
        assert_eq!(groups.groups.len(), 3);
        assert_eq!(groups.terminal_count(), 2);
        assert_eq!(groups.gate_count(), 1);
        assert_eq!(groups.terminal_indices(), vec![0, 1]);
    }

    #[test]
    fn buried_joins_its_active_and_poly() {
        use CircuitKind::*;
        // 1 buried touches active 2 and poly 3; active 4 is alone.
        let catalog = catalog_with(
            &[Transistor, Buried, Active, Poly, Active],
            &[(0, 1), (0, 2), (0, 3), (0, 4), (1, 2), (1, 3)],
        );
        let groups = group_neighbors(&catalog, CircuitId(0));
        assert_eq!(groups.groups.len(), 2);
        assert_eq!(members(&groups.groups[0]), vec![1, 2, 3]);
        assert!(groups.groups[0].is_terminal && groups.groups[0].is_gate);
        assert_eq!(members(&groups.groups[1]), vec![4]);
        assert_eq!(groups.terminal_count(), 2);
    }

    #[test]
    fn a_later_neighbor_bridges_two_groups() {
        use CircuitKind::*;
        // Actives 1 and 2 are separate until transistor 3 touching both is
        // considered.
        let catalog = catalog_with(
            &[Transistor, Active, Active, Transistor],
            &[(0, 1), (0, 2), (0, 3), (3, 1), (3, 2)],
        );
        let groups = group_neighbors(&catalog, CircuitId(0));
        assert_eq!(groups.groups.len(), 1);
        assert_eq!(members(&groups.groups[0]), vec![1, 2, 3]);
        assert!(groups.groups[0].is_terminal);
        assert!(!groups.groups[0].is_gate);
    }

    #[test]
    fn active_poly_edges_do_not_join() {
        use CircuitKind::*;
        let mut catalog = catalog_with(&[Transistor, Active, Poly], &[(0, 1), (0, 2)]);
        catalog[CircuitId(1)].neighbors.insert(CircuitId(2));
        catalog[CircuitId(2)].neighbors.insert(CircuitId(1));
        let groups = group_neighbors(&catalog, CircuitId(0));
        assert_eq!(groups.groups.len(), 2);
        assert_eq!(groups.groups[0].representative(), Some(CircuitId(1)));
    }
}

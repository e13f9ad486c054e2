// SPDX-License-Identifier: Apache-2.0

//! Text netlist output: a header line, then circuits, nets and transistors,
//! each section prefixed by its entry count. All y coordinates are written
//! in the bottom-left-origin frame.

use crate::circuit::{CircuitCatalog, NetId, Side};
use crate::nets::{NetMember, NetRecord};
use crate::terminal_pairing::TransistorRecord;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Added to the id of a capacitor listed as a member of its poly-side net.
pub const POLY_SIDE_TAG: usize = 1_000_000;

/// Everything that goes into a netlist file.
pub struct NetlistDump<'a> {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub catalog: &'a CircuitCatalog,
    pub nets: &'a [NetRecord],
    pub transistors: &'a [TransistorRecord],
}

fn net_or_none(net: Option<NetId>) -> i64 {
    net.map_or(-1, |n| n.0 as i64)
}

/// The id under which `member` is listed in its net.
pub fn encode_member(member: &NetMember) -> usize {
    match member.side {
        Side::Active => member.circuit.0,
        Side::Poly => member.circuit.0 + POLY_SIDE_TAG,
    }
}

pub fn write_netlist<W: Write>(out: &mut W, dump: &NetlistDump) -> std::io::Result<()> {
    let h = dump.height as i32;
    writeln!(out, "{} {} {}", dump.width, dump.height, dump.channels)?;

    writeln!(out, "{} circuits", dump.catalog.len())?;
    for (id, c) in dump.catalog.iter() {
        let b = c.bbox.flipped(h);
        write!(
            out,
            "{:6} {} {:5} {:5} {:5} {:5} {:5} {:5} {}",
            id.0,
            c.kind.code(),
            net_or_none(c.net),
            net_or_none(c.net_poly_side),
            b.x0,
            b.y0,
            b.x1,
            b.y1,
            c.pixel_count
        )?;
        for n in &c.neighbors {
            write!(out, " {}{}", dump.catalog.kind(*n).code(), n.0)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{} nets", dump.nets.len())?;
    for (i, net) in dump.nets.iter().enumerate() {
        write!(out, "{:5}", i)?;
        for m in &net.members {
            write!(out, " {}", encode_member(m))?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{} transistors", dump.transistors.len())?;
    for (i, t) in dump.transistors.iter().enumerate() {
        writeln!(
            out,
            "{:5} {:6} {:5} {:5} {:5} {:5} {:5} {}",
            i,
            t.circuit.0,
            t.anchor.0,
            h - 1 - t.anchor.1,
            net_or_none(t.terminal_1),
            net_or_none(t.gate),
            net_or_none(t.terminal_2),
            t.strength
        )?;
    }
    Ok(())
}

pub fn write_netlist_file(path: &Path, dump: &NetlistDump) -> std::io::Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    write_netlist(&mut out, dump)?;
    out.flush()
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape roots and assembly placements
//!
//! Shells are meshed in the frame they are written in. Where they land in
//! the model comes from the representation graph:
//!
//! - `MAPPED_ITEM` places a mapped representation inside the one listing it
//! - a `REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION` places `rep_1` in `rep_2`
//! - a relationship without a transformation joins two representations of
//!   the same part (typically `SHAPE_REPRESENTATION` and its B-rep)
//!
//! Every path from a shape root up to a representation nobody places is one
//! instance, so a part used twice is emitted twice.

use crate::error::{Error, Result};
use crate::transform::parse_axis2_placement_3d_from_id;
use nalgebra::Matrix4;
use rustc_hash::{FxHashMap, FxHashSet};
use stepmesh_core::{AttributeValue, DecodedEntity, EntityDecoder, EntityScanner};
use tracing::{debug, warn};

/// Entity types treated as shape roots
pub const ROOT_TYPES: &[&str] = &[
    "MANIFOLD_SOLID_BREP",
    "BREP_WITH_VOIDS",
    "FACETED_BREP",
    "SHELL_BASED_SURFACE_MODEL",
];

/// Upper bound on placements of one representation
const MAX_INSTANCES: usize = 10_000;

/// One placed copy of a shell
#[derive(Debug, Clone, PartialEq)]
pub struct ShellInstance {
    /// `CLOSED_SHELL` / `OPEN_SHELL` id
    pub shell: u32,
    /// Void shells and `ORIENTED_*_SHELL(.F.)` turn their faces around
    pub reversed: bool,
    /// Shell frame to model frame, in file units
    pub placement: Matrix4<f64>,
}

/// Placement of a child representation in a parent
#[derive(Debug, Clone)]
struct Link {
    parent: u32,
    transform: Matrix4<f64>,
}

/// Representation graph of one file
#[derive(Debug, Default)]
struct Assembly {
    /// Union-find over representations joined without a transformation
    joined: FxHashMap<u32, u32>,
    /// Child group -> placements in parent groups
    links: FxHashMap<u32, Vec<Link>>,
    /// Shape root -> representations listing it
    owners: FxHashMap<u32, Vec<u32>>,
}

impl Assembly {
    fn group(&self, mut rep: u32) -> u32 {
        while let Some(&parent) = self.joined.get(&rep) {
            if parent == rep {
                break;
            }
            rep = parent;
        }
        rep
    }

    fn join(&mut self, a: u32, b: u32) {
        let (a, b) = (self.group(a), self.group(b));
        if a != b {
            self.joined.insert(a.max(b), a.min(b));
        }
    }

    /// Model-space placements of a representation group
    fn placements(
        &self,
        group: u32,
        memo: &mut FxHashMap<u32, Vec<Matrix4<f64>>>,
        visiting: &mut FxHashSet<u32>,
    ) -> Vec<Matrix4<f64>> {
        if let Some(known) = memo.get(&group) {
            return known.clone();
        }
        let Some(links) = self.links.get(&group) else {
            return vec![Matrix4::identity()];
        };
        if !visiting.insert(group) {
            warn!(representation = group, "cyclic assembly, placing at origin");
            return vec![Matrix4::identity()];
        }

        let mut out = Vec::new();
        'links: for link in links {
            for parent in self.placements(link.parent, memo, visiting) {
                if out.len() == MAX_INSTANCES {
                    warn!(representation = group, limit = MAX_INSTANCES, "too many instances");
                    break 'links;
                }
                out.push(parent * link.transform);
            }
        }

        visiting.remove(&group);
        memo.insert(group, out.clone());
        out
    }
}

/// Resolve every shell instance, ordered by root id, then placement, then
/// shell order within the root
pub fn resolve_instances(content: &str, decoder: &mut EntityDecoder) -> Result<Vec<ShellInstance>> {
    let mut roots = Vec::new();
    let mut representations = Vec::new();
    let mut relationships = Vec::new();

    let mut scanner = EntityScanner::new(content);
    while let Some((id, type_name, _, _)) = scanner.next_entity() {
        let upper = type_name.to_ascii_uppercase();
        if ROOT_TYPES.contains(&upper.as_str()) {
            roots.push(id);
        } else if upper.contains("REPRESENTATION_RELATIONSHIP") {
            relationships.push(id);
        } else if upper.ends_with("REPRESENTATION") {
            representations.push(id);
        }
    }
    roots.sort_unstable();

    let mut assembly = Assembly::default();
    let mut pending = Vec::new();

    for &rep_id in &representations {
        let rep = decoder.decode_by_id(rep_id)?;
        // ('', items, context); SHAPE_DEFINITION_REPRESENTATION and friends
        // carry a reference here instead
        let Some(items) = rep.get_list(1) else {
            continue;
        };
        for item_id in items.iter().filter_map(AttributeValue::as_entity_ref) {
            let item = decoder.decode_by_id(item_id)?;
            if ROOT_TYPES.iter().any(|t| item.is_a(t)) {
                assembly.owners.entry(item_id).or_default().push(rep_id);
            } else if item.is_a("MAPPED_ITEM") {
                let (child, transform) = mapped_item(&item, decoder)?;
                pending.push((child, rep_id, transform));
            }
        }
    }

    for &rel_id in &relationships {
        let rel = decoder.decode_by_id(rel_id)?;
        let Some((child, parent, operator)) = relationship_ends(&rel) else {
            debug!(relationship = rel_id, "skipping relationship without representations");
            continue;
        };
        match operator {
            Some(op) => pending.push((child, parent, transformation(op, decoder)?)),
            None => assembly.join(child, parent),
        }
    }

    for (child, parent, transform) in pending {
        let (child, parent) = (assembly.group(child), assembly.group(parent));
        if child != parent {
            assembly
                .links
                .entry(child)
                .or_default()
                .push(Link { parent, transform });
        }
    }

    let mut memo = FxHashMap::default();
    let mut visiting = FxHashSet::default();
    let mut instances = Vec::new();

    for &root in &roots {
        let shells = root_shells(root, decoder)?;

        let mut groups: Vec<u32> = Vec::new();
        for &rep in assembly.owners.get(&root).map(Vec::as_slice).unwrap_or_default() {
            let group = assembly.group(rep);
            if !groups.contains(&group) {
                groups.push(group);
            }
        }

        let placements = if groups.is_empty() {
            vec![Matrix4::identity()]
        } else {
            groups
                .iter()
                .flat_map(|&g| assembly.placements(g, &mut memo, &mut visiting))
                .collect()
        };

        for placement in &placements {
            for &(shell, reversed) in &shells {
                instances.push(ShellInstance {
                    shell,
                    reversed,
                    placement: *placement,
                });
            }
        }
    }

    debug!(
        roots = roots.len(),
        representations = representations.len(),
        instances = instances.len(),
        "resolved shell instances"
    );
    Ok(instances)
}

/// Shells of one root with their orientation flags, in file order
pub fn root_shells(root_id: u32, decoder: &mut EntityDecoder) -> Result<Vec<(u32, bool)>> {
    let root = decoder.decode_by_id(root_id)?;
    let mut shells = Vec::new();

    match root.type_name.as_str() {
        // ('', outer)
        "MANIFOLD_SOLID_BREP" | "FACETED_BREP" => {
            shells.push(unwrap_shell(root.require_ref(1, "outer shell")?, false, decoder)?);
        }
        // ('', outer, (voids)); voids are normally ORIENTED_CLOSED_SHELL(.F.),
        // bare void shells are reversed here
        "BREP_WITH_VOIDS" => {
            shells.push(unwrap_shell(root.require_ref(1, "outer shell")?, false, decoder)?);
            let voids = root.require_list(2, "voids")?.to_vec();
            for void in voids.iter().filter_map(AttributeValue::as_entity_ref) {
                let wrapped = decoder.decode_by_id(void)?.is_a("ORIENTED_CLOSED_SHELL");
                shells.push(unwrap_shell(void, !wrapped, decoder)?);
            }
        }
        // ('', (shells))
        "SHELL_BASED_SURFACE_MODEL" => {
            let list = root.require_list(1, "shells")?.to_vec();
            for shell in list.iter().filter_map(AttributeValue::as_entity_ref) {
                shells.push(unwrap_shell(shell, false, decoder)?);
            }
        }
        other => {
            return Err(Error::geometry(format!("#{} is not a shape root ({})", root_id, other)));
        }
    }

    Ok(shells)
}

/// Follow `ORIENTED_*_SHELL('', *, shell_element, orientation)` wrappers
fn unwrap_shell(shell_id: u32, reversed: bool, decoder: &mut EntityDecoder) -> Result<(u32, bool)> {
    let shell = decoder.decode_by_id(shell_id)?;
    if shell.is_a("ORIENTED_CLOSED_SHELL") || shell.is_a("ORIENTED_OPEN_SHELL") {
        let inner = shell.require_ref(2, "shell element")?;
        let flip = !shell.get_bool(3).unwrap_or(true);
        return unwrap_shell(inner, reversed ^ flip, decoder);
    }
    Ok((shell_id, reversed))
}

/// `MAPPED_ITEM('', REPRESENTATION_MAP(origin, rep), target)`
fn mapped_item(item: &DecodedEntity, decoder: &mut EntityDecoder) -> Result<(u32, Matrix4<f64>)> {
    let map = decoder.decode_by_id(item.require_ref(1, "mapping source")?)?;
    let origin = map.require_ref(0, "mapping origin")?;
    let child = map.require_ref(1, "mapped representation")?;
    let target = item.require_ref(2, "mapping target")?;
    Ok((child, relative_placement(origin, target, decoder)?))
}

/// (rep_1, rep_2, transformation operator) of a simple or complex relationship
fn relationship_ends(rel: &DecodedEntity) -> Option<(u32, u32, Option<u32>)> {
    if rel.is_complex() {
        let base = rel.partial("REPRESENTATION_RELATIONSHIP")?;
        let operator = rel
            .partial("REPRESENTATION_RELATIONSHIP_WITH_TRANSFORMATION")
            .and_then(|p| p.get(0))
            .and_then(AttributeValue::as_entity_ref);
        let rep_1 = base.get(2)?.as_entity_ref()?;
        let rep_2 = base.get(3)?.as_entity_ref()?;
        return Some((rep_1, rep_2, operator));
    }
    // ('', '', rep_1, rep_2[, transformation])
    Some((rel.get_ref(2)?, rel.get_ref(3)?, rel.get_ref(4)))
}

/// `ITEM_DEFINED_TRANSFORMATION('', '', item_1, item_2)` maps item_1 onto item_2
fn transformation(operator_id: u32, decoder: &mut EntityDecoder) -> Result<Matrix4<f64>> {
    let operator = decoder.decode_by_id(operator_id)?;
    if !operator.is_a("ITEM_DEFINED_TRANSFORMATION") {
        warn!(
            operator = operator_id,
            kind = %operator.type_name,
            "unsupported transformation operator, using identity"
        );
        return Ok(Matrix4::identity());
    }
    let from = operator.require_ref(2, "transform item 1")?;
    let to = operator.require_ref(3, "transform item 2")?;
    relative_placement(from, to, decoder)
}

/// Transform taking the `from` frame onto the `to` frame
fn relative_placement(from: u32, to: u32, decoder: &mut EntityDecoder) -> Result<Matrix4<f64>> {
    let from = parse_axis2_placement_3d_from_id(from, decoder)?;
    let to = parse_axis2_placement_3d_from_id(to, decoder)?;
    let inverse = from
        .try_inverse()
        .ok_or_else(|| Error::geometry("singular placement frame".to_string()))?;
    Ok(to * inverse)
}

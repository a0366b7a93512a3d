//! Geometry passes over entities containers
//!
//! These run over one container at a time: the member PIDs go in, and the
//! PIDs of destroyed elements come out, so the caller can update container
//! membership. None of the passes change ownership of surviving entities.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use tracing::debug;

use crate::entities::{EntityType, Face};
use crate::entities::face::same_point;
use crate::notification::{NotificationCollection, NotificationType};
use crate::registry::EntityRegistry;
use crate::types::{PersistentId, Point3, Vector3, ANGLE_TOLERANCE, LENGTH_TOLERANCE};

/// Vertex position snapped to the length tolerance
type VertexKey = (i64, i64, i64);

fn vertex_key(p: &Point3) -> VertexKey {
    (
        (p.x / LENGTH_TOLERANCE).round() as i64,
        (p.y / LENGTH_TOLERANCE).round() as i64,
        (p.z / LENGTH_TOLERANCE).round() as i64,
    )
}

/// Undirected segment key with its endpoints in sorted order
fn segment_key(a: &Point3, b: &Point3) -> (VertexKey, VertexKey) {
    let (ka, kb) = (vertex_key(a), vertex_key(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

/// Directed segments of every loop of a face
fn face_segments(face: &Face) -> Vec<(Point3, Point3)> {
    std::iter::once(&face.outer_loop)
        .chain(face.inner_loops.iter())
        .flat_map(|l| {
            let n = l.len();
            (0..n).map(move |i| (l[i], l[(i + 1) % n]))
        })
        .collect()
}

fn faces_in(registry: &EntityRegistry, members: &[PersistentId]) -> Vec<PersistentId> {
    members
        .iter()
        .copied()
        .filter(|pid| registry.get(*pid).and_then(EntityType::as_face).is_some())
        .collect()
}

// ============================================================================
// Coplanar face merging
// ============================================================================

/// Faces may only merge when they look the same
fn same_appearance(a: &Face, b: &Face) -> bool {
    a.drawing == b.drawing && a.back_material == b.back_material
}

fn coplanar(a: &(Vector3, f64), b: &(Vector3, f64)) -> bool {
    a.0.dot(&b.0) >= 1.0 - ANGLE_TOLERANCE && (a.1 - b.1).abs() <= LENGTH_TOLERANCE
}

/// Find a segment `p -> q` of `a` that `b` runs as `q -> p`.
///
/// Returns the index of `p` in `a` and of `q` in `b`.
fn shared_segment(a: &[Point3], b: &[Point3]) -> Option<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    for i in 0..n {
        let (p, q) = (&a[i], &a[(i + 1) % n]);
        for k in 0..m {
            if same_point(&b[k], q) && same_point(&b[(k + 1) % m], p) {
                return Some((i, k));
            }
        }
    }
    None
}

/// Join two loops across the shared segment found by [`shared_segment`]
fn join_loops(a: &[Point3], b: &[Point3], i: usize, k: usize) -> Vec<Point3> {
    let (n, m) = (a.len(), b.len());
    // a from q around to p, then b strictly between p and q
    let mut merged: Vec<Point3> = (1..=n).map(|s| a[(i + s) % n]).collect();
    merged.extend((2..m).map(|s| b[(k + s) % m]));
    remove_spikes(&mut merged);
    merged
}

/// Drop back-and-forth excursions `x, y, x` left behind by a join
fn remove_spikes(points: &mut Vec<Point3>) {
    let mut changed = true;
    while changed && points.len() >= 3 {
        changed = false;
        let n = points.len();
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            if same_point(&prev, &next) {
                // Remove the tip and one copy of the repeated vertex
                let (hi, lo) = if (i + 1) % n > i { ((i + 1) % n, i) } else { (i, (i + 1) % n) };
                points.remove(hi);
                points.remove(lo);
                changed = true;
                break;
            }
        }
    }
}

fn is_simple_loop(points: &[Point3]) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut seen = AHashSet::with_capacity(points.len());
    points.iter().all(|p| seen.insert(vertex_key(p)))
}

/// Merge adjacent coplanar faces of one container until nothing changes.
///
/// Faces with holes are left alone. The edges along a merged seam are
/// destroyed with the absorbed face. Returns the destroyed PIDs.
pub fn merge_coplanar_faces(
    registry: &mut EntityRegistry,
    members: &[PersistentId],
) -> Vec<PersistentId> {
    use rayon::prelude::*;

    let mut faces = faces_in(registry, members);
    let planes: AHashMap<PersistentId, (Vector3, f64)> = {
        let shared: &EntityRegistry = registry;
        let computed: Vec<(PersistentId, (Vector3, f64))> = faces
            .par_iter()
            .filter_map(|pid| {
                let face = shared.get(*pid)?.as_face()?;
                if !face.inner_loops.is_empty() {
                    return None;
                }
                face.plane().map(|plane| (*pid, plane))
            })
            .collect();
        computed.into_iter().collect()
    };
    faces.retain(|pid| planes.contains_key(pid));

    let mut removed = Vec::new();
    let mut rejected: AHashSet<(PersistentId, PersistentId)> = AHashSet::new();
    loop {
        let Some((keep, absorb, merged, seam)) = find_merge(registry, &faces, &planes, &mut rejected)
        else {
            break;
        };

        if let Some(face) = registry.get_mut(keep).and_then(EntityType::as_face_mut) {
            face.outer_loop = merged;
        }
        registry.destroy(absorb);
        faces.retain(|pid| *pid != absorb);
        removed.push(absorb);

        // Edges along the seam no longer bound anything
        let seam_edges: Vec<PersistentId> = members
            .iter()
            .copied()
            .filter(|pid| !removed.contains(pid))
            .filter(|pid| {
                registry.get(*pid).and_then(EntityType::as_edge).is_some_and(|e| {
                    seam.contains(&segment_key(&e.start, &e.end))
                })
            })
            .collect();
        for pid in seam_edges {
            registry.destroy(pid);
            removed.push(pid);
        }
    }

    if !removed.is_empty() {
        debug!(removed = removed.len(), "merged coplanar faces");
    }
    removed
}

type MergePlan = (PersistentId, PersistentId, Vec<Point3>, AHashSet<(VertexKey, VertexKey)>);

fn find_merge(
    registry: &EntityRegistry,
    faces: &[PersistentId],
    planes: &AHashMap<PersistentId, (Vector3, f64)>,
    rejected: &mut AHashSet<(PersistentId, PersistentId)>,
) -> Option<MergePlan> {
    for (x, &a_pid) in faces.iter().enumerate() {
        for &b_pid in &faces[x + 1..] {
            if rejected.contains(&(a_pid, b_pid)) {
                continue;
            }
            let (Some(pa), Some(pb)) = (planes.get(&a_pid), planes.get(&b_pid)) else {
                continue;
            };
            if !coplanar(pa, pb) {
                continue;
            }
            let (Some(a), Some(b)) = (
                registry.get(a_pid).and_then(EntityType::as_face),
                registry.get(b_pid).and_then(EntityType::as_face),
            ) else {
                continue;
            };
            if !same_appearance(a, b) {
                continue;
            }
            let Some((i, k)) = shared_segment(&a.outer_loop, &b.outer_loop) else {
                continue;
            };

            let merged = join_loops(&a.outer_loop, &b.outer_loop, i, k);
            if !is_simple_loop(&merged) {
                rejected.insert((a_pid, b_pid));
                continue;
            }

            // Segments of either face that the merged loop no longer uses
            let kept: AHashSet<_> = segments_of(&merged).collect();
            let seam = segments_of(&a.outer_loop)
                .chain(segments_of(&b.outer_loop))
                .filter(|s| !kept.contains(s))
                .collect();
            return Some((a_pid, b_pid, merged, seam));
        }
    }
    None
}

fn segments_of(points: &[Point3]) -> impl Iterator<Item = (VertexKey, VertexKey)> + '_ {
    let n = points.len();
    (0..n).map(move |i| segment_key(&points[i], &points[(i + 1) % n]))
}

// ============================================================================
// Consistent orientation
// ============================================================================

/// Flip faces of one container so that neighbors agree on their front side.
///
/// Each connected patch is walked breadth-first from its lowest-PID face,
/// which keeps its orientation. A neighbor that runs a shared segment in the
/// same direction as the face it was reached from gets reversed. Returns the
/// number of faces flipped.
pub fn orient_faces_consistently(registry: &mut EntityRegistry, members: &[PersistentId]) -> usize {
    let mut faces = faces_in(registry, members);
    faces.sort();

    // Directed segments per face, in the current winding
    let mut loops: Vec<Vec<(Point3, Point3)>> = faces
        .iter()
        .map(|pid| {
            registry
                .get(*pid)
                .and_then(EntityType::as_face)
                .map(face_segments)
                .unwrap_or_default()
        })
        .collect();

    let mut adjacency: AHashMap<(VertexKey, VertexKey), Vec<usize>> = AHashMap::new();
    for (index, segments) in loops.iter().enumerate() {
        for (a, b) in segments {
            adjacency.entry(segment_key(a, b)).or_default().push(index);
        }
    }

    let mut visited = vec![false; faces.len()];
    let mut flipped = vec![false; faces.len()];
    for seed in 0..faces.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut queue = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            let segments = loops[current].clone();
            for (a, b) in &segments {
                let Some(neighbors) = adjacency.get(&segment_key(a, b)) else {
                    continue;
                };
                for &n in neighbors {
                    if n == current || visited[n] {
                        continue;
                    }
                    visited[n] = true;
                    let same_direction = loops[n]
                        .iter()
                        .any(|(c, d)| same_point(a, c) && same_point(b, d));
                    if same_direction {
                        flipped[n] = true;
                        loops[n] = loops[n].iter().rev().map(|(c, d)| (*d, *c)).collect();
                    }
                    queue.push_back(n);
                }
            }
        }
    }

    let mut count = 0;
    for (index, pid) in faces.iter().enumerate() {
        if !flipped[index] {
            continue;
        }
        if let Some(face) = registry.get_mut(*pid).and_then(EntityType::as_face_mut) {
            face.reverse();
            count += 1;
        }
    }
    if count > 0 {
        debug!(flipped = count, "oriented faces");
    }
    count
}

// ============================================================================
// Repair
// ============================================================================

/// What a repair pass may redirect references to
pub struct RepairContext<'a> {
    pub default_layer: PersistentId,
    pub layers: &'a AHashSet<PersistentId>,
    pub materials: &'a AHashSet<PersistentId>,
}

/// Repair one container: drop degenerate edges and faces, clean duplicate
/// vertices, redirect dangling layer references to the default layer, clear
/// dangling material references, and drop instances whose definition is
/// gone. Every repair is recorded in `notes`. Returns the PIDs that left the
/// container.
pub fn fix_errors(
    registry: &mut EntityRegistry,
    members: &[PersistentId],
    ctx: &RepairContext<'_>,
    notes: &mut NotificationCollection,
) -> Vec<PersistentId> {
    let mut removed = Vec::new();
    for &pid in members {
        let Some(entity) = registry.get(pid) else {
            notes.notify(
                NotificationType::Warning,
                format!("dropped dangling container member {pid}"),
            );
            removed.push(pid);
            continue;
        };

        let doomed = match entity {
            EntityType::Edge(e) => e.is_degenerate().then_some("degenerate edge"),
            EntityType::ComponentInstance(i) | EntityType::Group(i) => registry
                .get(i.definition)
                .and_then(EntityType::as_definition)
                .is_none()
                .then_some("instance of a missing definition"),
            EntityType::Image(i) => registry
                .get(i.definition)
                .and_then(EntityType::as_definition)
                .is_none()
                .then_some("image of a missing definition"),
            _ => None,
        };
        if let Some(reason) = doomed {
            notes.notify(NotificationType::Warning, format!("removed {reason} {pid}"));
            crate::collections::destroy_tree(registry, pid);
            removed.push(pid);
            continue;
        }

        let Some(entity) = registry.get_mut(pid) else {
            continue;
        };
        if let Some(face) = entity.as_face_mut() {
            if face.dedup_vertices() {
                notes.notify(
                    NotificationType::Warning,
                    format!("removed duplicate vertices of face {pid}"),
                );
            }
            if face.is_degenerate() {
                notes.notify(NotificationType::Warning, format!("removed degenerate face {pid}"));
                registry.destroy(pid);
                removed.push(pid);
                continue;
            }
        }

        if let Some(drawing) = entity.drawing_mut() {
            if !ctx.layers.contains(&drawing.layer) {
                notes.notify(
                    NotificationType::Warning,
                    format!("moved {pid} from missing layer {} to the default layer", drawing.layer),
                );
                drawing.layer = ctx.default_layer;
            }
            if let Some(m) = drawing.material.filter(|m| !ctx.materials.contains(m)) {
                notes.notify(
                    NotificationType::Warning,
                    format!("cleared missing material {m} on {pid}"),
                );
                drawing.material = None;
            }
        }
        if let Some(face) = entity.as_face_mut() {
            if let Some(m) = face.back_material.filter(|m| !ctx.materials.contains(m)) {
                notes.notify(
                    NotificationType::Warning,
                    format!("cleared missing back material {m} on {pid}"),
                );
                face.back_material = None;
            }
        }
    }
    removed
}

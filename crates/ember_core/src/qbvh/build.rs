//! QBVH construction.
//!
//! Top-down build over (box, centroid, external index) triples. Each
//! node splits its set at the centroid median of the longest
//! centroid-extent axis, then splits both halves the same way to get
//! four children; the three axes are recorded for traversal ordering.
//! The caller's index array is permuted so every leaf reference covers
//! a contiguous range of it.

use ember_math::{Aabb, Vec3};

use super::{leaf, Node, MAX_LEAF_COUNT};

/// Build a node array over the given primitive bounds.
///
/// `boxes`, `centroids` and `indices` run parallel; `indices` is
/// permuted in place to match the leaf layout. Returns the node array
/// and the bounds of everything. An empty input yields an empty node
/// array and an empty box.
pub fn build_accel(
    boxes: &[Aabb],
    centroids: &[Vec3],
    indices: &mut [i32],
    leaf_target: usize,
) -> (Vec<Node>, Aabb) {
    assert_eq!(boxes.len(), centroids.len());
    assert_eq!(boxes.len(), indices.len());
    assert!(leaf_target >= 1 && leaf_target <= MAX_LEAF_COUNT);

    let mut bounds = Aabb::EMPTY;
    for b in boxes {
        bounds.grow_box(b);
    }

    let n = boxes.len();
    let mut nodes = Vec::new();
    if n == 0 {
        return (nodes, bounds);
    }

    let mut perm: Vec<u32> = (0..n as u32).collect();
    let mut builder = Builder {
        boxes,
        centroids,
        nodes: &mut nodes,
        leaf_target,
    };

    if n <= leaf_target {
        // Degenerate tree: one root whose first child is the only leaf.
        let mut root = Node::default();
        root.set_child_bounds(0, &bounds);
        root.children[0] = leaf(0, n as u32);
        builder.nodes.push(root);
    } else {
        builder.build_node(&mut perm, 0);
    }

    let permuted: Vec<i32> = perm.iter().map(|&p| indices[p as usize]).collect();
    indices.copy_from_slice(&permuted);

    log::debug!("qbvh: {} primitives, {} nodes", n, nodes.len());

    (nodes, bounds)
}

struct Builder<'a> {
    boxes: &'a [Aabb],
    centroids: &'a [Vec3],
    nodes: &'a mut Vec<Node>,
    leaf_target: usize,
}

impl Builder<'_> {
    /// Build an inner node over `perm` (which must be larger than the
    /// leaf target); `offset` is the slice's position in the final
    /// permuted array. Returns the node's index.
    fn build_node(&mut self, perm: &mut [u32], offset: u32) -> usize {
        let axis0 = self.centroid_bounds(perm).max_dim();
        self.sort_by_axis(perm, axis0);
        let mid = perm.len() / 2;
        let (lo, hi) = perm.split_at_mut(mid);

        let axis1 = self.centroid_bounds(lo).max_dim();
        let axis2 = self.centroid_bounds(hi).max_dim();

        let idx = self.nodes.len();
        self.nodes.push(Node::default());

        // Lower half in lanes 0/1, upper half in lanes 2/3. A half that
        // already fits a leaf occupies its first lane and leaves the
        // sibling lane empty.
        let (lo_refs, lo_boxes) = self.build_half(lo, offset, axis1);
        let (hi_refs, hi_boxes) = self.build_half(hi, offset + mid as u32, axis2);
        let refs = [lo_refs[0], lo_refs[1], hi_refs[0], hi_refs[1]];
        let child_boxes = [lo_boxes[0], lo_boxes[1], hi_boxes[0], hi_boxes[1]];

        let node = &mut self.nodes[idx];
        for k in 0..4 {
            node.children[k] = refs[k];
            if refs[k] != -1 {
                node.set_child_bounds(k, &child_boxes[k]);
            }
        }
        node.axis0 = axis0 as u8;
        node.axis1 = axis1 as u8;
        node.axis2 = axis2 as u8;

        idx
    }

    fn geom_bounds(&self, perm: &[u32]) -> Aabb {
        let mut b = Aabb::EMPTY;
        for &p in perm {
            b.grow_box(&self.boxes[p as usize]);
        }
        b
    }

    fn centroid_bounds(&self, perm: &[u32]) -> Aabb {
        let mut b = Aabb::EMPTY;
        for &p in perm {
            b.grow(self.centroids[p as usize]);
        }
        b
    }

    /// Deterministic centroid sort: ties broken by primitive order.
    fn sort_by_axis(&self, perm: &mut [u32], axis: usize) {
        let centroids = self.centroids;
        perm.sort_unstable_by(|&a, &b| {
            let ca = centroids[a as usize][axis];
            let cb = centroids[b as usize][axis];
            ca.partial_cmp(&cb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
    }
}

impl Builder<'_> {
    fn build_half(&mut self, half: &mut [u32], offset: u32, axis: usize) -> ([i32; 2], [Aabb; 2]) {
        if half.len() <= self.leaf_target {
            return (
                [leaf(offset, half.len() as u32), -1],
                [self.geom_bounds(half), Aabb::EMPTY],
            );
        }

        self.sort_by_axis(half, axis);
        let mid = half.len() / 2;
        let (q0, q1) = half.split_at_mut(mid);

        let b0 = self.geom_bounds(q0);
        let r0 = self.child_ref(q0, offset);
        let b1 = self.geom_bounds(q1);
        let r1 = self.child_ref(q1, offset + mid as u32);
        ([r0, r1], [b0, b1])
    }

    fn child_ref(&mut self, perm: &mut [u32], offset: u32) -> i32 {
        if perm.len() <= self.leaf_target {
            leaf(offset, perm.len() as u32)
        } else {
            self.build_node(perm, offset) as i32
        }
    }
}

/// Clip a convex polygon against the halfspace `v[axis] <= d`.
pub fn clip_left(d: f32, axis: usize, verts: &[Vec3]) -> Vec<Vec3> {
    clip(d, axis, verts, true)
}

/// Clip a convex polygon against the halfspace `v[axis] >= d`.
pub fn clip_right(d: f32, axis: usize, verts: &[Vec3]) -> Vec<Vec3> {
    clip(d, axis, verts, false)
}

fn clip(d: f32, axis: usize, verts: &[Vec3], keep_left: bool) -> Vec<Vec3> {
    let inside = |v: Vec3| {
        if keep_left {
            v[axis] <= d
        } else {
            v[axis] >= d
        }
    };

    let mut out = Vec::with_capacity(verts.len() + 1);
    for i in 0..verts.len() {
        let a = verts[i];
        let b = verts[(i + 1) % verts.len()];
        let a_in = inside(a);
        if a_in {
            out.push(a);
        }
        if a_in != inside(b) {
            let t = (d - a[axis]) / (b[axis] - a[axis]);
            out.push(a + (b - a) * t);
        }
    }
    out
}

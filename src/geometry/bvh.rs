// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) for spatial acceleration
//!
//! The tree is stored in three flat arrays. Leaves are the objects themselves
//! at node indices `[0, N)`; internal nodes occupy `[N, 2N - 1)` and keep
//! their child pairs at `children[index - N]`. A tree over `N >= 1` objects
//! therefore has exactly `2N - 1` bounding volumes.

use super::BoundingBox;

/// Read-only view of a bounding volume hierarchy
pub trait Bvh {
    type Object;

    /// Index of the root node, `None` for an empty tree
    fn root_index(&self) -> Option<usize>;

    fn is_object(&self, index: usize) -> bool;

    fn object(&self, index: usize) -> &Self::Object;

    fn volume(&self, index: usize) -> &BoundingBox;

    /// Child node indices of an internal node
    fn children(&self, index: usize) -> Option<[usize; 2]>;

    /// Lazily yield every object whose enclosing volumes all satisfy
    /// `volume_pred` and which itself satisfies `object_pred`.
    ///
    /// Traversal is depth-first with its own stack, so concurrent queries
    /// never share state. Results come in stack order, not spatial order.
    fn find_all_if<V, O>(&self, volume_pred: V, object_pred: O) -> FindAllIf<'_, Self, V, O>
    where
        Self: Sized,
        V: FnMut(&BoundingBox) -> bool,
        O: FnMut(&Self::Object) -> bool,
    {
        FindAllIf {
            tree: self,
            stack: self.root_index().into_iter().collect(),
            volume_pred,
            object_pred,
        }
    }
}

/// Iterator returned by [`Bvh::find_all_if`]
pub struct FindAllIf<'a, B, V, O> {
    tree: &'a B,
    stack: Vec<usize>,
    volume_pred: V,
    object_pred: O,
}

impl<'a, B, V, O> Iterator for FindAllIf<'a, B, V, O>
where
    B: Bvh,
    V: FnMut(&BoundingBox) -> bool,
    O: FnMut(&B::Object) -> bool,
{
    type Item = &'a B::Object;

    fn next(&mut self) -> Option<Self::Item> {
        let tree: &'a B = self.tree;
        while let Some(index) = self.stack.pop() {
            if !(self.volume_pred)(tree.volume(index)) {
                continue;
            }
            if tree.is_object(index) {
                let object = tree.object(index);
                if (self.object_pred)(object) {
                    return Some(object);
                }
            } else if let Some(children) = tree.children(index) {
                self.stack.extend_from_slice(&children);
            }
        }
        None
    }
}

/// Flat-array BVH over arbitrary objects, split round-robin by axis at the
/// median bounding-box center
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialIndex<T> {
    objects: Vec<T>,
    volumes: Vec<BoundingBox>,
    children: Vec<[usize; 2]>,
    root: Option<usize>,
}

impl<T> SpatialIndex<T> {
    /// Empty tree
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            volumes: Vec::new(),
            children: Vec::new(),
            root: None,
        }
    }

    /// Build a tree over `objects`, bounding each with `bbox_fn`
    pub fn build<F>(objects: Vec<T>, bbox_fn: F) -> Self
    where
        F: Fn(&T) -> BoundingBox,
    {
        let n = objects.len();
        if n == 0 {
            return Self::new();
        }

        let boxes: Vec<BoundingBox> = objects.iter().map(&bbox_fn).collect();
        let mut order: Vec<usize> = (0..n).collect();

        let mut builder = Builder {
            boxes: &boxes,
            order: &mut order,
            volumes: vec![BoundingBox::empty(); 2 * n - 1],
            children: Vec::with_capacity(n - 1),
            leaf_count: n,
        };
        let root = builder.build_node(0, n, 0);
        let Builder {
            volumes, children, ..
        } = builder;

        // Reorder objects into leaf order
        let mut slots: Vec<Option<T>> = objects.into_iter().map(Some).collect();
        let objects: Vec<T> = order
            .iter()
            .filter_map(|&source| slots[source].take())
            .collect();

        debug_assert_eq!(volumes.len(), 2 * n - 1, "node count mismatch");
        debug_assert_eq!(children.len(), n - 1, "internal node count mismatch");

        Self {
            objects,
            volumes,
            children,
            root: Some(root),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Total number of nodes, leaves included
    pub fn node_count(&self) -> usize {
        self.volumes.len()
    }

    /// Objects in leaf order
    pub fn objects(&self) -> &[T] {
        &self.objects
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack = vec![(root, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some([left, right]) = Bvh::children(self, index) {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bvh for SpatialIndex<T> {
    type Object = T;

    fn root_index(&self) -> Option<usize> {
        self.root
    }

    fn is_object(&self, index: usize) -> bool {
        index < self.objects.len()
    }

    fn object(&self, index: usize) -> &T {
        &self.objects[index]
    }

    fn volume(&self, index: usize) -> &BoundingBox {
        &self.volumes[index]
    }

    fn children(&self, index: usize) -> Option<[usize; 2]> {
        index
            .checked_sub(self.objects.len())
            .and_then(|internal| self.children.get(internal))
            .copied()
    }
}

struct Builder<'a> {
    boxes: &'a [BoundingBox],
    order: &'a mut [usize],
    volumes: Vec<BoundingBox>,
    children: Vec<[usize; 2]>,
    leaf_count: usize,
}

impl Builder<'_> {
    /// Build the subtree over leaf slots `[lo, hi)` and return its node index
    fn build_node(&mut self, lo: usize, hi: usize, depth: usize) -> usize {
        match hi - lo {
            1 => {
                self.volumes[lo] = self.boxes[self.order[lo]];
                lo
            }
            2 => {
                let left = self.build_node(lo, lo + 1, depth + 1);
                let right = self.build_node(lo + 1, hi, depth + 1);
                self.internal(left, right)
            }
            3 => {
                self.sort_range(lo, hi, depth % 3);
                let left = self.build_node(lo, lo + 1, depth + 1);
                let right = self.build_node(lo + 1, hi, depth + 1);
                self.internal(left, right)
            }
            len => {
                self.sort_range(lo, hi, depth % 3);
                let mid = lo + len / 2;
                let left = self.build_node(lo, mid, depth + 1);
                let right = self.build_node(mid, hi, depth + 1);
                self.internal(left, right)
            }
        }
    }

    fn sort_range(&mut self, lo: usize, hi: usize, axis: usize) {
        let boxes = self.boxes;
        self.order[lo..hi].sort_by(|&a, &b| {
            let ca = boxes[a].center()[axis];
            let cb = boxes[b].center()[axis];
            ca.total_cmp(&cb)
        });
    }

    fn internal(&mut self, left: usize, right: usize) -> usize {
        let index = self.leaf_count + self.children.len();
        self.children.push([left, right]);
        self.volumes[index] = self.volumes[left].union(&self.volumes[right]);
        index
    }
}

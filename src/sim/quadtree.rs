//! Quadtree broad phase
//!
//! Rebuilt from scratch every tick: objects are inserted, candidates are
//! retrieved, then the whole tree is cleared. There is no removal.
//!
//! Objects that straddle a quadrant boundary stay in the node where they stop
//! fitting, so every object is stored exactly once.

use super::geometry::Rect;
use crate::consts::{QUADTREE_MAX_LEVELS, QUADTREE_MAX_OBJECTS};

/// An object stored in the tree: its bounding rectangle plus a caller key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadItem {
    pub bounds: Rect,
    pub key: usize,
}

/// Child slots, in the order NE, NW, SW, SE
const NE: usize = 0;
const NW: usize = 1;
const SW: usize = 2;
const SE: usize = 3;

#[derive(Debug, Clone)]
pub struct QuadTree {
    boundary: Rect,
    level: u32,
    max_objects: usize,
    max_levels: u32,
    objects: Vec<QuadItem>,
    children: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
    /// Root node with the default split limits
    pub fn new(boundary: Rect) -> Self {
        Self::with_limits(boundary, QUADTREE_MAX_OBJECTS, QUADTREE_MAX_LEVELS)
    }

    pub fn with_limits(boundary: Rect, max_objects: usize, max_levels: u32) -> Self {
        Self::node(boundary, 0, max_objects, max_levels)
    }

    fn node(boundary: Rect, level: u32, max_objects: usize, max_levels: u32) -> Self {
        Self {
            boundary,
            level,
            max_objects,
            max_levels,
            objects: Vec::new(),
            children: None,
        }
    }

    pub fn boundary(&self) -> Rect {
        self.boundary
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Objects held directly by this node (not its descendants)
    pub fn objects(&self) -> &[QuadItem] {
        &self.objects
    }

    pub fn children(&self) -> Option<&[QuadTree; 4]> {
        self.children.as_deref()
    }

    /// Total objects in this subtree
    pub fn len(&self) -> usize {
        self.objects.len()
            + self
                .children
                .as_ref()
                .map_or(0, |c| c.iter().map(QuadTree::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest level reached in this subtree
    pub fn depth(&self) -> u32 {
        self.children
            .as_ref()
            .map_or(self.level, |c| c.iter().map(QuadTree::depth).max().unwrap_or(self.level))
    }

    /// Drop every object and child node
    pub fn clear(&mut self) {
        self.objects.clear();
        self.children = None;
    }

    pub fn insert(&mut self, item: QuadItem) {
        if let Some(children) = self.children.as_mut() {
            if let Some(index) = quadrant_index(&self.boundary, &item.bounds) {
                children[index].insert(item);
                return;
            }
            self.objects.push(item);
            return;
        }

        self.objects.push(item);

        if self.objects.len() > self.max_objects && self.level < self.max_levels {
            self.split();
            let held = std::mem::take(&mut self.objects);
            for item in held {
                match quadrant_index(&self.boundary, &item.bounds) {
                    Some(index) => {
                        if let Some(children) = self.children.as_mut() {
                            children[index].insert(item);
                        }
                    }
                    None => self.objects.push(item),
                }
            }
        }
    }

    /// Candidate superset for `bounds`: this node's own objects plus the
    /// matching child subtree, or every child subtree when `bounds` straddles
    /// a quadrant boundary. Narrow-phase tests are still required.
    pub fn retrieve(&self, bounds: &Rect) -> Vec<QuadItem> {
        let mut out = Vec::new();
        self.retrieve_into(bounds, &mut out);
        out
    }

    pub fn retrieve_into(&self, bounds: &Rect, out: &mut Vec<QuadItem>) {
        out.extend_from_slice(&self.objects);
        if let Some(children) = self.children.as_ref() {
            match quadrant_index(&self.boundary, bounds) {
                Some(index) => children[index].retrieve_into(bounds, out),
                None => {
                    for child in children.iter() {
                        child.retrieve_into(bounds, out);
                    }
                }
            }
        }
    }

    fn split(&mut self) {
        let half_w = self.boundary.width / 2.0;
        let half_h = self.boundary.height / 2.0;
        let x = self.boundary.x;
        let y = self.boundary.y;
        let level = self.level + 1;
        let make = |qx: f32, qy: f32| {
            QuadTree::node(
                Rect::new(qx, qy, half_w, half_h),
                level,
                self.max_objects,
                self.max_levels,
            )
        };

        let children = [
            make(x + half_w, y),
            make(x, y),
            make(x, y + half_h),
            make(x + half_w, y + half_h),
        ];
        self.children = Some(Box::new(children));
    }
}

/// Which single quadrant of `boundary` wholly contains `rect`, if any
fn quadrant_index(boundary: &Rect, rect: &Rect) -> Option<usize> {
    let mid_x = boundary.x + boundary.width / 2.0;
    let mid_y = boundary.y + boundary.height / 2.0;

    let top = rect.y < mid_y && rect.bottom() < mid_y;
    let bottom = rect.y > mid_y;
    let left = rect.x < mid_x && rect.right() < mid_x;
    let right = rect.x > mid_x;

    match (left, right, top, bottom) {
        (true, _, true, _) => Some(NW),
        (true, _, _, true) => Some(SW),
        (_, true, true, _) => Some(NE),
        (_, true, _, true) => Some(SE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(x: f32, y: f32, w: f32, h: f32, key: usize) -> QuadItem {
        QuadItem {
            bounds: Rect::new(x, y, w, h),
            key,
        }
    }

    fn keys(items: &[QuadItem]) -> Vec<usize> {
        let mut k: Vec<usize> = items.iter().map(|i| i.key).collect();
        k.sort_unstable();
        k
    }

    #[test]
    fn test_quadrant_index() {
        let b = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(quadrant_index(&b, &Rect::new(60.0, 10.0, 10.0, 10.0)), Some(NE));
        assert_eq!(quadrant_index(&b, &Rect::new(10.0, 10.0, 10.0, 10.0)), Some(NW));
        assert_eq!(quadrant_index(&b, &Rect::new(10.0, 60.0, 10.0, 10.0)), Some(SW));
        assert_eq!(quadrant_index(&b, &Rect::new(60.0, 60.0, 10.0, 10.0)), Some(SE));
        // Straddles the vertical midline
        assert_eq!(quadrant_index(&b, &Rect::new(45.0, 10.0, 10.0, 10.0)), None);
    }

    #[test]
    fn test_no_split_at_capacity() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        for i in 0..QUADTREE_MAX_OBJECTS {
            tree.insert(item(i as f32, 1.0, 1.0, 1.0, i));
        }
        assert!(tree.children().is_none());
        assert_eq!(tree.objects().len(), QUADTREE_MAX_OBJECTS);
    }

    #[test]
    fn test_split_redistributes_and_keeps_stragglers() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        for i in 0..10 {
            tree.insert(item(5.0 + i as f32 * 3.0, 5.0, 2.0, 2.0, i));
        }
        // Straddles all four quadrants
        tree.insert(item(45.0, 45.0, 10.0, 10.0, 99));

        let children = tree.children().expect("split after exceeding capacity");
        assert_eq!(keys(tree.objects()), vec![99]);
        assert_eq!(children[NW].objects().len(), 10);
        assert_eq!(tree.len(), 11);
    }

    #[test]
    fn test_depth_is_capped() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 1024.0, 1024.0));
        // Tiny objects piled into one corner keep forcing splits
        for i in 0..200 {
            tree.insert(item(0.1 + (i % 10) as f32 * 0.01, 0.1, 0.001, 0.001, i));
        }
        assert_eq!(tree.depth(), QUADTREE_MAX_LEVELS);
        assert_eq!(tree.len(), 200);
    }

    #[test]
    fn test_objects_outside_root_are_kept() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        tree.insert(item(-50.0, -50.0, 10.0, 10.0, 1));
        tree.insert(item(500.0, 500.0, 10.0, 10.0, 2));
        assert_eq!(tree.len(), 2);
        let found = tree.retrieve(&Rect::new(-50.0, -50.0, 10.0, 10.0));
        assert!(found.iter().any(|i| i.key == 1));
    }

    #[test]
    fn test_retrieve_straddling_query_sees_all_children() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let corners = [(10.0, 10.0), (80.0, 10.0), (10.0, 80.0), (80.0, 80.0)];
        let mut key = 0;
        for &(x, y) in &corners {
            for _ in 0..3 {
                tree.insert(item(x, y, 2.0, 2.0, key));
                key += 1;
            }
        }
        assert!(tree.children().is_some());

        let all = tree.retrieve(&Rect::new(40.0, 40.0, 20.0, 20.0));
        assert_eq!(all.len(), 12);

        let nw_only = tree.retrieve(&Rect::new(5.0, 5.0, 2.0, 2.0));
        assert_eq!(keys(&nw_only), vec![0, 1, 2]);
    }

    #[test]
    fn test_isolated_objects_retrieve_themselves() {
        let mut tree = QuadTree::with_limits(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 5);
        let spots = [
            item(10.0, 10.0, 2.0, 2.0, 0),
            item(80.0, 10.0, 2.0, 2.0, 1),
            item(10.0, 80.0, 2.0, 2.0, 2),
            item(80.0, 80.0, 2.0, 2.0, 3),
        ];
        for s in spots {
            tree.insert(s);
        }
        for s in spots {
            assert_eq!(keys(&tree.retrieve(&s.bounds)), vec![s.key]);
        }
    }

    #[test]
    fn test_clear() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        for i in 0..30 {
            tree.insert(item(i as f32 * 3.0, 20.0, 1.0, 1.0, i));
        }
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.children().is_none());
    }

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (0.0f32..400.0, 0.0f32..400.0, 0.5f32..40.0, 0.5f32..40.0)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_retrieve_has_no_false_negatives(
            rects in proptest::collection::vec(arb_rect(), 1..120),
            query in arb_rect(),
        ) {
            let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 400.0, 400.0));
            for (key, bounds) in rects.iter().enumerate() {
                tree.insert(QuadItem { bounds: *bounds, key });
            }
            prop_assert_eq!(tree.len(), rects.len());

            let found = keys(&tree.retrieve(&query));
            for (key, bounds) in rects.iter().enumerate() {
                if bounds.intersects(&query) {
                    prop_assert!(found.binary_search(&key).is_ok());
                }
            }
        }
    }
}

//! Narrow-phase shape tests and the per-tick collision resolver
//!
//! Pure geometry: the resolver reports which bodies overlap and by how much.
//! What a hit means (damage, score, sound) is decided by the caller.

use std::collections::HashSet;

use glam::Vec2;

use super::geometry::{Collider, Rect};
use super::quadtree::{QuadItem, QuadTree};

/// Outcome of a single shape-pair test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Overlap vector (meaning depends on the shape pair, see the test functions)
    pub overlap: Vec2,
}

impl Contact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            overlap: Vec2::ZERO,
        }
    }

    fn hit(overlap: Vec2) -> Self {
        Self { hit: true, overlap }
    }
}

/// Circle vs circle. Touching circles (`distance == r1 + r2`) do not collide.
///
/// The overlap points from A toward B with magnitude `r1 + r2 - distance`.
/// Coincident centers have no separating direction and report a zero vector.
pub fn circle_circle(a: Vec2, ra: f32, b: Vec2, rb: f32) -> Contact {
    let delta = b - a;
    let sum = ra + rb;
    let dist_sq = delta.length_squared();
    if dist_sq >= sum * sum {
        return Contact::miss();
    }

    let dist = dist_sq.sqrt();
    if dist == 0.0 {
        return Contact::hit(Vec2::ZERO);
    }
    Contact::hit(delta / dist * (sum - dist))
}

/// Circle vs axis-aligned rectangle via the clamped closest point.
///
/// The overlap is `center - closest_point`.
pub fn circle_rect(center: Vec2, radius: f32, rect: &Rect) -> Contact {
    let closest = Vec2::new(
        center.x.clamp(rect.x, rect.right()),
        center.y.clamp(rect.y, rect.bottom()),
    );
    let offset = center - closest;
    if offset.length_squared() < radius * radius {
        Contact::hit(offset)
    } else {
        Contact::miss()
    }
}

/// Rectangle vs rectangle (AABB).
///
/// The overlap is the minimum translation distance along each axis.
pub fn rect_rect(a: &Rect, b: &Rect) -> Contact {
    let separated = a.right() <= b.x || b.right() <= a.x || a.bottom() <= b.y || b.bottom() <= a.y;
    if separated {
        return Contact::miss();
    }
    Contact::hit(Vec2::new(
        (a.right() - b.x).min(b.right() - a.x),
        (a.bottom() - b.y).min(b.bottom() - a.y),
    ))
}

/// Dispatch on the shape pair. Argument order only affects the overlap
/// direction, never whether a hit is reported.
pub fn collide(a: &Collider, b: &Collider) -> Contact {
    match (a, b) {
        (
            Collider::Circle {
                center: ca,
                radius: ra,
            },
            Collider::Circle {
                center: cb,
                radius: rb,
            },
        ) => circle_circle(*ca, *ra, *cb, *rb),
        (Collider::Circle { center, radius }, Collider::Rect(rect)) => {
            circle_rect(*center, *radius, rect)
        }
        (Collider::Rect(rect), Collider::Circle { center, radius }) => {
            let contact = circle_rect(*center, *radius, rect);
            Contact {
                overlap: -contact.overlap,
                ..contact
            }
        }
        (Collider::Rect(ra), Collider::Rect(rb)) => rect_rect(ra, rb),
    }
}

/// Read-only snapshot of something that can collide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body<K> {
    pub key: K,
    pub collider: Collider,
    /// Inactive bodies never collide
    pub active: bool,
}

/// A confirmed overlap between two bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult<K> {
    pub a: K,
    pub b: K,
    pub overlap: Vec2,
}

/// Broad phase (quadtree) plus narrow phase over a set of bodies.
///
/// Owns its quadtree so the node allocations can be reused, but the tree is
/// cleared and rebuilt on every `update`.
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    tree: QuadTree,
    candidates: Vec<QuadItem>,
    tested: HashSet<(usize, usize)>,
}

impl CollisionResolver {
    pub fn new(bounds: Rect) -> Self {
        Self {
            tree: QuadTree::new(bounds),
            candidates: Vec::new(),
            tested: HashSet::new(),
        }
    }

    /// The tree built by the most recent `update`
    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    /// Find every overlapping pair. Each unordered pair is tested at most
    /// once; results follow body order, so identical input gives identical
    /// output.
    pub fn update<K: Copy>(&mut self, bodies: &[Body<K>]) -> Vec<CollisionResult<K>> {
        self.tree.clear();
        self.tested.clear();

        for (index, body) in bodies.iter().enumerate() {
            if body.active {
                self.tree.insert(QuadItem {
                    bounds: body.collider.bounds(),
                    key: index,
                });
            }
        }

        let mut results = Vec::new();
        for (i, body) in bodies.iter().enumerate() {
            if !body.active {
                continue;
            }
            self.candidates.clear();
            self.tree
                .retrieve_into(&body.collider.bounds(), &mut self.candidates);

            for candidate in &self.candidates {
                let j = candidate.key;
                if j == i {
                    continue;
                }
                let pair = (i.min(j), i.max(j));
                if !self.tested.insert(pair) {
                    continue;
                }

                let (first, second) = (&bodies[pair.0], &bodies[pair.1]);
                let contact = collide(&first.collider, &second.collider);
                if contact.hit {
                    results.push(CollisionResult {
                        a: first.key,
                        b: second.key,
                        overlap: contact.overlap,
                    });
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn circle(x: f32, y: f32, r: f32) -> Collider {
        Collider::Circle {
            center: Vec2::new(x, y),
            radius: r,
        }
    }

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Collider {
        Collider::Rect(Rect::new(x, y, w, h))
    }

    fn body(key: u32, collider: Collider) -> Body<u32> {
        Body {
            key,
            collider,
            active: true,
        }
    }

    #[test]
    fn test_circle_circle_overlap_direction() {
        let c = circle_circle(Vec2::ZERO, 5.0, Vec2::new(8.0, 0.0), 5.0);
        assert!(c.hit);
        assert!((c.overlap - Vec2::new(2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_circle_circle_touching_is_miss() {
        let c = circle_circle(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0);
        assert!(!c.hit);
        let c = circle_circle(Vec2::ZERO, 3.0, Vec2::new(3.0, 4.0), 2.0);
        assert!(!c.hit);
    }

    #[test]
    fn test_circle_circle_coincident_centers() {
        let c = circle_circle(Vec2::new(4.0, 4.0), 2.0, Vec2::new(4.0, 4.0), 1.0);
        assert!(c.hit);
        assert_eq!(c.overlap, Vec2::ZERO);
    }

    #[test]
    fn test_circle_rect() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let c = circle_rect(Vec2::new(13.0, 5.0), 4.0, &r);
        assert!(c.hit);
        assert_eq!(c.overlap, Vec2::new(3.0, 0.0));

        assert!(!circle_rect(Vec2::new(14.0, 5.0), 4.0, &r).hit);
        // Center inside the rectangle: closest point is the center itself
        let inside = circle_rect(Vec2::new(5.0, 5.0), 1.0, &r);
        assert!(inside.hit);
        assert_eq!(inside.overlap, Vec2::ZERO);
    }

    #[test]
    fn test_rect_rect_scenario() {
        let c = rect_rect(&Rect::new(0.0, 0.0, 10.0, 10.0), &Rect::new(5.0, 5.0, 10.0, 10.0));
        assert!(c.hit);
        assert_eq!(c.overlap, Vec2::new(5.0, 5.0));

        let c = rect_rect(&Rect::new(0.0, 0.0, 10.0, 10.0), &Rect::new(10.0, 0.0, 10.0, 10.0));
        assert!(!c.hit);
    }

    #[test]
    fn test_collide_rect_circle_flips_overlap() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        let c = circle(13.0, 5.0, 4.0);
        let ab = collide(&c, &r);
        let ba = collide(&r, &c);
        assert!(ab.hit && ba.hit);
        assert_eq!(ab.overlap, -ba.overlap);
    }

    #[test]
    fn test_resolver_reports_each_pair_once() {
        let bodies = vec![
            body(1, circle(10.0, 10.0, 5.0)),
            body(2, circle(14.0, 10.0, 5.0)),
            body(3, circle(18.0, 10.0, 5.0)),
            body(4, circle(300.0, 300.0, 5.0)),
        ];
        let mut resolver = CollisionResolver::new(Rect::new(0.0, 0.0, 400.0, 400.0));
        let results = resolver.update(&bodies);

        let pairs: Vec<(u32, u32)> = results.iter().map(|r| (r.a, r.b)).collect();
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_resolver_skips_inactive() {
        let mut bodies = vec![
            body(1, circle(10.0, 10.0, 5.0)),
            body(2, circle(12.0, 10.0, 5.0)),
        ];
        bodies[1].active = false;
        let mut resolver = CollisionResolver::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(resolver.update(&bodies).is_empty());
    }

    #[test]
    fn test_resolver_rebuilds_every_update() {
        let mut resolver = CollisionResolver::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let first = vec![body(1, circle(10.0, 10.0, 5.0)), body(2, circle(12.0, 10.0, 5.0))];
        assert_eq!(resolver.update(&first).len(), 1);

        let second = vec![body(1, circle(10.0, 10.0, 5.0)), body(2, circle(80.0, 80.0, 5.0))];
        assert!(resolver.update(&second).is_empty());
        assert_eq!(resolver.tree().len(), 2);
    }

    #[test]
    fn test_resolver_matches_brute_force_with_many_bodies() {
        let mut bodies = Vec::new();
        for i in 0..60u32 {
            let x = (i * 37 % 390) as f32 + 5.0;
            let y = (i * 53 % 390) as f32 + 5.0;
            let collider = if i % 3 == 0 {
                rect(x, y, 12.0, 8.0)
            } else {
                circle(x, y, 6.0)
            };
            bodies.push(body(i, collider));
        }
        let mut resolver = CollisionResolver::new(Rect::new(0.0, 0.0, 400.0, 400.0));
        let mut found: Vec<(u32, u32)> = resolver.update(&bodies).iter().map(|r| (r.a, r.b)).collect();
        found.sort_unstable();

        let mut expected = Vec::new();
        for i in 0..bodies.len() {
            for j in i + 1..bodies.len() {
                if collide(&bodies[i].collider, &bodies[j].collider).hit {
                    expected.push((bodies[i].key, bodies[j].key));
                }
            }
        }
        assert_eq!(found, expected);
    }

    fn arb_collider() -> impl Strategy<Value = Collider> {
        prop_oneof![
            (0.0f32..50.0, 0.0f32..50.0, 0.5f32..15.0).prop_map(|(x, y, r)| circle(x, y, r)),
            (0.0f32..50.0, 0.0f32..50.0, 0.5f32..20.0, 0.5f32..20.0)
                .prop_map(|(x, y, w, h)| rect(x, y, w, h)),
        ]
    }

    proptest! {
        #[test]
        fn prop_collision_is_symmetric(a in arb_collider(), b in arb_collider()) {
            prop_assert_eq!(collide(&a, &b).hit, collide(&b, &a).hit);
        }
    }
}

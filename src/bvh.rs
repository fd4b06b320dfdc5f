use crate::entity::{Entity, HitRecord};
use crate::geometry::{Aabb, Ray};
use crate::math::Interval;
use std::cmp::Ordering;
use std::sync::Arc;

/// A bounding-volume hierarchy over a set of entities. Interior nodes own
/// their children, so dropping the root tears down the whole tree; leaves
/// share the scene's entities, which also lets the light list alias them.
pub enum BvhNode {
    Leaf {
        object: Arc<dyn Entity>,
        bbox: Aabb,
    },
    Interior {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
}

impl BvhNode {
    /// Top-down midpoint build: split on the longest axis of the union
    /// bound, ordering entities by their bound's minimum on that axis.
    /// Deterministic for a given input order.
    pub fn build(mut objects: Vec<Arc<dyn Entity>>) -> Self {
        match objects.len() {
            0 => panic!("BVH: empty object list"),
            1 => {
                let object = objects.pop().unwrap();
                let bbox = object.bounding_box();
                BvhNode::Leaf { object, bbox }
            }
            2 => {
                let b = objects.pop().unwrap();
                let a = objects.pop().unwrap();
                let left = Box::new(BvhNode::Leaf {
                    bbox: a.bounding_box(),
                    object: a,
                });
                let right = Box::new(BvhNode::Leaf {
                    bbox: b.bounding_box(),
                    object: b,
                });
                let bbox = left.bbox().union_with(&right.bbox());
                BvhNode::Interior { left, right, bbox }
            }
            len => {
                let enclosing = objects
                    .iter()
                    .map(|o| o.bounding_box())
                    .reduce(|a, b| a.union_with(&b))
                    .unwrap();
                let axis = enclosing.longest_axis();

                objects.sort_by(|a, b| {
                    let amin = a.bounding_box().axis(axis).min;
                    let bmin = b.bounding_box().axis(axis).min;
                    amin.partial_cmp(&bmin).unwrap_or(Ordering::Equal)
                });

                let right_objs = objects.split_off(len / 2);
                let left = Box::new(BvhNode::build(objects));
                let right = Box::new(BvhNode::build(right_objs));
                let bbox = left.bbox().union_with(&right.bbox());
                BvhNode::Interior { left, right, bbox }
            }
        }
    }

    fn bbox(&self) -> Aabb {
        match self {
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Interior { bbox, .. } => *bbox,
        }
    }
}

impl Entity for BvhNode {
    /// Closest-hit traversal. After the left subtree reports a hit, the
    /// right subtree is queried with the interval's max shrunk to that t,
    /// so it can only answer with a strictly nearer intersection. Left
    /// first, always.
    fn hit(&self, ray: &Ray, t_range: Interval) -> Option<HitRecord<'_>> {
        match self {
            BvhNode::Leaf { object, bbox } => {
                if !bbox.hit(ray, t_range) {
                    return None;
                }
                object.hit(ray, t_range)
            }
            BvhNode::Interior { left, right, bbox } => {
                if !bbox.hit(ray, t_range) {
                    return None;
                }
                let left_hit = left.hit(ray, t_range);
                let shrunk = Interval::new(
                    t_range.min,
                    left_hit.as_ref().map_or(t_range.max, |h| h.t),
                );
                let right_hit = right.hit(ray, shrunk);
                right_hit.or(left_hit)
            }
        }
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox()
    }
}

//! Collision kernel: circle/rect/two-segment-wall tests and responses
//!
//! Everything here is a pure function over snapshots of entity fields. Callers
//! copy results back onto their entities. Coordinates are screen space (y grows
//! downward) and velocities are per tick.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

/// Circle snapshot (fruit)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Same circle with its radius grown by `padding`
    pub fn padded(&self, padding: f32) -> Self {
        Self {
            radius: self.radius + padding,
            ..*self
        }
    }
}

/// Axis-aligned rectangle, top-left origin (player hitbox, power-up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Obstacle pair: a top segment spanning `[0, top_height)` and a bottom
/// segment from `bottom_y` down, both `width` wide starting at `x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallShape {
    pub x: f32,
    pub width: f32,
    pub top_height: f32,
    pub bottom_y: f32,
    pub broken: bool,
}

impl WallShape {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn gap_center(&self) -> f32 {
        (self.top_height + self.bottom_y) / 2.0
    }
}

/// Which logical wall face was touched.
///
/// `Top` is the underside of the top segment, `Bottom` the upper face of the
/// bottom segment, `Left`/`Right` the vertical faces of either segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WallSide {
    Top,
    Bottom,
    Left,
    Right,
    None,
}

/// Result of the detailed circle-vs-wall test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallCollision {
    pub has_collision: bool,
    pub side: WallSide,
    pub penetration_depth: f32,
    /// Outward unit normal of the penetrated face
    pub normal: Vec2,
}

impl WallCollision {
    pub const NONE: Self = Self {
        has_collision: false,
        side: WallSide::None,
        penetration_depth: 0.0,
        normal: Vec2::ZERO,
    };

    fn hit(side: WallSide, penetration_depth: f32, normal: Vec2) -> Self {
        Self {
            has_collision: true,
            side,
            penetration_depth,
            normal,
        }
    }
}

/// Result of a circle-circle test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleCollision {
    pub has_collision: bool,
    pub penetration: f32,
    /// Unit vector from `a` towards `b`
    pub normal: Vec2,
    pub distance: f32,
}

/// Moving circle used by the elastic resolver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

#[cfg(test)]
impl Body {
    pub fn circle(&self) -> Circle {
        Circle::new(self.position.x, self.position.y, self.radius)
    }
}

/// Response tuning for bounces, taken from `GameConfig`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceTuning {
    pub restitution: f32,
    pub jitter: f32,
    pub min_speed: f32,
    pub damping: f32,
    /// Extra separation beyond half the penetration per body
    pub slop: f32,
}

/// Physics system for fruit, wall and player collisions
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Closest point on the rect to the circle centre lies within the radius
    pub fn circle_in_rect(circle: Circle, rect: Rect) -> bool {
        let closest_x = circle.x.clamp(rect.x, rect.right());
        let closest_y = circle.y.clamp(rect.y, rect.bottom());
        let dx = circle.x - closest_x;
        let dy = circle.y - closest_y;
        dx * dx + dy * dy <= circle.radius * circle.radius
    }

    /// Rect overlaps the wall horizontally and pokes out of the gap
    pub fn rect_vs_wall(rect: Rect, wall: &WallShape) -> bool {
        if wall.broken {
            return false;
        }

        let overlaps_x = rect.right() > wall.x && rect.x < wall.right();
        overlaps_x && (rect.y < wall.top_height || rect.bottom() > wall.bottom_y)
    }

    /// Like [`Self::rect_vs_wall`] but reports the face that was hit.
    ///
    /// A rect whose centre sits inside the gap band clipped a segment tip
    /// (`Top`/`Bottom`); otherwise it ran into a vertical face (`Left`/`Right`).
    pub fn rect_wall_side(rect: Rect, wall: &WallShape) -> WallSide {
        if !Self::rect_vs_wall(rect, wall) {
            return WallSide::None;
        }

        let center = rect.center();
        if center.y >= wall.top_height && center.y <= wall.bottom_y {
            if rect.y < wall.top_height {
                WallSide::Top
            } else {
                WallSide::Bottom
            }
        } else if center.x < wall.x + wall.width / 2.0 {
            WallSide::Left
        } else {
            WallSide::Right
        }
    }

    /// Which wall face a circle penetrated and by how much.
    ///
    /// The top segment is checked before the bottom one, and for each segment
    /// the horizontal face wins over the vertical sides.
    pub fn circle_vs_wall(circle: Circle, wall: &WallShape) -> WallCollision {
        if wall.broken {
            return WallCollision::NONE;
        }

        let r = circle.radius;
        let overlaps_x = circle.x + r > wall.x && circle.x - r < wall.right();
        if !overlaps_x {
            return WallCollision::NONE;
        }

        let center_inside_x = circle.x >= wall.x && circle.x <= wall.right();

        if circle.y - r < wall.top_height {
            if center_inside_x || circle.y >= wall.top_height {
                return WallCollision::hit(
                    WallSide::Top,
                    wall.top_height - (circle.y - r),
                    Vec2::Y,
                );
            }
            return Self::side_hit(circle, wall);
        }

        if circle.y + r > wall.bottom_y {
            if center_inside_x || circle.y <= wall.bottom_y {
                return WallCollision::hit(
                    WallSide::Bottom,
                    (circle.y + r) - wall.bottom_y,
                    Vec2::NEG_Y,
                );
            }
            return Self::side_hit(circle, wall);
        }

        WallCollision::NONE
    }

    fn side_hit(circle: Circle, wall: &WallShape) -> WallCollision {
        if circle.x < wall.x + wall.width / 2.0 {
            WallCollision::hit(
                WallSide::Left,
                circle.x + circle.radius - wall.x,
                Vec2::NEG_X,
            )
        } else {
            WallCollision::hit(
                WallSide::Right,
                wall.right() - (circle.x - circle.radius),
                Vec2::X,
            )
        }
    }

    /// Push a circle out along the collision normal, `buffer` past the surface
    pub fn separate(circle: Circle, collision: &WallCollision, buffer: f32) -> Circle {
        if !collision.has_collision {
            return circle;
        }
        let offset = collision.normal * (collision.penetration_depth + buffer);
        Circle {
            x: circle.x + offset.x,
            y: circle.y + offset.y,
            radius: circle.radius,
        }
    }

    /// Mirror `velocity` about `normal`, scale by restitution and add jitter.
    ///
    /// The result never points back into the surface and is never slower than
    /// `min_speed`.
    pub fn reflect<R: Rng + ?Sized>(
        velocity: Vec2,
        normal: Vec2,
        restitution: f32,
        jitter: f32,
        min_speed: f32,
        rng: &mut R,
    ) -> Vec2 {
        let mut v = (velocity - 2.0 * velocity.dot(normal) * normal) * restitution;

        if jitter > 0.0 {
            v += Vec2::new(
                rng.gen_range(-jitter..=jitter),
                rng.gen_range(-jitter..=jitter),
            );
        }

        let into_surface = v.dot(normal);
        if into_surface < 0.0 {
            v -= normal * (2.0 * into_surface);
        }

        let speed = v.length();
        if speed < min_speed {
            v = if speed > f32::EPSILON {
                v * (min_speed / speed)
            } else {
                normal * min_speed
            };
        }

        v
    }

    /// Overlap test between two circles
    pub fn circle_vs_circle(a: Circle, b: Circle) -> CircleCollision {
        let delta = b.center() - a.center();
        let distance = delta.length();
        let penetration = a.radius + b.radius - distance;
        let normal = if distance > f32::EPSILON {
            delta / distance
        } else {
            // Coincident centres: any axis will do
            Vec2::X
        };

        CircleCollision {
            has_collision: penetration > 0.0,
            penetration,
            normal,
            distance,
        }
    }

    /// Mass used by the elastic resolver (area-proportional)
    pub fn mass(radius: f32) -> f32 {
        radius * radius
    }

    /// Impulse-based 2D elastic collision with positional correction.
    ///
    /// Both bodies move apart by half the penetration each, approaching
    /// velocities exchange momentum along the normal, a small random tangential
    /// kick is added, then both velocities are damped and floored.
    pub fn resolve_elastic_collision<R: Rng + ?Sized>(
        a: &mut Body,
        b: &mut Body,
        collision: &CircleCollision,
        tuning: &BounceTuning,
        rng: &mut R,
    ) {
        if !collision.has_collision {
            return;
        }

        let n = collision.normal;
        let push = collision.penetration / 2.0 + tuning.slop;
        a.position -= n * push;
        b.position += n * push;

        let mass_a = Self::mass(a.radius);
        let mass_b = Self::mass(b.radius);
        let approach = (b.velocity - a.velocity).dot(n);

        if approach < 0.0 {
            let impulse = -(1.0 + tuning.restitution) * approach / (1.0 / mass_a + 1.0 / mass_b);
            a.velocity -= n * (impulse / mass_a);
            b.velocity += n * (impulse / mass_b);

            if tuning.jitter > 0.0 {
                let kick = n.perp() * rng.gen_range(-tuning.jitter..=tuning.jitter);
                a.velocity -= kick;
                b.velocity += kick;
            }
        }

        a.velocity = Self::floor_speed(a.velocity * tuning.damping, tuning.min_speed);
        b.velocity = Self::floor_speed(b.velocity * tuning.damping, tuning.min_speed);
    }

    /// Scale a non-zero velocity up to `min_speed`; zero stays zero
    pub fn floor_speed(velocity: Vec2, min_speed: f32) -> Vec2 {
        let speed = velocity.length();
        if speed > f32::EPSILON && speed < min_speed {
            velocity * (min_speed / speed)
        } else {
            velocity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn wall() -> WallShape {
        WallShape {
            x: 400.0,
            width: 40.0,
            top_height: 100.0,
            bottom_y: 320.0,
            broken: false,
        }
    }

    fn tuning() -> BounceTuning {
        BounceTuning {
            restitution: 0.9,
            jitter: 0.5,
            min_speed: 1.5,
            damping: 0.98,
            slop: 0.01,
        }
    }

    #[test]
    fn circle_in_rect_uses_closest_point() {
        let rect = Rect::new(100.0, 100.0, 40.0, 30.0);
        assert!(PhysicsSystem::circle_in_rect(Circle::new(120.0, 115.0, 5.0), rect));
        assert!(PhysicsSystem::circle_in_rect(Circle::new(150.0, 115.0, 10.0), rect));
        assert!(!PhysicsSystem::circle_in_rect(Circle::new(150.0, 115.0, 9.0), rect));
        // Corner: distance to (140, 130) is 5*sqrt(2) ~ 7.07
        assert!(!PhysicsSystem::circle_in_rect(Circle::new(145.0, 135.0, 7.0), rect));
        assert!(PhysicsSystem::circle_in_rect(Circle::new(145.0, 135.0, 7.5), rect));
    }

    #[test]
    fn padded_circle_reaches_further() {
        let rect = Rect::new(100.0, 100.0, 40.0, 30.0);
        let fruit = Circle::new(165.0, 115.0, 20.0);
        assert!(!PhysicsSystem::circle_in_rect(fruit, rect));
        assert!(PhysicsSystem::circle_in_rect(fruit.padded(10.0), rect));
    }

    #[test]
    fn rect_in_gap_is_safe() {
        let w = wall();
        assert!(!PhysicsSystem::rect_vs_wall(Rect::new(410.0, 150.0, 40.0, 30.0), &w));
        assert!(PhysicsSystem::rect_vs_wall(Rect::new(410.0, 0.0, 40.0, 110.0), &w));
        assert!(PhysicsSystem::rect_vs_wall(Rect::new(410.0, 300.0, 40.0, 30.0), &w));
        // Outside horizontal extent
        assert!(!PhysicsSystem::rect_vs_wall(Rect::new(300.0, 0.0, 40.0, 600.0), &w));
    }

    #[test]
    fn broken_wall_never_collides() {
        let mut w = wall();
        w.broken = true;
        assert!(!PhysicsSystem::rect_vs_wall(Rect::new(410.0, 0.0, 40.0, 600.0), &w));
        let hit = PhysicsSystem::circle_vs_wall(Circle::new(420.0, 50.0, 20.0), &w);
        assert!(!hit.has_collision);
    }

    #[test]
    fn rect_wall_side_classifies_faces() {
        let w = wall();
        // Centre in the gap band, top edge above the gap
        assert_eq!(
            PhysicsSystem::rect_wall_side(Rect::new(410.0, 90.0, 40.0, 30.0), &w),
            WallSide::Top
        );
        assert_eq!(
            PhysicsSystem::rect_wall_side(Rect::new(410.0, 300.0, 40.0, 30.0), &w),
            WallSide::Bottom
        );
        // Centre level with the top segment, approaching from the left
        assert_eq!(
            PhysicsSystem::rect_wall_side(Rect::new(370.0, 40.0, 40.0, 30.0), &w),
            WallSide::Left
        );
        assert_eq!(
            PhysicsSystem::rect_wall_side(Rect::new(430.0, 400.0, 40.0, 30.0), &w),
            WallSide::Right
        );
    }

    #[test]
    fn circle_below_top_segment_hits_top_face() {
        let hit = PhysicsSystem::circle_vs_wall(Circle::new(420.0, 110.0, 20.0), &wall());
        assert!(hit.has_collision);
        assert_eq!(hit.side, WallSide::Top);
        assert!((hit.penetration_depth - 10.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec2::Y);
    }

    #[test]
    fn circle_above_bottom_segment_hits_bottom_face() {
        let hit = PhysicsSystem::circle_vs_wall(Circle::new(420.0, 305.0, 20.0), &wall());
        assert_eq!(hit.side, WallSide::Bottom);
        assert!((hit.penetration_depth - 5.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec2::NEG_Y);
    }

    #[test]
    fn circle_beside_segment_hits_side_faces() {
        let left = PhysicsSystem::circle_vs_wall(Circle::new(385.0, 50.0, 20.0), &wall());
        assert_eq!(left.side, WallSide::Left);
        assert!((left.penetration_depth - 5.0).abs() < 1e-4);
        assert_eq!(left.normal, Vec2::NEG_X);

        let right = PhysicsSystem::circle_vs_wall(Circle::new(450.0, 400.0, 20.0), &wall());
        assert_eq!(right.side, WallSide::Right);
        assert!((right.penetration_depth - 10.0).abs() < 1e-4);
    }

    #[test]
    fn corner_contact_prefers_horizontal_face() {
        // Centre left of the wall but below the top segment's lower edge
        let hit = PhysicsSystem::circle_vs_wall(Circle::new(390.0, 105.0, 20.0), &wall());
        assert_eq!(hit.side, WallSide::Top);
    }

    #[test]
    fn circle_in_gap_is_clear() {
        let hit = PhysicsSystem::circle_vs_wall(Circle::new(420.0, 210.0, 20.0), &wall());
        assert_eq!(hit, WallCollision::NONE);
    }

    #[test]
    fn reflect_mirrors_and_scales() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let v = PhysicsSystem::reflect(Vec2::new(3.0, -4.0), Vec2::Y, 0.5, 0.0, 0.0, &mut rng);
        assert!((v - Vec2::new(1.5, 2.0)).length() < 1e-5);
    }

    #[test]
    fn reflect_enforces_speed_floor() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let v = PhysicsSystem::reflect(Vec2::new(0.0, -0.1), Vec2::Y, 0.8, 0.0, 1.5, &mut rng);
        assert!((v.length() - 1.5).abs() < 1e-4);
        assert!(v.y > 0.0);

        let still = PhysicsSystem::reflect(Vec2::ZERO, Vec2::NEG_X, 0.8, 0.0, 1.5, &mut rng);
        assert!((still - Vec2::new(-1.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn reflect_with_jitter_leaves_the_surface() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let v = PhysicsSystem::reflect(Vec2::new(-2.0, 0.05), Vec2::X, 0.8, 3.0, 1.0, &mut rng);
            assert!(v.x >= 0.0, "reflected velocity {v:?} points into the wall");
        }
    }

    #[test]
    fn coincident_circles_do_not_divide_by_zero() {
        let c = PhysicsSystem::circle_vs_circle(Circle::new(5.0, 5.0, 10.0), Circle::new(5.0, 5.0, 10.0));
        assert!(c.has_collision);
        assert_eq!(c.distance, 0.0);
        assert_eq!(c.normal, Vec2::X);
        assert!(c.normal.is_finite());
    }

    #[test]
    fn elastic_collision_exchanges_momentum() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut a = Body {
            position: Vec2::new(0.0, 0.0),
            velocity: Vec2::new(3.0, 0.0),
            radius: 20.0,
        };
        let mut b = Body {
            position: Vec2::new(35.0, 0.0),
            velocity: Vec2::new(-3.0, 0.0),
            radius: 20.0,
        };
        let collision = PhysicsSystem::circle_vs_circle(a.circle(), b.circle());
        let no_jitter = BounceTuning { jitter: 0.0, ..tuning() };
        PhysicsSystem::resolve_elastic_collision(&mut a, &mut b, &collision, &no_jitter, &mut rng);

        assert!(a.velocity.x < 0.0);
        assert!(b.velocity.x > 0.0);
        assert!(b.position.x - a.position.x >= 40.0);
    }

    #[test]
    fn separating_circles_keep_their_velocity_direction() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut a = Body {
            position: Vec2::new(0.0, 0.0),
            velocity: Vec2::new(-2.0, 0.0),
            radius: 20.0,
        };
        let mut b = Body {
            position: Vec2::new(30.0, 0.0),
            velocity: Vec2::new(2.0, 0.0),
            radius: 20.0,
        };
        let collision = PhysicsSystem::circle_vs_circle(a.circle(), b.circle());
        PhysicsSystem::resolve_elastic_collision(&mut a, &mut b, &collision, &tuning(), &mut rng);
        assert!(a.velocity.x < 0.0);
        assert!(b.velocity.x > 0.0);
    }

    #[test]
    fn floor_speed_leaves_zero_alone() {
        assert_eq!(PhysicsSystem::floor_speed(Vec2::ZERO, 1.5), Vec2::ZERO);
        let floored = PhysicsSystem::floor_speed(Vec2::new(0.3, 0.4), 1.5);
        assert!((floored.length() - 1.5).abs() < 1e-5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn separated_circle_no_longer_touches_wall(
                x in 330.0f32..510.0,
                y in -40.0f32..640.0,
                radius in 15.0f32..30.0,
                top in 60.0f32..300.0,
            ) {
                let wall = WallShape {
                    x: 400.0,
                    width: 40.0,
                    top_height: top,
                    bottom_y: top + 220.0,
                    broken: false,
                };
                let circle = Circle::new(x, y, radius);
                let hit = PhysicsSystem::circle_vs_wall(circle, &wall);
                prop_assume!(hit.has_collision);

                let moved = PhysicsSystem::separate(circle, &hit, 1.0);
                let again = PhysicsSystem::circle_vs_wall(moved, &wall);
                prop_assert!(
                    !again.has_collision,
                    "circle {:?} still hits {:?} after separation ({:?})",
                    moved, again.side, hit.side
                );
            }

            #[test]
            fn elastic_resolution_leaves_no_overlap(
                ax in -50.0f32..50.0,
                ay in -50.0f32..50.0,
                bx in -50.0f32..50.0,
                by in -50.0f32..50.0,
                ra in 15.0f32..30.0,
                rb in 15.0f32..30.0,
                avx in -6.0f32..6.0,
                avy in -6.0f32..6.0,
                bvx in -6.0f32..6.0,
                bvy in -6.0f32..6.0,
                seed in 0u64..1000,
            ) {
                let mut a = Body { position: Vec2::new(ax, ay), velocity: Vec2::new(avx, avy), radius: ra };
                let mut b = Body { position: Vec2::new(bx, by), velocity: Vec2::new(bvx, bvy), radius: rb };
                let collision = PhysicsSystem::circle_vs_circle(a.circle(), b.circle());
                prop_assume!(collision.has_collision && collision.distance > 1e-3);

                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                PhysicsSystem::resolve_elastic_collision(&mut a, &mut b, &collision, &tuning(), &mut rng);

                let distance = a.position.distance(b.position);
                prop_assert!(distance >= ra + rb - 1e-3, "distance {} < {}", distance, ra + rb);
            }
        }
    }
}

//! Drifting position: a point with velocity that bounces off the map edges.

use tg_core::Position;

/// Velocity is in map units per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionPhysics {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
}

const MAX_COORD: f32 = 255.0;

impl PositionPhysics {
    pub fn new(start: Position, vx: f32, vy: f32) -> Self {
        Self {
            x: start.x as f32,
            y: start.y as f32,
            vx: finite_or_zero(vx),
            vy: finite_or_zero(vy),
        }
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.vx, self.vy)
    }

    pub fn set_velocity(&mut self, vx: f32, vy: f32) {
        self.vx = finite_or_zero(vx);
        self.vy = finite_or_zero(vy);
    }

    /// Move one tick, reflecting off the edges, and return the new position.
    pub fn step(&mut self) -> Position {
        bounce(&mut self.x, &mut self.vx);
        bounce(&mut self.y, &mut self.vy);
        self.position()
    }

    pub fn position(&self) -> Position {
        Position::new(self.x as u8, self.y as u8)
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-MAX_COORD, MAX_COORD)
    } else {
        0.0
    }
}

fn bounce(coord: &mut f32, velocity: &mut f32) {
    let mut next = *coord + *velocity;
    if next < 0.0 {
        next = -next;
        *velocity = libm::fabsf(*velocity);
    } else if next > MAX_COORD {
        next = 2.0 * MAX_COORD - next;
        *velocity = -libm::fabsf(*velocity);
    }
    *coord = next.clamp(0.0, MAX_COORD);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_by_velocity() {
        let mut physics = PositionPhysics::new(Position::new(10, 20), 2.0, -1.0);
        assert_eq!(physics.step(), Position::new(12, 19));
        assert_eq!(physics.step(), Position::new(14, 18));
    }

    #[test]
    fn bounces_off_edges() {
        let mut physics = PositionPhysics::new(Position::new(250, 3), 10.0, -5.0);
        assert_eq!(physics.step(), Position::new(250, 2));
        assert_eq!(physics.velocity(), (-10.0, 5.0));
        assert_eq!(physics.step(), Position::new(240, 7));
    }

    #[test]
    fn speed_is_preserved() {
        let mut physics = PositionPhysics::new(Position::new(128, 128), 37.5, 91.25);
        for _ in 0..1000 {
            physics.step();
        }
        let (vx, vy) = physics.velocity();
        assert_eq!((vx.abs(), vy.abs()), (37.5, 91.25));
    }

    #[test]
    fn bad_velocity_is_zeroed() {
        let mut physics = PositionPhysics::new(Position::new(1, 1), f32::NAN, f32::INFINITY);
        assert_eq!(physics.velocity(), (0.0, 0.0));
        assert_eq!(physics.step(), Position::new(1, 1));
    }
}

//! Rectangle overlap and impact effects
//!
//! Collision is exact axis-aligned overlap. An impact spawns a short radial
//! particle burst; the state machine waits on `has_active_effects` before it
//! declares the run over.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Same size, different top-left corner
    pub fn moved_to(&self, x: f32, y: f32) -> Self {
        Self { x, y, ..*self }
    }
}

/// Strict overlap test; rectangles that only share an edge do not collide
#[inline]
pub fn check_collision(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Midpoint of the region two rectangles share
pub fn overlap_center(a: &Rect, b: &Rect) -> Vec2 {
    Vec2::new(
        (a.x.max(b.x) + a.right().min(b.right())) / 2.0,
        (a.y.max(b.y) + a.bottom().min(b.bottom())) / 2.0,
    )
}

/// Palette particles pick from (0xRRGGBB)
pub const PARTICLE_COLORS: [u32; 6] = [0xFF5252, 0xFF4081, 0x7C4DFF, 0x448AFF, 0x64FFDA, 0xFFD740];

/// Initial speed range, in pixels per 1/60 s
const PARTICLE_SPEED_MIN: f32 = 2.0;
const PARTICLE_SPEED_SPREAD: f32 = 3.0;
const PARTICLE_SIZE_MIN: f32 = 3.0;
const PARTICLE_SIZE_SPREAD: f32 = 3.0;
/// Velocities are expressed per 60 Hz frame
const VELOCITY_SCALE: f32 = 60.0;

/// A single spark of an impact burst
#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub color: u32,
    /// 1.0 at spawn, fades linearly to 0.0 at the effect's max age
    pub alpha: f32,
}

/// Burst of particles sharing one age
#[derive(Debug, Clone)]
pub struct CollisionEffect {
    pub origin: Vec2,
    pub age: f32,
    pub max_age: f32,
    pub particles: Vec<Particle>,
}

/// Spawns, animates and retires impact effects
#[derive(Debug, Clone)]
pub struct CollisionSystem {
    effects: Vec<CollisionEffect>,
    particle_count: usize,
    max_age: f32,
    gravity: f32,
    rng: Pcg32,
}

impl CollisionSystem {
    pub fn new(particle_count: usize, max_age: f32, gravity: f32, seed: u64) -> Self {
        Self {
            effects: Vec::new(),
            particle_count,
            max_age,
            gravity,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Reseed the effect RNG (new session)
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg32::seed_from_u64(seed);
    }

    /// Spawn a radial burst centred on the impact point
    pub fn create_collision_effect(&mut self, point: Vec2) {
        let count = self.particle_count;
        let mut particles = Vec::with_capacity(count);
        for i in 0..count {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            let speed = PARTICLE_SPEED_MIN + self.rng.random::<f32>() * PARTICLE_SPEED_SPREAD;
            let color = PARTICLE_COLORS[self.rng.random_range(0..PARTICLE_COLORS.len())];
            particles.push(Particle {
                pos: point,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                size: PARTICLE_SIZE_MIN + self.rng.random::<f32>() * PARTICLE_SIZE_SPREAD,
                color,
                alpha: 1.0,
            });
        }

        self.effects.push(CollisionEffect {
            origin: point,
            age: 0.0,
            max_age: self.max_age,
            particles,
        });
    }

    /// Age effects, move particles, retire finished bursts
    pub fn update(&mut self, dt: f32) {
        let gravity = self.gravity;
        for effect in &mut self.effects {
            effect.age += dt;
            let alpha = (1.0 - effect.age / effect.max_age).max(0.0);
            for particle in &mut effect.particles {
                particle.pos += particle.vel * VELOCITY_SCALE * dt;
                particle.alpha = alpha;
                particle.vel.y += gravity * dt;
            }
        }
        self.effects.retain(|effect| effect.age < effect.max_age);
    }

    pub fn has_active_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    pub fn effects(&self) -> &[CollisionEffect] {
        &self.effects
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

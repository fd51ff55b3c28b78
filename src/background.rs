//! Ambient particle animation. Independent of the studio state: it only
//! needs a surface size and lives from `start` until `stop` (or drop).

use parking_lot::Mutex;
use rand::Rng;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    width: f32,
    height: f32,
    particles: Vec<Particle>,
}

impl ParticleField {
    /// Sizes below one cell are raised to one.
    pub fn new(width: f32, height: f32, count: usize, rng: &mut impl Rng) -> Self {
        let (width, height) = (width.max(1.0), height.max(1.0));
        let particles = (0..count)
            .map(|_| Particle {
                x: rng.gen_range(0.0..width),
                y: rng.gen_range(0.0..height),
                vx: rng.gen_range(-0.5..0.5),
                vy: rng.gen_range(-0.5..0.5),
                size: rng.gen_range(0.5..2.5),
            })
            .collect();
        Self { width, height, particles }
    }

    /// Advances every particle by `dt` frames, wrapping at the edges.
    pub fn step(&mut self, dt: f32) {
        for p in &mut self.particles {
            p.x = (p.x + p.vx * dt).rem_euclid(self.width);
            p.y = (p.y + p.vy * dt).rem_euclid(self.height);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// One-line rendering: each column lights up if a particle sits over it.
    pub fn strip(&self, columns: usize) -> String {
        if columns == 0 {
            return String::new();
        }
        let mut cells = vec![' '; columns];
        for p in &self.particles {
            let col = ((p.x / self.width) * columns as f32) as usize;
            let glyph = if p.size > 1.5 { '*' } else { '.' };
            if let Some(cell) = cells.get_mut(col.min(columns - 1)) {
                if *cell != '*' {
                    *cell = glyph;
                }
            }
        }
        cells.into_iter().collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackgroundConfig {
    pub width: f32,
    pub height: f32,
    pub particles: usize,
    pub frame: Duration,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self { width: 80.0, height: 24.0, particles: 24, frame: Duration::from_millis(60) }
    }
}

/// Running animation. Dropping it cancels the frame loop.
pub struct Background {
    field: Arc<Mutex<ParticleField>>,
    handle: JoinHandle<()>,
}

impl Background {
    pub fn start(config: BackgroundConfig) -> Self {
        let field = Arc::new(Mutex::new(ParticleField::new(
            config.width,
            config.height,
            config.particles,
            &mut rand::thread_rng(),
        )));
        let shared = Arc::clone(&field);
        let handle = tokio::spawn(async move {
            let mut frames = tokio::time::interval(config.frame);
            loop {
                frames.tick().await;
                shared.lock().step(1.0);
            }
        });
        Self { field, handle }
    }

    pub fn snapshot(&self) -> ParticleField {
        self.field.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn particles_start_inside_the_surface() {
        let field = ParticleField::new(40.0, 10.0, 50, &mut StdRng::seed_from_u64(7));
        assert_eq!(field.particles().len(), 50);
        assert!(field.particles().iter().all(|p| (0.0..40.0).contains(&p.x) && (0.0..10.0).contains(&p.y)));
    }

    #[test]
    fn step_wraps_at_edges() {
        let mut field = ParticleField {
            width: 10.0,
            height: 10.0,
            particles: vec![Particle { x: 9.8, y: 0.1, vx: 0.5, vy: -0.5, size: 1.0 }],
        };
        field.step(1.0);
        let p = field.particles()[0];
        assert!((p.x - 0.3).abs() < 1e-4, "{p:?}");
        assert!((p.y - 9.6).abs() < 1e-4, "{p:?}");
    }

    #[test]
    fn strip_has_requested_width() {
        let field = ParticleField::new(80.0, 24.0, 10, &mut StdRng::seed_from_u64(1));
        assert_eq!(field.strip(32).chars().count(), 32);
        assert_eq!(field.strip(0), "");
    }

    #[test]
    fn zero_sized_surface_is_raised_to_one_cell() {
        let mut field = ParticleField::new(0.0, 0.0, 5, &mut StdRng::seed_from_u64(3));
        field.step(1.0);
        assert!(field.particles().iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert!(field.particles().iter().all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y)));
        assert_eq!(field.strip(8).chars().count(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn animation_moves_until_stopped() {
        let background = Background::start(BackgroundConfig { frame: Duration::from_millis(10), ..Default::default() });
        let before = background.snapshot();
        tokio::time::sleep(Duration::from_millis(55)).await;
        let after = background.snapshot();
        assert_ne!(before.particles(), after.particles());

        assert!(background.is_running());
        background.stop();
    }
}

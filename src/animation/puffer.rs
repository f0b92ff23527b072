//! Steam puffs from brass bells and reeds
//!
//! Clouds are pooled: a cloud that finishes goes back to the pool and is
//! reused by the next puff, so a long note never grows the scene.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::Puffing;
use crate::scene::{Axis, NodeId, Scene};

/// A cloud finishes at this age
pub const CLOUD_LIFE_SPAN: f64 = 0.7;
/// Clouds age this much faster than wall-clock time
const AGE_RATE: f64 = 1.5;
/// Distance a cloud travels along the puff axis
const TRAVEL: f64 = 6.0;
/// Sideways scatter of a cloud
const SCATTER: f64 = 0.75;

#[derive(Debug, Clone)]
struct Cloud {
    node: NodeId,
    age: f64,
    scatter: [f64; 2],
    active: bool,
}

/// Steam emitter of one clone
#[derive(Debug, Clone)]
pub struct SteamPuffer {
    root: NodeId,
    axis: Axis,
    scale: f64,
    clouds: Vec<Cloud>,
    rng: SmallRng,
}

impl SteamPuffer {
    /// # Arguments
    /// * `root` - Node the clouds are created under
    /// * `axis` - Direction the steam travels
    /// * `scale` - Base cloud size
    /// * `seed` - Seed for cloud scatter, so runs are repeatable
    pub fn new(root: NodeId, axis: Axis, scale: f64, seed: u64) -> Self {
        Self {
            root,
            axis,
            scale,
            clouds: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Clouds currently in the air
    pub fn active_clouds(&self) -> usize {
        self.clouds.iter().filter(|c| c.active).count()
    }

    /// Clouds ever created, active or pooled
    pub fn pool_size(&self) -> usize {
        self.clouds.len()
    }

    fn spawn(&mut self, scene: &mut dyn Scene) {
        let age = self.rng.gen_range(0.0..0.02);
        let scatter = [
            self.rng.gen_range(-SCATTER..SCATTER),
            self.rng.gen_range(-SCATTER..SCATTER),
        ];

        if let Some(cloud) = self.clouds.iter_mut().find(|c| !c.active) {
            cloud.age = age;
            cloud.scatter = scatter;
            cloud.active = true;
            scene.set_visible(cloud.node, true);
            return;
        }

        let node = scene.create_node(Some(self.root), "cloud");
        self.clouds.push(Cloud {
            node,
            age,
            scatter,
            active: true,
        });
    }

    fn place(&self, cloud: &Cloud, scene: &mut dyn Scene) {
        let travel = 1.0 - 2f64.powf(-10.0 * cloud.age);
        let along = self.axis as usize;

        let mut translation = [0.0f32; 3];
        let mut side = cloud.scatter.iter();
        for (i, t) in translation.iter_mut().enumerate() {
            *t = if i == along {
                (TRAVEL * travel) as f32
            } else {
                side.next().map_or(0.0, |s| (s * travel) as f32)
            };
        }

        let size = ((0.75 * cloud.age + 1.2) * self.scale) as f32;
        scene.set_translation(cloud.node, translation);
        scene.set_scale(cloud.node, [size; 3]);
    }

    pub fn reset(&mut self, scene: &mut dyn Scene) {
        for cloud in &mut self.clouds {
            cloud.active = false;
            scene.set_visible(cloud.node, false);
        }
    }
}

impl Puffing for SteamPuffer {
    fn puff(&mut self, delta: f64, active: bool, scene: &mut dyn Scene) {
        if active {
            // Tolerate rounding in the frame delta
            let count = ((delta * 60.0).max(1.0) - 1e-6).ceil() as usize;
            for _ in 0..count {
                self.spawn(scene);
            }
        }

        for i in 0..self.clouds.len() {
            if !self.clouds[i].active {
                continue;
            }
            self.clouds[i].age += delta * AGE_RATE;
            if self.clouds[i].age > CLOUD_LIFE_SPAN {
                self.clouds[i].active = false;
                scene.set_visible(self.clouds[i].node, false);
            } else {
                self.place(&self.clouds[i], scene);
            }
        }
    }
}

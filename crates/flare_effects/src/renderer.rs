//! # Renderer Collaborator
//!
//! The orchestrator talks to a particle surface through [`EffectRenderer`].
//! [`HeadlessRenderer`] is the in-process implementation used by the
//! simulation binary and tests: it accounts draw calls, culling and upload
//! bytes exactly as a GPU backend would, without a device.

use bytemuck::{Pod, Zeroable};
use flare_core::{EffectId, Particle};

use crate::effect::EffectInfo;

/// GPU upload record for one particle (32 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// Screen position.
    pub position: [f32; 2],
    /// Size.
    pub size: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// RGBA, alpha already faded by remaining life.
    pub color: [f32; 4],
}

impl From<&Particle> for ParticleInstance {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.position,
            size: p.size,
            rotation: p.rotation,
            color: [p.color[0], p.color[1], p.color[2], p.color[3] * p.faded_alpha()],
        }
    }
}

/// One frame's worth of instances plus the knobs the optimizers control.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Every live particle.
    pub instances: &'a [ParticleInstance],
    /// Instances per draw call.
    pub batch_size: usize,
    /// LOD culling on/off.
    pub enable_lod: bool,
    /// Adaptive quality scalar.
    pub quality: f32,
}

/// Surface-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    /// Effects currently registered with the surface.
    pub tracked_effects: usize,
    /// Effects the surface refused.
    pub rejected_effects: u64,
    /// Frames rendered.
    pub frames_rendered: u64,
    /// Draw calls in the last frame.
    pub draw_calls: usize,
    /// Instances drawn in the last frame.
    pub instances_drawn: usize,
    /// Instances culled in the last frame.
    pub instances_culled: usize,
    /// Bytes uploaded in the last frame.
    pub bytes_uploaded: usize,
}

/// The particle surface the orchestrator renders into.
pub trait EffectRenderer {
    /// Registers an effect. `false` means refused; nothing changes.
    fn add_effect(&mut self, info: &EffectInfo) -> bool;

    /// Forgets an effect.
    fn remove_effect(&mut self, id: EffectId);

    /// Advances surface-side animation.
    fn update(&mut self, dt: f32);

    /// Draws one frame.
    fn render(&mut self, frame: &RenderFrame<'_>);

    /// Counters.
    fn system_stats(&self) -> SurfaceStats;
}

/// Faded instances below this alpha are culled when LOD is on.
pub const LOD_MIN_ALPHA: f32 = 0.15;

/// Device-free renderer.
#[derive(Debug)]
pub struct HeadlessRenderer {
    max_effects: usize,
    accepting: bool,
    tracked: Vec<EffectId>,
    /// Instances that survived culling last frame.
    visible: Vec<ParticleInstance>,
    elapsed: f32,
    stats: SurfaceStats,
}

impl HeadlessRenderer {
    /// Surface that tracks at most `max_effects` effects.
    #[must_use]
    pub fn new(max_effects: usize) -> Self {
        Self {
            max_effects,
            accepting: true,
            tracked: Vec::new(),
            visible: Vec::new(),
            elapsed: 0.0,
            stats: SurfaceStats::default(),
        }
    }

    /// Turns admission on or off, to simulate a lost surface.
    pub fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    /// Is `id` registered?
    #[must_use]
    pub fn is_tracking(&self, id: EffectId) -> bool {
        self.tracked.contains(&id)
    }

    /// Instances drawn last frame.
    #[must_use]
    pub fn visible(&self) -> &[ParticleInstance] {
        &self.visible
    }

    /// Seconds of surface time.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EffectRenderer for HeadlessRenderer {
    fn add_effect(&mut self, info: &EffectInfo) -> bool {
        if !self.accepting || self.tracked.len() >= self.max_effects {
            self.stats.rejected_effects += 1;
            return false;
        }
        self.tracked.push(info.id);
        self.stats.tracked_effects = self.tracked.len();
        true
    }

    fn remove_effect(&mut self, id: EffectId) {
        self.tracked.retain(|tracked| *tracked != id);
        self.stats.tracked_effects = self.tracked.len();
    }

    fn update(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
    }

    fn render(&mut self, frame: &RenderFrame<'_>) {
        self.visible.clear();

        if frame.enable_lod {
            // Keep every n-th instance at reduced quality, drop near-invisible ones.
            let quality = frame.quality.clamp(0.05, 1.0);
            let stride = (1.0 / quality).round().max(1.0) as usize;
            self.visible.extend(
                frame
                    .instances
                    .iter()
                    .step_by(stride)
                    .filter(|inst| inst.color[3] >= LOD_MIN_ALPHA),
            );
        } else {
            self.visible.extend_from_slice(frame.instances);
        }

        let batch = frame.batch_size.max(1);
        let bytes: &[u8] = bytemuck::cast_slice(&self.visible);

        self.stats.frames_rendered += 1;
        self.stats.instances_drawn = self.visible.len();
        self.stats.instances_culled = frame.instances.len() - self.visible.len();
        self.stats.draw_calls = self.visible.len().div_ceil(batch);
        self.stats.bytes_uploaded = bytes.len();
    }

    fn system_stats(&self) -> SurfaceStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::Lifespan;

    fn info(id: u64) -> EffectInfo {
        EffectInfo {
            id: EffectId(id),
            name: "burst".into(),
            emitter_count: 1,
            lifespan: Lifespan::Bounded { millis: 500 },
            looping: false,
        }
    }

    fn instances(n: usize, alpha: f32) -> Vec<ParticleInstance> {
        vec![
            ParticleInstance {
                color: [1.0, 1.0, 1.0, alpha],
                ..Default::default()
            };
            n
        ]
    }

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 32);
    }

    #[test]
    fn test_capacity_rejection() {
        let mut renderer = HeadlessRenderer::new(1);
        assert!(renderer.add_effect(&info(1)));
        assert!(!renderer.add_effect(&info(2)));
        assert_eq!(renderer.system_stats().rejected_effects, 1);

        renderer.remove_effect(EffectId(1));
        assert!(renderer.add_effect(&info(2)));
        assert!(renderer.is_tracking(EffectId(2)));
    }

    #[test]
    fn test_not_accepting() {
        let mut renderer = HeadlessRenderer::default();
        renderer.set_accepting(false);
        assert!(!renderer.add_effect(&info(1)));
        assert_eq!(renderer.system_stats().tracked_effects, 0);
    }

    #[test]
    fn test_draw_calls_and_bytes() {
        let mut renderer = HeadlessRenderer::default();
        let data = instances(250, 1.0);
        renderer.render(&RenderFrame {
            instances: &data,
            batch_size: 100,
            enable_lod: false,
            quality: 1.0,
        });

        let stats = renderer.system_stats();
        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.instances_drawn, 250);
        assert_eq!(stats.bytes_uploaded, 250 * 32);
    }

    #[test]
    fn test_lod_culls() {
        let mut renderer = HeadlessRenderer::default();
        let mut data = instances(100, 1.0);
        data.extend(instances(100, 0.05));

        renderer.render(&RenderFrame {
            instances: &data,
            batch_size: 50,
            enable_lod: true,
            quality: 0.5,
        });

        let stats = renderer.system_stats();
        assert_eq!(stats.instances_drawn, 50);
        assert_eq!(stats.instances_culled, 150);
        assert_eq!(stats.draw_calls, 1);
    }

    #[test]
    fn test_instance_from_particle_fades() {
        let p = Particle {
            life: 0.5,
            max_life: 1.0,
            alpha: 1.0,
            color: [1.0, 0.5, 0.25, 1.0],
            ..Particle::dead()
        };
        let inst = ParticleInstance::from(&p);
        assert!((inst.color[3] - 0.5).abs() < 1e-6);
        assert_eq!(inst.color[1], 0.5);
    }
}

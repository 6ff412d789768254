//! Turntable frame sequence and per-frame rendering.

use std::fs;
use std::path::{Path, PathBuf};

use meshtools_core::obj::load_obj;
use meshtools_core::{Axis, ObjDetail, Transform};
use tracing::{debug, info};

use crate::error::{TurntableError, TurntableResult};
use crate::scene::RenderSurface;

/// Frame file name prefix.
pub const FRAME_PREFIX: &str = "screenshot_";

/// Upper bound on frames per turn, i.e. a smallest step of 0.0036 degrees.
pub const MAX_FRAMES: usize = 100_000;

const FULL_TURN: f64 = 360.0;
const ANGLE_EPSILON: f64 = 1e-9;
/// Angles this close to a full turn count as the full turn.
const TURN_TOLERANCE: f64 = ANGLE_EPSILON * FULL_TURN;

/// Angles `0, step, 2 * step, ...` strictly below a full turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSequence {
    step: f64,
    len: usize,
}

impl FrameSequence {
    pub fn new(step: f64) -> TurntableResult<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(TurntableError::InvalidStep { step });
        }
        let estimate = (FULL_TURN / step).ceil();
        if estimate > (MAX_FRAMES + 1) as f64 {
            return Err(TurntableError::InvalidStep { step });
        }

        // Frame i exists while i * step stays short of the full turn
        let below_turn = |i: usize| (i as f64) * step < FULL_TURN - TURN_TOLERANCE;
        let mut len = estimate as usize;
        while len > 1 && !below_turn(len - 1) {
            len -= 1;
        }
        while below_turn(len) {
            len += 1;
        }
        if len > MAX_FRAMES {
            return Err(TurntableError::InvalidStep { step });
        }
        Ok(Self { step, len })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Angle of frame `index`, computed directly rather than accumulated.
    pub fn angle(&self, index: usize) -> f64 {
        index as f64 * self.step
    }

    pub fn angles(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(|i| self.angle(i))
    }

    pub fn last_angle(&self) -> f64 {
        self.angle(self.len.saturating_sub(1))
    }

    /// Whether one more step after the last frame lands exactly on a full
    /// turn, i.e. the step divides 360 evenly.
    pub fn wraps_evenly(&self) -> bool {
        (self.last_angle() + self.step - FULL_TURN).abs() < TURN_TOLERANCE
    }
}

/// File name of frame `index` in a run of `total` frames. Zero-padded to
/// three digits, wider when the run has more than 1000 frames so that
/// lexicographic order stays angle order.
pub fn frame_file_name(index: usize, total: usize) -> String {
    let digits = total.saturating_sub(1).to_string().len();
    let width = digits.max(3);
    format!("{FRAME_PREFIX}{index:0width$}.png")
}

/// Delete `screenshot_*.png` files left in `dir` by an earlier run.
pub fn remove_stale_frames(dir: &Path) -> TurntableResult<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FRAME_PREFIX) && n.ends_with(".png"));
        if is_frame && path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(removed, dir = %dir.display(), "Removed stale frames");
    }
    Ok(removed)
}

/// Renders one PNG per angle, each from a freshly loaded copy of the mesh.
pub struct FrameRenderer<'a> {
    obj_path: &'a Path,
    axis: Axis,
    output_dir: &'a Path,
}

impl<'a> FrameRenderer<'a> {
    pub fn new(obj_path: &'a Path, axis: Axis, output_dir: &'a Path) -> Self {
        Self {
            obj_path,
            axis,
            output_dir,
        }
    }

    /// Render every frame of `sequence` and return the written paths in
    /// frame order.
    pub fn render_all(
        &self,
        surface: &mut RenderSurface,
        sequence: &FrameSequence,
    ) -> TurntableResult<Vec<PathBuf>> {
        let total = sequence.len();
        let mut written = Vec::with_capacity(total);
        for (index, angle) in sequence.angles().enumerate() {
            let path = self.output_dir.join(frame_file_name(index, total));
            self.render_frame(surface, angle, &path)?;
            debug!(index, angle, path = %path.display(), "Frame written");
            written.push(path);
        }
        info!(frames = total, dir = %self.output_dir.display(), "Rendered turntable frames");
        Ok(written)
    }

    /// Reload, rotate, render and save a single frame.
    pub fn render_frame(
        &self,
        surface: &mut RenderSurface,
        angle: f64,
        path: &Path,
    ) -> TurntableResult<()> {
        let mut mesh = load_obj(self.obj_path, ObjDetail::Textured)?;
        mesh.transform(&Transform::rotation_degrees(self.axis, angle));

        surface.clear();
        surface.add_mesh(mesh);
        surface.render();
        surface.screenshot(path)
    }
}

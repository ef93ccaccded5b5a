//! Keyboard controls for the level of detail of a vertex tree.

use macroquad::prelude::*;
use vds_tree::{AdjustStats, VertexTree, ViewState, DEFAULT_THRESHOLD};

/// How the active boundary is brought up to date each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Re-evaluate the whole tree from the root.
    TopDown,
    /// Walk the current boundary and move it locally.
    BoundaryWalk,
}

/// Interactive level-of-detail controls.
pub struct LodControls {
    threshold: f32,
    strategy: Strategy,
    frozen: bool,
    culling: bool,
    last: AdjustStats,
}

impl Default for LodControls {
    fn default() -> Self {
        Self::new()
    }
}

impl LodControls {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strategy: Strategy::BoundaryWalk,
            frozen: false,
            culling: true,
            last: AdjustStats::default(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Whether the render traversal culls against the view cone.
    pub fn culling(&self) -> bool {
        self.culling
    }

    /// Handles keyboard input.
    /// Returns true if any setting changed.
    pub fn update(&mut self) -> bool {
        let mut changed = false;

        if is_key_pressed(KeyCode::Equal) || is_key_pressed(KeyCode::KpAdd) {
            self.threshold = (self.threshold * 1.25).min(1.0);
            changed = true;
        }
        if is_key_pressed(KeyCode::Minus) || is_key_pressed(KeyCode::KpSubtract) {
            self.threshold = (self.threshold / 1.25).max(0.001);
            changed = true;
        }
        if is_key_pressed(KeyCode::T) {
            self.strategy = match self.strategy {
                Strategy::TopDown => Strategy::BoundaryWalk,
                Strategy::BoundaryWalk => Strategy::TopDown,
            };
            changed = true;
        }
        if is_key_pressed(KeyCode::Space) {
            self.frozen = !self.frozen;
            changed = true;
        }
        if is_key_pressed(KeyCode::C) {
            self.culling = !self.culling;
            changed = true;
        }

        changed
    }

    /// Moves the boundary of `tree` to match `view`, unless frozen.
    pub fn adjust(&mut self, tree: &mut VertexTree, view: &ViewState) {
        if self.frozen {
            self.last = AdjustStats::default();
            return;
        }
        self.last = match self.strategy {
            Strategy::TopDown => tree.adjust_top_down(tree.root(), view),
            Strategy::BoundaryWalk => tree.adjust_boundary(view),
        };
    }

    /// Draws the controls overlay.
    pub fn draw_ui(&self, tree: &VertexTree, rendered: usize, y_offset: f32) {
        let boundary = tree.boundary().count();

        draw_text(
            &format!("Rendered: {} of {} triangles", rendered, tree.tri_count()),
            10.0,
            y_offset,
            18.0,
            WHITE,
        );
        draw_text(
            &format!("Boundary: {} of {} nodes", boundary, tree.node_count()),
            10.0,
            y_offset + 20.0,
            18.0,
            WHITE,
        );
        draw_text(
            &format!(
                "Threshold: {:.4} | Strategy: {:?}{}",
                self.threshold,
                self.strategy,
                if self.frozen { " (frozen)" } else { "" }
            ),
            10.0,
            y_offset + 40.0,
            18.0,
            if self.frozen { ORANGE } else { YELLOW },
        );
        draw_text(
            &format!(
                "Last adjust: {} folds, {} unfolds, {} evaluations",
                self.last.folds, self.last.unfolds, self.last.evaluations
            ),
            10.0,
            y_offset + 60.0,
            18.0,
            GREEN,
        );
        draw_text(
            "[+/-] threshold | [T]op-down/walk | [Space] freeze | [C]ulling",
            10.0,
            y_offset + 80.0,
            16.0,
            DARKGRAY,
        );
    }
}

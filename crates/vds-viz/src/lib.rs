//! Shared visualization utilities for the vertex tree demos.

use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;
use nalgebra::{Point3, Vector3};
use vds_tree::{cluster_octree, NodeIndex, RenderVisitor, ResolvedTri, Rgb, TreeBuilder, VertexTree, ViewState};

pub mod navigator;
pub use navigator::{LodControls, Strategy};

/// Vertical field of view used by the demo cameras, in radians.
pub const FOV: f32 = std::f32::consts::FRAC_PI_4;

/// Direction the scene is lit from.
const LIGHT: [f32; 3] = [0.4, 0.8, 0.45];

/// Indexed triangle mesh fed to the [`TreeBuilder`].
#[derive(Debug, Clone, Default)]
pub struct ProceduralMesh {
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub colors: Vec<Rgb>,
    pub triangles: Vec<[usize; 3]>,
}

impl ProceduralMesh {
    /// Generates a UV sphere with `rings` latitude bands and `segments`
    /// longitude bands, colored by latitude.
    pub fn uv_sphere(center: Point3<f32>, radius: f32, rings: usize, segments: usize) -> Self {
        let mut mesh = Self::default();

        // Poles are single vertices; rows in between wrap around.
        mesh.push_vertex(center + Vector3::y() * radius, Vector3::y(), latitude_color(0.0));
        for ring in 1..rings {
            let theta = std::f32::consts::PI * ring as f32 / rings as f32;
            for segment in 0..segments {
                let phi = std::f32::consts::TAU * segment as f32 / segments as f32;
                let normal = Vector3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                mesh.push_vertex(center + normal * radius, normal, latitude_color(ring as f32 / rings as f32));
            }
        }
        let south = mesh.positions.len();
        mesh.push_vertex(center - Vector3::y() * radius, -Vector3::y(), latitude_color(1.0));

        let row = |ring: usize, segment: usize| 1 + (ring - 1) * segments + segment % segments;
        for segment in 0..segments {
            mesh.triangles.push([0, row(1, segment + 1), row(1, segment)]);
            mesh.triangles.push([south, row(rings - 1, segment), row(rings - 1, segment + 1)]);
        }
        for ring in 1..rings - 1 {
            for segment in 0..segments {
                let (a, b) = (row(ring, segment), row(ring, segment + 1));
                let (c, d) = (row(ring + 1, segment), row(ring + 1, segment + 1));
                mesh.triangles.push([a, b, c]);
                mesh.triangles.push([b, d, c]);
            }
        }
        mesh
    }

    /// Generates a `size` x `size` height field over the xz plane with grid
    /// spacing `spacing`, colored by height.
    pub fn height_field(size: usize, spacing: f32, height: impl Fn(f32, f32) -> f32) -> Self {
        let mut mesh = Self::default();
        let offset = (size - 1) as f32 * spacing / 2.0;
        let sample = |x: usize, z: usize| {
            let (px, pz) = (x as f32 * spacing - offset, z as f32 * spacing - offset);
            Point3::new(px, height(px, pz), pz)
        };

        for z in 0..size {
            for x in 0..size {
                let p = sample(x, z);
                // Central differences, clamped at the border.
                let dx = sample((x + 1).min(size - 1), z) - sample(x.saturating_sub(1), z);
                let dz = sample(x, (z + 1).min(size - 1)) - sample(x, z.saturating_sub(1));
                let normal = dz.cross(&dx).try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y);
                mesh.push_vertex(p, normal, height_color(p.y));
            }
        }
        for z in 0..size - 1 {
            for x in 0..size - 1 {
                let i = z * size + x;
                mesh.triangles.push([i, i + size, i + 1]);
                mesh.triangles.push([i + 1, i + size, i + size + 1]);
            }
        }
        mesh
    }

    fn push_vertex(&mut self, position: Point3<f32>, normal: Vector3<f32>, color: Rgb) {
        self.positions.push(position);
        self.normals.push(normal);
        self.colors.push(color);
    }

    /// Ingests the mesh and clusters it by octree.
    pub fn build_tree(&self) -> vds_tree::Result<VertexTree> {
        let mut builder = TreeBuilder::default();
        builder.begin_geometry()?;
        for p in &self.positions {
            builder.add_vertex(*p);
        }
        for t in &self.triangles {
            builder.add_triangle(*t, t.map(|v| self.normals[v]), t.map(|v| self.colors[v]));
        }
        let leaves = builder.end_geometry()?;
        cluster_octree(&mut builder, &leaves)?;
        builder.end_tree()
    }
}

fn latitude_color(t: f32) -> Rgb {
    [(60.0 + 180.0 * t) as u8, 120, (240.0 - 180.0 * t) as u8]
}

fn height_color(y: f32) -> Rgb {
    match y {
        y if y < -0.5 => [40, 80, 160],
        y if y < 0.5 => [70, 150, 70],
        y if y < 1.5 => [130, 110, 80],
        _ => [235, 235, 240],
    }
}

/// Visitor that batches resolved triangles into macroquad meshes.
///
/// Triangles collapsed by the current simplification are dropped. Each
/// triangle is flat shaded with its current face normal.
#[derive(Default)]
pub struct MeshVisitor {
    meshes: Vec<Mesh>,
    triangles: usize,
}

impl MeshVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles batched so far.
    pub fn triangle_count(&self) -> usize {
        self.triangles
    }

    /// Draws all batched meshes.
    pub fn draw(&self) {
        for mesh in &self.meshes {
            draw_mesh(mesh);
        }
    }

    fn current_mesh(&mut self) -> &mut Mesh {
        let full = self
            .meshes
            .last()
            .is_none_or(|m| m.vertices.len() + 3 > u16::MAX as usize);
        if full {
            self.meshes.push(Mesh {
                vertices: Vec::new(),
                indices: Vec::new(),
                texture: None,
            });
        }
        let last = self.meshes.len() - 1;
        &mut self.meshes[last]
    }
}

impl RenderVisitor for MeshVisitor {
    fn visit(&mut self, _node: NodeIndex, tris: &[ResolvedTri]) {
        for tri in tris {
            if tri.is_degenerate() {
                continue;
            }
            let Some(normal) = tri.face_normal() else {
                continue;
            };
            let shade = 0.35 + 0.65 * normal.dot(&Vector3::from(LIGHT).normalize()).max(0.0);

            let mesh = self.current_mesh();
            let base = mesh.vertices.len() as u16;
            for (p, c) in tri.positions.iter().zip(&tri.colors) {
                let color = Color::from_rgba(
                    (c[0] as f32 * shade) as u8,
                    (c[1] as f32 * shade) as u8,
                    (c[2] as f32 * shade) as u8,
                    255,
                );
                mesh.vertices.push(Vertex::new2(vec3(p.x, p.y, p.z), vec2(0.0, 0.0), color));
            }
            mesh.indices.extend([base, base + 1, base + 2]);
            self.triangles += 1;
        }
    }
}

/// Simple orbit camera for 3D scene navigation.
pub struct OrbitCamera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target: Vec3,
    /// Multiplier for scroll wheel zoom
    pub zoom_speed: f32,
    /// Minimum distance from target
    pub min_distance: f32,
    /// Maximum distance from target
    pub max_distance: f32,
}

impl OrbitCamera {
    pub fn new(distance: f32, yaw: f32, pitch: f32) -> Self {
        Self {
            distance,
            yaw,
            pitch,
            target: vec3(0.0, 0.0, 0.0),
            zoom_speed: 1.0,
            min_distance: 1.0,
            max_distance: 100.0,
        }
    }

    /// Sets the zoom configuration (speed and distance limits).
    pub fn with_zoom(mut self, speed: f32, min: f32, max: f32) -> Self {
        self.zoom_speed = speed;
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    /// Updates camera state from mouse drag, scroll and arrow keys.
    pub fn update(&mut self) {
        if is_mouse_button_down(MouseButton::Left) {
            let delta = mouse_delta_position();
            self.yaw -= delta.x * 2.0;
            self.pitch -= delta.y * 2.0;
        }
        self.pitch = self.pitch.clamp(-1.5, 1.5);

        let scroll = mouse_wheel().1;
        self.distance = (self.distance - scroll * self.zoom_speed).clamp(self.min_distance, self.max_distance);

        if is_key_down(KeyCode::Left) {
            self.yaw += 0.02;
        }
        if is_key_down(KeyCode::Right) {
            self.yaw -= 0.02;
        }
        if is_key_down(KeyCode::Up) {
            self.pitch += 0.02;
        }
        if is_key_down(KeyCode::Down) {
            self.pitch -= 0.02;
        }
    }

    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + vec3(x, y, z)
    }

    pub fn to_camera3d(&self) -> Camera3D {
        Camera3D {
            position: self.position(),
            up: vec3(0.0, 1.0, 0.0),
            target: self.target,
            fovy: FOV,
            ..Default::default()
        }
    }

    /// The viewer as seen by the vertex tree.
    pub fn view_state(&self, threshold: f32) -> ViewState {
        let eye = self.position();
        let target = self.target;
        ViewState::look_at(
            Point3::new(eye.x, eye.y, eye.z),
            Point3::new(target.x, target.y, target.z),
            FOV,
        )
        .with_threshold(threshold)
    }
}

use macroquad::prelude::*;
use vds_viz::{LodControls, MeshVisitor, OrbitCamera, ProceduralMesh};

/// Rolling hills with a ridge along the diagonal.
fn terrain_height(x: f32, z: f32) -> f32 {
    let hills = (x * 0.35).sin() * (z * 0.25).cos() * 1.2;
    let ridge = 2.0 * (-((x - z) * 0.15).powi(2)).exp();
    hills + ridge - 0.4
}

#[macroquad::main("VDS Terrain")]
async fn main() {
    println!("Generating terrain...");
    let mesh = ProceduralMesh::height_field(160, 0.25, terrain_height);
    println!(
        "Created {} vertices, {} triangles",
        mesh.positions.len(),
        mesh.triangles.len()
    );

    println!("Building vertex tree...");
    let mut tree = match mesh.build_tree() {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("Failed to build vertex tree: {err}");
            return;
        }
    };
    println!(
        "Vertex tree built: {} nodes, depth {}",
        tree.node_count(),
        tree.depth()
    );

    let mut camera = OrbitCamera::new(25.0, 0.6, 0.5).with_zoom(1.0, 3.0, 80.0);
    let mut controls = LodControls::new();

    loop {
        camera.update();
        controls.update();

        let view = camera.view_state(controls.threshold());
        controls.adjust(&mut tree, &view);

        let mut visitor = MeshVisitor::new();
        if controls.culling() {
            tree.render_tree_culled(tree.root(), &mut visitor, &view);
        } else {
            tree.render_tree(tree.root(), &mut visitor);
        }

        clear_background(Color::from_rgba(135, 170, 210, 255));
        set_camera(&camera.to_camera3d());
        visitor.draw();
        set_default_camera();

        draw_text("VDS Terrain", 10.0, 25.0, 20.0, WHITE);
        controls.draw_ui(&tree, visitor.triangle_count(), 50.0);
        draw_text("Drag mouse to rotate, scroll to zoom", 10.0, 155.0, 16.0, DARKGRAY);
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 175.0, 16.0, DARKGRAY);

        next_frame().await
    }
}

use macroquad::prelude::*;
use nalgebra::Point3;
use vds_viz::{LodControls, MeshVisitor, OrbitCamera, ProceduralMesh};

#[macroquad::main("VDS Sphere")]
async fn main() {
    println!("Generating sphere...");
    let mesh = ProceduralMesh::uv_sphere(Point3::origin(), 2.0, 96, 192);
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
    let stats = tree.stats();
    println!(
        "Vertex tree built: {} nodes, {} leaves, depth {}",
        stats.nodes,
        stats.leaves,
        tree.depth()
    );

    let mut camera = OrbitCamera::new(6.0, 0.4, 0.3).with_zoom(0.5, 2.5, 30.0);
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

        clear_background(Color::from_rgba(20, 20, 30, 255));
        set_camera(&camera.to_camera3d());
        visitor.draw();
        set_default_camera();

        draw_text("VDS Sphere", 10.0, 25.0, 20.0, WHITE);
        controls.draw_ui(&tree, visitor.triangle_count(), 50.0);
        draw_text("Drag mouse to rotate, scroll to zoom", 10.0, 155.0, 16.0, DARKGRAY);
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 175.0, 16.0, DARKGRAY);

        next_frame().await
    }
}

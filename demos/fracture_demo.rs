//! Demonstration of the fracture operations
//!
//! Run with `RUST_LOG=debug` to see what the engine does.

use rust_voronoi_fracture::*;

fn print_chunks(engine: &FractureEngine, chunks: &[ChunkId]) {
    for &chunk in chunks {
        let mesh = engine.chunk_mesh(chunk).unwrap();
        println!(
            "  chunk {:>3}: depth {}, {:>4} triangles, volume {:.4}",
            chunk,
            engine.chunk_depth(chunk).unwrap(),
            mesh.triangle_count(),
            mesh.volume()
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = FractureRng::new(42);
    let mesh = MeshCleaner::new().clean(&cuboid(Vec3::new(1.0, 0.5, 0.5)))?;
    println!("Source: {} vertices, volume {:.4}", mesh.vertex_count(), mesh.volume());

    // Voronoi
    let mut sites = SiteGenerator::new(mesh.clone())?;
    sites.uniform(8, &mut rng);
    let mut engine = FractureEngine::new();
    let root = engine.set_source_mesh(mesh.clone())?;
    let chunks = engine.voronoi_fracture(root, &sites, false)?;
    println!("\nVoronoi fracture with {} sites:", sites.site_count());
    print_chunks(&engine, &chunks);

    // Second level: slice the first chunk with noisy planes
    let slicing = SlicingConfigBuilder::new()
        .slices(2, 2, 1)?
        .offset_variations(0.3)?
        .angle_variations(0.2)?
        .noise(NoiseConfig {
            amplitude: 0.02,
            frequency: 4.0,
            octave_number: 3,
            surface_resolution: 2,
        })?
        .build()?;
    let sliced = engine.slice(chunks[0], &slicing, false, &mut rng)?;
    println!("\nSliced chunk {}:", chunks[0]);
    print_chunks(&engine, &sliced);

    // Cutout on a fresh engine
    let mut cutout_engine = FractureEngine::new();
    let root = cutout_engine.set_source_mesh(mesh)?;
    let config = CutoutConfig {
        scale: Vec2::ONE,
        aperture: 10.0,
        ..CutoutConfig::with_pattern(CutoutSet::from_loops(vec![
            CutoutSet::rectangle(Vec2::new(-0.5, 0.0), Vec2::splat(0.2)),
            CutoutSet::rectangle(Vec2::new(0.5, 0.0), Vec2::splat(0.2)),
        ]))
    };
    let pieces = cutout_engine.cutout(root, &config, true, &mut rng)?;
    println!("\nCutout with {} loops:", config.pattern.len());
    print_chunks(&cutout_engine, &pieces);

    let bonds = engine.generate_bonds();
    println!("\n{} bonds between Voronoi chunks", bonds.len());

    engine.fit_all_uv_to_rect(1.0)?;
    engine.finalize();
    println!("{} crack edges after finalize", engine.crack_edges()?.len());

    let hull = engine.chunk_convex_hull(sliced[0])?;
    println!("Hull of chunk {}: {} triangles", sliced[0], hull.triangle_count());

    Ok(())
}

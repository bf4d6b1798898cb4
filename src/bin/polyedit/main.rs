//! polyedit CLI - builds a primitive, applies an editing operator and
//! reports the resulting mesh.
//!
//! Usage: polyedit [--log-level <LEVEL>] <COMMAND> <SHAPE> [OPTIONS]
//!
//! Run `polyedit --help` for available commands.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use polyedit::algo::{
    bevel_edges, bridge_edges, dissolve_edges, dissolve_faces, extrude_faces, loop_cut,
    merge_vertices_with_progress, quadrangulate_faces, subdivide_edges_with_progress,
    triangulate_faces, BevelOptions, LoopCutOptions, MeshDelta, Progress, Skipped,
};
use polyedit::mesh::{
    topology, validate_mesh_topology_with, EdgeId, EditableMesh, FaceKind, ValidateOptions,
};
use polyedit::nalgebra::Point3;
use polyedit::primitives;

#[derive(Parser)]
#[command(name = "polyedit")]
#[command(author, version, about = "Editable polygon mesh CLI", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Use single-threaded validation (for benchmarking)
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about a primitive
    Info {
        #[command(flatten)]
        shape: ShapeArgs,
    },

    /// Extrude faces along their normals
    Extrude {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Extrusion distance
        #[arg(short, long, default_value = "0.5")]
        distance: f64,

        /// Number of faces to extrude (default: all)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Split edges at their midpoints
    Subdivide {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Number of edges to split (default: all)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Weld vertices closer than a threshold
    Merge {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Merge distance
        #[arg(short, long, default_value = "0.001")]
        threshold: f64,
    },

    /// Fan-triangulate faces
    Triangulate {
        #[command(flatten)]
        shape: ShapeArgs,
    },

    /// Split n-gons into quads
    Quadrangulate {
        #[command(flatten)]
        shape: ShapeArgs,
    },

    /// Bevel edges
    Bevel {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Bevel height
        #[arg(short, long, default_value = "0.1")]
        distance: f64,

        /// Quads per strip
        #[arg(long, default_value = "1")]
        strips: usize,

        /// Number of edges to bevel (default: 1)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Cut a quad ring through an edge
    LoopCut {
        #[command(flatten)]
        shape: ShapeArgs,

        /// Position of the edge to start from, in storage order
        #[arg(short, long, default_value = "0")]
        edge: usize,

        /// Cut position along each ring edge (0.0 to 1.0, exclusive)
        #[arg(short, long, default_value = "0.5")]
        factor: f64,
    },

    /// Dissolve edges or faces
    Dissolve {
        #[command(flatten)]
        shape: ShapeArgs,

        /// What to dissolve
        #[arg(short, long, value_enum, default_value = "edges")]
        target: DissolveTarget,

        /// Number of elements to dissolve (default: 1)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Bridge two circular edge loops stacked along Y
    Bridge {
        /// Vertices on the lower loop
        #[arg(long, default_value = "8")]
        lower: usize,

        /// Vertices on the upper loop
        #[arg(long, default_value = "8")]
        upper: usize,

        /// Loop radius
        #[arg(short, long, default_value = "1.0")]
        radius: f64,

        /// Distance between the loops
        #[arg(long, default_value = "1.0")]
        height: f64,
    },
}

#[derive(Args)]
struct ShapeArgs {
    /// Primitive to start from
    #[arg(value_enum)]
    shape: Shape,

    /// Edge length or radius
    #[arg(short, long, default_value = "1.0")]
    size: f64,

    /// Segments around (grid, cylinder, sphere)
    #[arg(long, default_value = "8")]
    segments: usize,

    /// Rings from pole to pole (sphere)
    #[arg(long, default_value = "6")]
    rings: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Single quad in the XZ plane
    Plane,
    /// Subdivided plane
    Grid,
    /// Axis-aligned cube
    Cube,
    /// Regular tetrahedron
    Tetrahedron,
    /// Regular octahedron
    Octahedron,
    /// Regular icosahedron
    Icosahedron,
    /// Regular dodecahedron
    Dodecahedron,
    /// Capped cylinder along Y
    Cylinder,
    /// Latitude/longitude sphere
    Sphere,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DissolveTarget {
    /// Join the two faces of each interior edge
    Edges,
    /// Replace connected face regions by their outline
    Faces,
}

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let validate = if cli.sequential {
        ValidateOptions::default().sequential()
    } else {
        ValidateOptions::default()
    };

    match cli.command {
        Commands::Info { shape } => {
            let mesh = build(&shape)?;
            print_stats(&mesh);
            print_validation(&mesh, &validate)?;
        }

        Commands::Extrude {
            shape,
            distance,
            count,
        } => {
            let mut mesh = build(&shape)?;
            let faces = first(mesh.face_ids(), count);
            println!("Extruding {} faces by {}...", faces.len(), distance);

            let start = Instant::now();
            let delta = extrude_faces(&mut mesh, &faces, distance)?;
            print_delta(&delta, start);
            finish(&mesh, &validate)?;
        }

        Commands::Subdivide { shape, count } => {
            let mut mesh = build(&shape)?;
            let edges = first(mesh.edge_ids(), count);
            println!("Subdividing {} edges...", edges.len());

            let start = Instant::now();
            let batch = subdivide_edges_with_progress(&mut mesh, &edges, &create_progress());
            println!("Inserted {} vertices ({:.2?})", batch.items.len(), start.elapsed());
            print_skipped(&batch.skipped);
            finish(&mesh, &validate)?;
        }

        Commands::Merge { shape, threshold } => {
            let mut mesh = build(&shape)?;
            println!("Merging vertices within {}...", threshold);

            let start = Instant::now();
            let result = merge_vertices_with_progress(&mut mesh, threshold, &create_progress())?;
            println!(
                "Merged {} vertices, updated {} faces ({:.2?})",
                result.merged_vertices,
                result.updated_faces,
                start.elapsed()
            );
            finish(&mesh, &validate)?;
        }

        Commands::Triangulate { shape } => {
            let mut mesh = build(&shape)?;
            let faces = first(mesh.face_ids(), None);

            let start = Instant::now();
            let batch = triangulate_faces(&mut mesh, &faces);
            println!("Produced {} triangles ({:.2?})", batch.items.len(), start.elapsed());
            print_skipped(&batch.skipped);
            finish(&mesh, &validate)?;
        }

        Commands::Quadrangulate { shape } => {
            let mut mesh = build(&shape)?;
            let faces = first(mesh.face_ids(), None);

            let start = Instant::now();
            let result = quadrangulate_faces(&mut mesh, &faces);
            println!(
                "Replaced {} faces with {} ({:.2?})",
                result.deleted_faces.len(),
                result.new_faces.len(),
                start.elapsed()
            );
            print_skipped(&result.skipped);
            finish(&mesh, &validate)?;
        }

        Commands::Bevel {
            shape,
            distance,
            strips,
            count,
        } => {
            let mut mesh = build(&shape)?;
            let edges = first(mesh.edge_ids(), Some(count));
            let options = BevelOptions::new(distance).with_segments(strips);
            println!("Beveling {} edges (distance={}, segments={})...", edges.len(), distance, strips);

            let start = Instant::now();
            let delta = bevel_edges(&mut mesh, &edges, &options)?;
            print_delta(&delta, start);
            finish(&mesh, &validate)?;
        }

        Commands::LoopCut { shape, edge, factor } => {
            let mut mesh = build(&shape)?;
            let Some(start_edge) = mesh.edge_ids().nth(edge) else {
                return Err(format!("mesh has only {} edges", mesh.num_edges()).into());
            };
            println!("Cutting ring through edge {} at {}...", start_edge, factor);

            let start = Instant::now();
            let delta = loop_cut(&mut mesh, start_edge, &LoopCutOptions::default().with_factor(factor))?;
            print_delta(&delta, start);
            finish(&mesh, &validate)?;
        }

        Commands::Dissolve { shape, target, count } => {
            let mut mesh = build(&shape)?;

            let start = Instant::now();
            let delta = match target {
                DissolveTarget::Edges => {
                    let interior = mesh
                        .edge_ids()
                        .filter(|&e| topology::edge_faces(&mesh, e).len() == 2);
                    let edges = first(interior, Some(count));
                    println!("Dissolving {} edges...", edges.len());
                    dissolve_edges(&mut mesh, &edges)
                }
                DissolveTarget::Faces => {
                    let faces = first(mesh.face_ids(), Some(count));
                    println!("Dissolving {} faces...", faces.len());
                    dissolve_faces(&mut mesh, &faces)
                }
            };
            print_delta(&delta, start);
            finish(&mesh, &validate)?;
        }

        Commands::Bridge {
            lower,
            upper,
            radius,
            height,
        } => {
            let mut mesh = EditableMesh::new();
            let rim_a = edge_loop(&mut mesh, lower, radius, 0.0)?;
            let rim_b = edge_loop(&mut mesh, upper, radius, height)?;
            println!("Bridging loops of {} and {} edges...", rim_a.len(), rim_b.len());

            let start = Instant::now();
            let result = bridge_edges(&mut mesh, &rim_a, &rim_b)?;
            println!("Created {} faces ({:.2?})", result.new_faces.len(), start.elapsed());
            finish(&mesh, &validate)?;
        }
    }

    Ok(())
}

fn build(args: &ShapeArgs) -> CliResult<EditableMesh> {
    let size = args.size;
    let mesh = match args.shape {
        Shape::Plane => primitives::plane(size)?,
        Shape::Grid => primitives::grid(size, size, args.segments, args.segments)?,
        Shape::Cube => primitives::cube(size)?,
        Shape::Tetrahedron => primitives::tetrahedron(size)?,
        Shape::Octahedron => primitives::octahedron(size)?,
        Shape::Icosahedron => primitives::icosahedron(size)?,
        Shape::Dodecahedron => primitives::dodecahedron(size)?,
        Shape::Cylinder => primitives::cylinder(size, 2.0 * size, args.segments)?,
        Shape::Sphere => primitives::uv_sphere(size, args.segments, args.rings)?,
    };
    info!(
        vertices = mesh.num_vertices(),
        faces = mesh.num_faces(),
        "built primitive"
    );
    println!(
        "Built: {} vertices, {} edges, {} faces",
        mesh.num_vertices(),
        mesh.num_edges(),
        mesh.num_faces()
    );
    Ok(mesh)
}

fn first<T>(ids: impl Iterator<Item = T>, count: Option<usize>) -> Vec<T> {
    match count {
        Some(n) => ids.take(n).collect(),
        None => ids.collect(),
    }
}

/// A closed ring of `n` loose edges at height `y`.
fn edge_loop(mesh: &mut EditableMesh, n: usize, radius: f64, y: f64) -> CliResult<Vec<EdgeId>> {
    if n < 3 {
        return Err(format!("an edge loop needs at least 3 vertices, got {}", n).into());
    }
    let vertices: Vec<_> = (0..n)
        .map(|i| {
            let phi = std::f64::consts::TAU * i as f64 / n as f64;
            mesh.add_vertex(Point3::new(radius * phi.cos(), y, radius * phi.sin()))
        })
        .collect::<Result<_, _>>()?;

    let mut edges = Vec::with_capacity(n);
    for i in 0..n {
        edges.push(mesh.add_edge(vertices[i], vertices[(i + 1) % n])?);
    }
    Ok(edges)
}

fn finish(mesh: &EditableMesh, validate: &ValidateOptions) -> CliResult {
    print_stats(mesh);
    print_validation(mesh, validate)
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Only ever move forwards
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (raw_percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, raw_percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn print_delta(delta: &MeshDelta, start: Instant) {
    println!(
        "Created: {} vertices, {} edges, {} faces",
        delta.created_vertices.len(),
        delta.created_edges.len(),
        delta.created_faces.len()
    );
    println!(
        "Deleted: {} vertices, {} edges, {} faces ({:.2?})",
        delta.deleted_vertices.len(),
        delta.deleted_edges.len(),
        delta.deleted_faces.len(),
        start.elapsed()
    );
    print_skipped(&delta.skipped);
}

fn print_skipped(skipped: &[Skipped]) {
    if skipped.is_empty() {
        return;
    }
    println!("Skipped {}:", skipped.len());
    for s in skipped {
        println!("  {}", s);
    }
}

fn print_stats(mesh: &EditableMesh) {
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());

    let mut triangles = 0;
    let mut quads = 0;
    let mut ngons = 0;
    for face in mesh.faces() {
        match face.kind() {
            FaceKind::Triangle => triangles += 1,
            FaceKind::Quad => quads += 1,
            FaceKind::NGon => ngons += 1,
            FaceKind::Degenerate => {}
        }
    }
    println!("Face kinds: {} triangles, {} quads, {} n-gons", triangles, quads, ngons);

    println!("Surface area: {:.6}", mesh.surface_area());
    if let Some((min, max)) = mesh.bounding_box() {
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    let euler = mesh.num_vertices() as i64 - mesh.num_edges() as i64 + mesh.num_faces() as i64;
    println!("Euler characteristic: {}", euler);

    let boundary = topology::boundary_edges(mesh);
    if boundary.is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary edges)", boundary.len());
    }
}

fn print_validation(mesh: &EditableMesh, options: &ValidateOptions) -> CliResult {
    let report = validate_mesh_topology_with(mesh, options);
    if report.is_valid {
        println!("Validation: OK");
        return Ok(());
    }

    println!("Validation: {} problems", report.errors.len());
    for error in &report.errors {
        println!("  {}", error);
    }
    Err("mesh failed validation".into())
}

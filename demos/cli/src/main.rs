use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use strum::IntoEnumIterator;

use grobview::{
    AppContext, Config,
    command::ThreadCount,
    mesh::{Format, GrobType},
    scene::{Content, MeshContent},
};

/// Headless mesh tool
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Input file (`.obj` or `.stl`)
    #[clap(short, long)]
    input: PathBuf,

    /// Number of worker threads to use
    #[clap(short, long)]
    threads: Option<NonZeroUsize>,
}

#[derive(Subcommand)]
enum Command {
    /// Prints vertex and grob counts and the bounding box
    Info,

    /// Refines the mesh one or more times
    Refine {
        /// Number of refinement levels
        #[clap(short, default_value_t = 1)]
        n: usize,

        /// Name of an `.obj` or `.stl` file to write
        #[clap(short, long)]
        out: Option<PathBuf>,
    },

    /// Rewrites the mesh in another format
    Convert {
        /// Name of an `.obj` or `.stl` file to write
        #[clap(short, long)]
        out: PathBuf,
    },
}

////////////////////////////////////////////////////////////////////////////////

/// Ticks the pipeline until every queued command has finished
fn run_to_idle(ctx: &AppContext) -> usize {
    let mut ticks = 0;
    while !ctx.is_idle() {
        ctx.tick();
        ticks += 1;
        if !ctx.workers().is_inline() {
            std::thread::sleep(std::time::Duration::from_micros(100));
        }
    }
    ticks
}

/// Checks the content for a failure recorded by a command
fn check(content: &MeshContent) -> Result<()> {
    if let Some(e) = content.data().error() {
        bail!("{e}");
    }
    Ok(())
}

fn print_info(content: &MeshContent) {
    let data = content.data();
    let Some(mesh) = data.mesh() else {
        println!("no mesh");
        return;
    };
    println!("{}", content.name());
    println!("  vertices: {}", mesh.num_vertices());
    for ty in GrobType::iter() {
        let n = mesh.num(ty);
        if n > 0 {
            println!("  {:<14}{n}", format!("{}:", ty.name()));
        }
    }
    match data.bounding_box() {
        Some(b) => {
            let (lo, hi) = (b.min(), b.max());
            println!("  min: [{}, {}, {}]", lo.x, lo.y, lo.z);
            println!("  max: [{}, {}, {}]", hi.x, hi.y, hi.z);
        }
        None => println!("  bounds: empty"),
    }
}

fn save(ctx: &AppContext, content: &MeshContent, out: PathBuf) -> Result<()> {
    let format = Format::from_path(&out)?;
    info!("Writing {format} to {out:?}");
    content.save(out, format);
    run_to_idle(ctx);
    check(content)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();
    let ctx = AppContext::new(Config {
        threads: args.threads.map(ThreadCount::from).unwrap_or_default(),
        ..Default::default()
    });

    let now = Instant::now();
    let content = MeshContent::from_file(&ctx, &args.input)?;
    info!("Loaded file in {:?}", now.elapsed());

    match args.cmd {
        Command::Info => print_info(&content),
        Command::Refine { n, out } => {
            let start = Instant::now();
            for _ in 0..n {
                content.refine();
            }
            let ticks = run_to_idle(&ctx);
            check(&content)?;
            info!(
                "Refined {n}x in {:?} ({ticks} ticks); {} triangles",
                start.elapsed(),
                content
                    .data()
                    .mesh()
                    .map(|m| m.num_triangles())
                    .unwrap_or(0)
            );
            if let Some(out) = out {
                save(&ctx, &content, out)?;
            }
        }
        Command::Convert { out } => save(&ctx, &content, out)?,
    }

    Ok(())
}

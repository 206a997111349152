//! gen_map.rs - write the built-in demo level to a map file.
//!
//! USAGE:
//! ```bash
//! cargo run --bin gen_map -- demo.map
//! cargo run --bin view_sw -- demo.map
//! ```

use clap::Parser;
use std::path::PathBuf;

use yacast_rs::{demo, map::GridMap};

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// Output map file
    #[arg(value_name = "FILE", default_value = "demo.map")]
    out: PathBuf,

    /// Read the file back and compare after writing
    #[arg(long)]
    verify: bool,
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let map = demo::map();
    map.save(&opts.out)?;
    println!(
        "wrote {} ({}×{} cells, {} entities)",
        opts.out.display(),
        map.width(),
        map.height(),
        map.entities().len()
    );

    if opts.verify {
        let back = GridMap::load(&opts.out)?;
        anyhow::ensure!(back == map, "{} does not read back identically", opts.out.display());
        println!("verified");
    }
    Ok(())
}

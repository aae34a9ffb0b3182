#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
//! Convert a CSV point cloud (x, y, z columns) into a STL mesh

use core::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use delaunay_stl::Error;
use delaunay_stl::Options;
use delaunay_stl::convert;
use delaunay_stl::io::LoadOptions;
use delaunay_stl::io::NumberFormat;
use delaunay_stl::io::StlEncoding;
use delaunay_stl::io::WriteOptions;
use env_logger::Env;
use log::info;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Cli {
    #[arg(help = "CSV file with x, y, z in its first three columns")]
    input: PathBuf,
    #[arg(help = "STL file to write")]
    output: PathBuf,
    #[arg(
        long = "delimiter",
        short = 'd',
        default_value = ",",
        value_parser = parse_delimiter,
        help = "field delimiter, a single ASCII character"
    )]
    delimiter: u8,
    #[arg(
        long = "precision",
        short = 'p',
        help = "write numbers in scientific notation with this many fractional digits"
    )]
    precision: Option<usize>,
    #[arg(long = "binary", short = 'b', help = "write binary STL")]
    binary: bool,
}

impl From<&Cli> for Options {
    fn from(args: &Cli) -> Self {
        Self {
            load: LoadOptions {
                delimiter: args.delimiter,
            },
            write: WriteOptions {
                encoding: if args.binary {
                    StlEncoding::Binary
                } else {
                    StlEncoding::Ascii
                },
                numbers: args
                    .precision
                    .map_or(NumberFormat::Shortest, NumberFormat::Scientific),
            },
        }
    }
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    let unescaped = if value == "\\t" { "\t" } else { value };
    match unescaped.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(format!("expected one ASCII character, got {value:?}")),
    }
}

fn report(error: &Error) {
    eprintln!("Error: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

fn main() -> ExitCode {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    info!("starting up");

    let args = Cli::parse();
    let options = Options::from(&args);

    match convert(&args.input, &args.output, &options) {
        Ok(summary) => {
            info!(
                "{} points, {} rows dropped, {} facets",
                summary.points, summary.dropped_rows, summary.facets
            );
            println!("STL file saved to {}", args.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

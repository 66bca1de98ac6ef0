//! asmfix: Hi-C guided assembly correction
//!
//! Usage: asmfix <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

use asmfix::assembly::{remove_blank_lines, AssemblyDocument, ContigLocation};
use asmfix::config::{self, SearchConfig, DEFAULT_EXCLUSION_PADDING, DEFAULT_PEAK_PERCENTILE};
use asmfix::hic::dump::DEFAULT_MAX_EXTENT;
use asmfix::hic::DumpContacts;
use asmfix::pipeline::{ClassFilter, PipelineError, Rectifier};
use asmfix::InsertSide;

#[derive(Parser)]
#[command(name = "asmfix")]
#[command(version)]
#[command(about = "Correct translocations, inversions and debris in Juicebox assemblies using Hi-C contacts", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the contig count and total length
    Info {
        /// Input assembly file
        assembly: PathBuf,
    },

    /// Print where a contig sits in the document
    Locate {
        /// Input assembly file
        assembly: PathBuf,

        /// Contig name (with or without the leading '>')
        #[arg(short, long)]
        name: Option<String>,

        /// Contig order
        #[arg(short, long)]
        order: Option<u32>,
    },

    /// List the contigs selected by a document range
    Range {
        /// Input assembly file
        assembly: PathBuf,

        /// Range start (document coordinates)
        start: u64,

        /// Range end (document coordinates)
        end: u64,
    },

    /// Cut a contig at one or two document positions
    Cut {
        /// Input assembly file
        assembly: PathBuf,

        /// Contig to cut
        #[arg(short, long)]
        contig: String,

        /// Cut site (document coordinates)
        #[arg(short, long)]
        site: u64,

        /// Second cut site, for a cut into three pieces
        #[arg(long)]
        site2: Option<u64>,

        /// Output assembly file
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Flip the orientation of contigs
    Invert {
        /// Input assembly file
        assembly: PathBuf,

        /// Contigs to invert
        #[arg(short, long, num_args = 1.., required = true)]
        contigs: Vec<String>,

        /// Output assembly file
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Move contigs next to an anchor contig
    Move {
        /// Input assembly file
        assembly: PathBuf,

        /// Contigs to move, in their final order
        #[arg(short, long, num_args = 1.., required = true)]
        contigs: Vec<String>,

        /// Anchor contig
        #[arg(short, long)]
        anchor: String,

        /// Side of the anchor to insert at (left or right)
        #[arg(short, long, default_value = "right")]
        side: InsertSide,

        /// Output assembly file
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Move contigs into a trailing debris scaffold
    Debris {
        /// Input assembly file
        assembly: PathBuf,

        /// Contigs to relocate
        #[arg(short, long, num_args = 1.., required = true)]
        contigs: Vec<String>,

        /// Output assembly file
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Remove blank lines from an assembly file
    Clean {
        /// Input assembly file
        assembly: PathBuf,

        /// Output file (default: <stem>_corrected.assembly next to the input)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Correct an assembly from error queues and contact dumps
    Rectify {
        /// Input assembly file
        assembly: PathBuf,

        /// Directory holding translocation/inversion/debris_error.json
        #[arg(short, long)]
        errors: PathBuf,

        /// Contact dump per resolution, as RESOLUTION=PATH
        #[arg(long, num_args = 1.., required = true, value_parser = parse_contact_layer)]
        contacts: Vec<(u64, PathBuf)>,

        /// Document units per matrix unit
        #[arg(short, long, value_parser = parse_ratio)]
        ratio: f64,

        /// Output assembly file
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Largest number of bins per contact fetch
        #[arg(long, default_value_t = DEFAULT_MAX_EXTENT)]
        max_extent_bins: u64,

        /// Per-row percentile used as the peak threshold
        #[arg(long, default_value_t = DEFAULT_PEAK_PERCENTILE)]
        percentile: f64,

        /// Bins excluded around the error region itself
        #[arg(long, default_value_t = DEFAULT_EXCLUSION_PADDING)]
        padding: u64,

        /// Skip translocation errors
        #[arg(long)]
        no_translocation: bool,

        /// Skip inversion errors
        #[arg(long)]
        no_inversion: bool,

        /// Skip debris errors
        #[arg(long)]
        no_debris: bool,

        /// Fetch contact tiles one at a time
        #[arg(long)]
        serial: bool,
    },
}

fn parse_contact_layer(s: &str) -> Result<(u64, PathBuf), String> {
    let (res, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected RESOLUTION=PATH, got '{}'", s))?;
    let res: u64 = res
        .trim()
        .parse()
        .map_err(|_| format!("invalid resolution '{}'", res))?;
    if res == 0 {
        return Err("resolution must be positive".to_string());
    }
    Ok((res, PathBuf::from(path)))
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(r) if r.is_finite() && r > 0.0 => Ok(r),
        _ => Err(format!("ratio must be a positive number, got '{}'", s)),
    }
}

fn main() {
    let cli = Cli::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(cli.verbose.log_level_filter().as_trace())
            .with_writer(io::stderr)
            .init(),
    };

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Info { assembly } => run_info(&assembly),
        Commands::Locate {
            assembly,
            name,
            order,
        } => run_locate(&assembly, name.as_deref(), order),
        Commands::Range {
            assembly,
            start,
            end,
        } => run_range(&assembly, start, end),
        Commands::Cut {
            assembly,
            contig,
            site,
            site2,
            output,
        } => run_cut(&assembly, &contig, site, site2, &output),
        Commands::Invert {
            assembly,
            contigs,
            output,
        } => run_invert(&assembly, &contigs, &output),
        Commands::Move {
            assembly,
            contigs,
            anchor,
            side,
            output,
        } => run_move(&assembly, &contigs, &anchor, side, &output),
        Commands::Debris {
            assembly,
            contigs,
            output,
        } => run_debris(&assembly, &contigs, &output),
        Commands::Clean { assembly, output } => run_clean(&assembly, output.as_deref()),
        Commands::Rectify {
            assembly,
            errors,
            contacts,
            ratio,
            output,
            max_extent_bins,
            percentile,
            padding,
            no_translocation,
            no_inversion,
            no_debris,
            serial,
        } => {
            if serial {
                config::set_parallel_fetch(false);
            }
            let search = SearchConfig {
                peak_percentile: percentile,
                exclusion_padding: padding,
            };
            let classes = ClassFilter {
                translocation: !no_translocation,
                inversion: !no_inversion,
                debris: !no_debris,
            };
            run_rectify(
                &assembly,
                &errors,
                &contacts,
                ratio,
                &output,
                max_extent_bins,
                search,
                classes,
            )
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn write_location<W: Write>(out: &mut W, loc: &ContigLocation) -> io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        loc.name,
        loc.id,
        loc.orientation,
        loc.length,
        loc.span.start,
        loc.span.end,
        loc.scaffold + 1
    )
}

fn run_info(assembly: &Path) -> Result<(), PipelineError> {
    let doc = AssemblyDocument::from_path(assembly)?;
    let info = doc.info();
    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "contigs\t{}", info.contig_count)?;
    writeln!(out, "total_length\t{}", info.total_length)?;
    out.flush()?;
    Ok(())
}

fn run_locate(
    assembly: &Path,
    name: Option<&str>,
    order: Option<u32>,
) -> Result<(), PipelineError> {
    let doc = AssemblyDocument::from_path(assembly)?;
    let location = doc.locate(name, order)?;
    let mut out = BufWriter::new(io::stdout().lock());
    write_location(&mut out, &location)?;
    out.flush()?;
    Ok(())
}

fn run_range(assembly: &Path, start: u64, end: u64) -> Result<(), PipelineError> {
    let doc = AssemblyDocument::from_path(assembly)?;
    let mut out = BufWriter::new(io::stdout().lock());
    for location in doc.find_contigs_in_range(start, end) {
        write_location(&mut out, &location)?;
    }
    out.flush()?;
    Ok(())
}

fn run_cut(
    assembly: &Path,
    contig: &str,
    site: u64,
    site2: Option<u64>,
    output: &Path,
) -> Result<(), PipelineError> {
    let doc = AssemblyDocument::from_path(assembly)?;
    let cut = match site2 {
        Some(site2) => doc.cut_at_two(contig, site, site2)?,
        None => doc.cut_at(contig, site)?,
    };
    cut.save(output)?;
    Ok(())
}

fn run_invert(assembly: &Path, contigs: &[String], output: &Path) -> Result<(), PipelineError> {
    let mut doc = AssemblyDocument::from_path(assembly)?;
    for name in contigs {
        doc = doc.invert(name)?;
    }
    doc.save(output)?;
    Ok(())
}

fn run_move(
    assembly: &Path,
    contigs: &[String],
    anchor: &str,
    side: InsertSide,
    output: &Path,
) -> Result<(), PipelineError> {
    let doc = AssemblyDocument::from_path(assembly)?;
    doc.move_contigs(contigs, anchor, side)?.save(output)?;
    Ok(())
}

fn run_debris(assembly: &Path, contigs: &[String], output: &Path) -> Result<(), PipelineError> {
    let doc = AssemblyDocument::from_path(assembly)?;
    doc.relocate_debris_to_tail(contigs)?.save(output)?;
    Ok(())
}

fn run_clean(assembly: &Path, output: Option<&Path>) -> Result<(), PipelineError> {
    let written = remove_blank_lines(assembly, output)?;
    println!("{}", written.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_rectify(
    assembly: &Path,
    errors: &Path,
    layers: &[(u64, PathBuf)],
    ratio: f64,
    output: &Path,
    max_extent_bins: u64,
    search: SearchConfig,
    classes: ClassFilter,
) -> Result<(), PipelineError> {
    let mut contacts = DumpContacts::new(max_extent_bins);
    for (resolution, path) in layers {
        contacts.load_layer(*resolution, path)?;
    }

    let report = Rectifier::new(&contacts, ratio)?
        .with_config(search)
        .with_classes(classes)
        .run(assembly, errors, output)?;

    eprintln!(
        "Corrected {} translocations, {} inversions, {} debris regions -> {}",
        report.translocations.len(),
        report.inversions.len(),
        report.debris.len(),
        output.display()
    );
    Ok(())
}

mod interactive;

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use cache_sim::{
    cache::DEFAULT_DBG_NAME,
    config::{LevelConfig, SimConfig},
    observer::LogObserver,
    sim::Simulator,
    trace::{self, TraceEvent},
};
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// replay a memory access trace
    Run(RunArgs),
    /// drive a cache by hand
    Interactive(InteractiveArgs),
    /// convert a text trace into binary records
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    /// Trace every cache access
    #[arg(long)]
    debug: bool,
}

#[derive(Args, Debug)]
struct GeometryArgs {
    /// Cache size in bytes (k/m/g suffixes allowed)
    #[arg(short, long, default_value = "8k", value_parser = parse_size)]
    size: u64,
    /// Block size in bytes (k/m/g suffixes allowed)
    #[arg(short, long, default_value = "64", value_parser = parse_size)]
    block_size: u64,
    /// Associativity
    #[arg(short, long, default_value_t = 1)]
    assoc: u64,
    /// Name of the cache in debug traces
    #[arg(long, default_value = DEFAULT_DBG_NAME)]
    name: String,
}

impl GeometryArgs {
    fn level_config(&self, debug: bool) -> LevelConfig {
        LevelConfig {
            name: self.name.clone(),
            size: self.size,
            block_size: self.block_size,
            assoc: self.assoc,
            debug,
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    #[command(flatten)]
    geometry: GeometryArgs,
    /// File path to the access trace
    #[arg(short, long)]
    trace: PathBuf,
    /// Trace is made of binary records instead of text lines
    #[arg(long)]
    binary: bool,
    /// File path to a JSON description of the cache hierarchy (overrides geometry flags)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print statistics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InteractiveArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    #[command(flatten)]
    geometry: GeometryArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// File path to input text trace
    #[arg(short, long)]
    input: PathBuf,
    /// File path to output binary trace
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Run(args) => run(args),
        Command::Interactive(InteractiveArgs {
            delegate: CommonArgs { verbose, debug },
            geometry,
        }) => {
            // the observer decides what is traced, not the filter
            init_logger(verbose, true);
            let mut sim = Simulator::from_config(&SimConfig::single(geometry.level_config(debug)))?;
            interactive::execute_interactive(&mut sim)
        }
        Command::Convert(ConvertArgs { input, output }) => {
            let events = read_trace(&input, false)?;
            let mut out = File::create(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            out.write_all(&trace::encode_binary(&events))?;
            Ok(())
        }
    }
}

fn run(
    RunArgs {
        delegate: CommonArgs { verbose, debug },
        geometry,
        trace,
        binary,
        config,
        json,
    }: RunArgs,
) -> Result<()> {
    let config = match config {
        Some(p) => {
            let file =
                File::open(&p).with_context(|| format!("failed to open {}", p.display()))?;
            SimConfig::deser(file)?
        }
        None => SimConfig::single(geometry.level_config(debug)),
    };
    init_logger(verbose, debug || config.debug_any());
    let mut sim = build_simulator(&config, debug)?;
    let events = read_trace(&trace, binary)?;
    log::info!("loaded {} accesses from {}.", events.len(), trace.display());
    let n = sim.run(events)?;
    log::info!("finished simulation of {n} accesses.");
    if json {
        println!("{}", serde_json::to_string_pretty(&sim.report()?)?);
    } else {
        output_stat(&sim)?;
    }
    Ok(())
}

/// `--debug` traces every level unless the configuration picked some.
fn build_simulator(config: &SimConfig, debug: bool) -> Result<Simulator> {
    let mut sim = Simulator::from_config(config)?;
    if debug && !config.debug_any() {
        sim.set_debug_logging(|name| Some(LogObserver::new(name)))?;
    }
    Ok(sim)
}

fn init_logger(verbose: bool, debug: bool) {
    let mut builder = if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    } else {
        env_logger::Builder::from_default_env()
    };
    if debug {
        builder.filter_module("cache_sim::dbg", log::LevelFilter::Debug);
    }
    builder.init();
}

#[cfg(not(feature = "stat"))]
fn output_stat(sim: &Simulator) -> Result<()> {
    for l in sim.report()? {
        println!("{}: {:?}", l.name, l.statistics);
    }
    Ok(())
}

#[cfg(feature = "stat")]
fn output_stat(sim: &Simulator) -> Result<()> {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    println!("{}", sim.collect_stat().view(max_width));
    Ok(())
}

#[cfg(feature = "stat")]
pub(crate) fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}

fn read_trace(path: &Path, binary: bool) -> Result<Vec<TraceEvent>> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    if binary {
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        trace::parse_binary(&buf)
    } else {
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        trace::parse_text(&buf)
    }
}

/// parses `64`, `0x40`, `32k`, `4M` and the like.
fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    let invalid = |e: std::num::ParseIntError| format!("invalid size `{s}`: {e}");
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_err(invalid);
    }
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => {
            let unit = match c.to_ascii_lowercase() {
                'k' => 1 << 10,
                'm' => 1 << 20,
                'g' => 1 << 30,
                _ => return Err(format!("unknown size suffix `{c}`")),
            };
            (&s[..i], unit)
        }
        _ => (s, 1),
    };
    let n = digits.parse::<u64>().map_err(invalid)?;
    n.checked_mul(unit)
        .ok_or_else(|| format!("size `{s}` does not fit in 64 bits"))
}

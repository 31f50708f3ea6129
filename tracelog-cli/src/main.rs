//! CLI for inspecting tracelog module dumps.
//!
//! Provides commands for summarizing, printing, describing, and diffing the
//! per-module record dumps the tracelog library reads and writes.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use tracelog::dump::MappedModule;
use tracelog::registry::{self, ModuleCodec, ModuleId, ModuleRecord};

/// tracelog — I/O-trace record dump inspector.
#[derive(Parser)]
#[command(name = "tracelog", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Display a dump's module, version, and record count.
    Info {
        /// Path to the dump file.
        file: PathBuf,
    },

    /// Print every record in a dump, one counter per line.
    Print {
        /// Path to the dump file.
        file: PathBuf,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the counter descriptions for a module.
    Describe {
        /// Module to describe.
        module: ModuleArg,
    },

    /// Print the record-by-record difference between two dumps.
    Diff {
        /// Path to the left dump file.
        file_a: PathBuf,

        /// Path to the right dump file.
        file_b: PathBuf,
    },
}

/// Output format for printed records.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Tab-separated counter lines.
    Text,
    /// JSON array of records.
    Json,
}

/// Module selector for `describe`.
#[derive(Clone, Copy, ValueEnum)]
enum ModuleArg {
    /// Buffered-stream I/O counters.
    Stdio,
    /// Lustre file layout records.
    Lustre,
}

impl From<ModuleArg> for ModuleId {
    fn from(arg: ModuleArg) -> Self {
        match arg {
            ModuleArg::Stdio => ModuleId::Stdio,
            ModuleArg::Lustre => ModuleId::Lustre,
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { file } => cmd_info(&file),
        Commands::Print { file, format } => cmd_print(&file, &format),
        Commands::Describe { module } => cmd_describe(module.into()),
        Commands::Diff { file_a, file_b } => cmd_diff(&file_a, &file_b),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Opens a dump and resolves its codec in one step.
fn open_dump(path: &Path) -> Result<(MappedModule, &'static dyn ModuleCodec), Box<dyn std::error::Error>> {
    let mapped = MappedModule::open(path)?;
    let codec = registry::lookup(mapped.module())?;
    debug!(
        path = %path.display(),
        module = codec.module().name(),
        version = mapped.version(),
        payload_bytes = mapped.payload_len(),
        "opened dump"
    );
    Ok((mapped, codec))
}

/// Decodes every record in a dump.
fn decode_all(
    mapped: &mut MappedModule,
    codec: &dyn ModuleCodec,
) -> Result<Vec<ModuleRecord>, Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    while let Some(rec) = codec.decode(mapped)? {
        records.push(rec);
    }
    debug!(count = records.len(), "decoded records");
    Ok(records)
}

/// Implements `tracelog info <file>`.
fn cmd_info(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (mut mapped, codec) = open_dump(file)?;

    println!("Dump: {}", file.display());
    println!("  Module: {} (id {})", codec.module().name(), mapped.module());
    println!("  Format version: {}", mapped.version());
    println!("  Payload: {} bytes", mapped.payload_len());

    let records = decode_all(&mut mapped, codec)?;
    println!("  Records: {}", records.len());

    let ranks: std::collections::BTreeSet<i64> =
        records.iter().map(|rec| rec.base().rank).collect();
    if !ranks.is_empty() {
        let rank_list: Vec<String> = ranks.iter().map(ToString::to_string).collect();
        println!("  Ranks: {}", rank_list.join(", "));
    }

    Ok(())
}

/// Implements `tracelog print <file>`.
fn cmd_print(file: &Path, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let (mut mapped, codec) = open_dump(file)?;
    let records = decode_all(&mut mapped, codec)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Text => {
            codec.describe(&mut out)?;
            writeln!(out)?;
            for rec in &records {
                codec.print(rec, &mut out)?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
        }
    }

    Ok(())
}

/// Implements `tracelog describe <module>`.
fn cmd_describe(module: ModuleId) -> Result<(), Box<dyn std::error::Error>> {
    let codec = registry::lookup(module.raw())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    codec.describe(&mut out)?;
    Ok(())
}

/// Implements `tracelog diff <file_a> <file_b>`.
///
/// Records are matched across files by their identity pair; unmatched
/// records diff against nothing and print in full.
fn cmd_diff(file_a: &Path, file_b: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (mut mapped_a, codec) = open_dump(file_a)?;
    let (mut mapped_b, codec_b) = open_dump(file_b)?;

    if codec.module() != codec_b.module() {
        return Err(format!(
            "cannot diff a {} dump against a {} dump",
            codec.module().name(),
            codec_b.module().name()
        )
        .into());
    }

    let by_identity = |records: Vec<ModuleRecord>| -> BTreeMap<(u64, i64), ModuleRecord> {
        records
            .into_iter()
            .map(|rec| ((rec.base().id, rec.base().rank), rec))
            .collect()
    };
    let left = by_identity(decode_all(&mut mapped_a, codec)?);
    let right = by_identity(decode_all(&mut mapped_b, codec)?);

    let keys: std::collections::BTreeSet<_> = left.keys().chain(right.keys()).copied().collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for key in keys {
        codec.diff(left.get(&key), right.get(&key), &mut out)?;
    }

    Ok(())
}

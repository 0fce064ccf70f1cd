use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use log::{debug, info, LevelFilter};

use vmil_translator::{translate_units, Options};

/// Translate VM code into Hack assembly.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// A `.vm` file, or a directory searched recursively for them
    path: PathBuf,

    /// Print the assembly to stdout instead of writing a file
    #[arg(short, long)]
    print: bool,

    /// Output file (default: next to the input)
    #[arg(short, long, conflicts_with = "print")]
    output: Option<PathBuf>,

    /// Leave out the stack setup and the jump to the entry function
    #[arg(long)]
    no_bootstrap: bool,

    /// Don't echo VM commands as comments
    #[arg(long)]
    no_comments: bool,

    /// Function the bootstrap jumps to
    #[arg(long, default_value = "Sys.init")]
    entry: String,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            bootstrap: !self.no_bootstrap,
            comments: !self.no_comments,
            entry: self.entry.clone(),
            ..Options::default()
        }
    }
}

fn is_vm(path: &Path) -> bool {
    path.extension().and_then(OsStr::to_str) == Some("vm")
}

fn find_vm_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            find_vm_files(&path, found)?;
        } else if is_vm(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// Every source file as (unit name, text), in a stable order.
fn read_sources(path: &Path) -> Result<Vec<(String, String)>> {
    let files = if path.is_dir() {
        let mut found = vec![];
        find_vm_files(path, &mut found)?;
        found.sort();
        if found.is_empty() {
            bail!("No .vm files in {}", path.display());
        }
        found
    } else if is_vm(path) {
        vec![path.to_path_buf()]
    } else {
        bail!("Expected a .vm file or a directory, got {}", path.display());
    };

    files
        .into_iter()
        .map(|file| {
            let name = file
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("unnamed")
                .to_string();
            let data = fs::read_to_string(&file)
                .with_context(|| format!("Error while reading file: {}", file.display()))?;
            debug!("read {} ({} bytes)", file.display(), data.len());
            Ok((name, data))
        })
        .collect()
}

/// `Foo.vm` -> `Foo.asm`; `Dir/` -> `Dir/Dir.asm`.
fn default_output(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        let dir = fs::canonicalize(path)
            .with_context(|| format!("Resolving {}", path.display()))?;
        let name = dir.file_name().and_then(OsStr::to_str).unwrap_or("out");
        Ok(dir.join(format!("{}.asm", name)))
    } else {
        Ok(path.with_extension("asm"))
    }
}

fn write_lines<W: Write>(out: W, lines: &[String]) -> io::Result<()> {
    let mut out = BufWriter::new(out);
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let sources = read_sources(&cli.path)?;
    let translation = translate_units(
        sources.iter().map(|(name, data)| (name.as_str(), data.as_str())),
        cli.options(),
    )
    .with_context(|| format!("Translating {}", cli.path.display()))?;
    info!(
        "translated {} unit(s) into {} lines",
        sources.len(),
        translation.len()
    );

    if cli.print {
        return write_lines(io::stdout().lock(), &translation).context("Writing to stdout");
    }

    let outfilename = match &cli.output {
        Some(path) => path.clone(),
        None => default_output(&cli.path)?,
    };
    let outfile = File::create(&outfilename)
        .with_context(|| format!("Creating {}", outfilename.display()))?;
    write_lines(outfile, &translation)
        .with_context(|| format!("Writing {}", outfilename.display()))?;
    info!("wrote {}", outfilename.display());

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use span_patcher::script::{load_from_path, EditScript};
use span_patcher::write_atomic;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "span-patcher")]
#[command(about = "Apply positional byte edits with conflict detection", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an edit script to an input file
    Apply {
        /// Edit script (TOML)
        #[arg(short, long)]
        script: PathBuf,

        /// Input file; never modified unless also given as --output
        #[arg(short, long)]
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dry run - validate and report without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Validate an edit script against an input file without applying it
    Check {
        /// Edit script (TOML)
        #[arg(short, long)]
        script: PathBuf,

        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List the edits recorded by a script
    List {
        /// Edit script (TOML)
        #[arg(short, long)]
        script: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            script,
            input,
            output,
            dry_run,
            diff,
        } => cmd_apply(&script, &input, output.as_deref(), dry_run, diff),

        Commands::Check { script, input } => cmd_check(&script, &input),

        Commands::List { script } => cmd_list(&script),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_script_and_input(script: &Path, input: &Path) -> Result<(EditScript, Vec<u8>)> {
    let script = load_from_path(script)?;
    let data =
        fs::read(input).with_context(|| format!("failed to read input {}", input.display()))?;
    script
        .meta
        .verify_input(&data)
        .with_context(|| format!("input {} rejected by script guard", input.display()))?;
    Ok((script, data))
}

fn cmd_apply(
    script_path: &Path,
    input_path: &Path,
    output_path: Option<&Path>,
    dry_run: bool,
    diff: bool,
) -> Result<()> {
    let (script, input) = load_script_and_input(script_path, input_path)?;
    let patcher = script.to_patcher();
    let output = patcher
        .apply(&input)
        .with_context(|| format!("cannot apply {}", script_path.display()))?;

    if diff {
        display_diff(
            input_path,
            &String::from_utf8_lossy(&input),
            &String::from_utf8_lossy(&output),
        );
    }

    if dry_run {
        println!(
            "{} Would apply {} edit(s) to {} ({} -> {} bytes)",
            "✓".green(),
            patcher.len(),
            input_path.display(),
            input.len(),
            output.len()
        );
        return Ok(());
    }

    match output_path {
        Some(path) => {
            write_atomic(path, &output)?;
            println!(
                "{} Applied {} edit(s): {} -> {}",
                "✓".green(),
                patcher.len(),
                input_path.display(),
                path.display()
            );
        }
        None if diff => {}
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn cmd_check(script_path: &Path, input_path: &Path) -> Result<()> {
    let (script, input) = load_script_and_input(script_path, input_path)?;
    let patcher = script.to_patcher();

    if let Err(err) = patcher.check(input.len()) {
        eprintln!("{} {}: {}", "✗".red(), script_path.display(), err);
        anyhow::bail!("edit script does not apply to {}", input_path.display());
    }

    println!(
        "{} {} edit(s) valid for {} ({} bytes)",
        "✓".green(),
        patcher.len(),
        input_path.display(),
        input.len()
    );
    Ok(())
}

fn cmd_list(script_path: &Path) -> Result<()> {
    let script = load_from_path(script_path)?;
    let patcher = script.to_patcher();

    let name = if script.meta.name.is_empty() {
        script_path.display().to_string()
    } else {
        script.meta.name.clone()
    };
    println!("{}", name.bold());
    if let Some(description) = &script.meta.description {
        println!("{}", description.dimmed());
    }

    for (index, patch) in patcher.iter().enumerate() {
        println!("  {:>3}  {}", index, patch);
    }
    println!("{} edit(s)", patcher.len());
    Ok(())
}

/// Helper: Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

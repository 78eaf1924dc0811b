use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use confusion::{
    AnalysisConfig, Record, TokenMode, align_records, read_records, read_records_from_path,
    render_alignment, render_json, render_text, summarize, write_report_files,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Compare character by character
    Chars,
    /// Compare whitespace-separated words
    Words,
}

impl From<ModeArg> for TokenMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Chars => TokenMode::Chars,
            ModeArg::Words => TokenMode::Words,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Rank substitution, deletion and insertion errors of hypotheses against references
#[derive(Debug, Parser)]
#[command(name = "confusion")]
#[command(version)]
pub struct Cli {
    /// Tab-separated records (`id<TAB>reference<TAB>hypothesis`), `-` for stdin
    pub input: PathBuf,

    /// JSON config file (default: <config dir>/confusion/config.json when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Token unit
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Fold case before comparing
    #[arg(long, overrides_with = "no_lowercase")]
    pub lowercase: bool,

    /// Compare case-sensitively even if the config file folds case
    #[arg(long, overrides_with = "lowercase")]
    pub no_lowercase: bool,

    /// Entries shown per category
    #[arg(long, conflicts_with = "all")]
    pub top: Option<usize>,

    /// Show every entry of every category
    #[arg(long)]
    pub all: bool,

    /// Console output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write substitutions.tsv, deletions.tsv, insertions.tsv and summary.json here
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Align records on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Skip records with too few fields instead of failing
    #[arg(long)]
    pub skip_malformed: bool,

    /// Skip records whose alignment table would exceed this many cells
    #[arg(long)]
    pub max_cells: Option<usize>,

    /// Print the alignment of every record before the report
    #[arg(long)]
    pub show_alignments: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("confusion").join("config.json"))
}

/// Config file (explicit or default location) with command-line overrides applied
pub fn resolve_config(cli: &Cli) -> anyhow::Result<AnalysisConfig> {
    resolve_config_with_default(cli, default_config_path())
}

fn resolve_config_with_default(
    cli: &Cli,
    default_path: Option<PathBuf>,
) -> anyhow::Result<AnalysisConfig> {
    let mut config = match (&cli.config, default_path) {
        (Some(path), _) => load_config(path)?,
        (None, Some(path)) if path.is_file() => {
            debug!("Using config file {}", path.display());
            load_config(&path)?
        }
        _ => AnalysisConfig::default(),
    };

    if let Some(mode) = cli.mode {
        config.token_mode = mode.into();
    }
    if cli.lowercase {
        config.lowercase = true;
    } else if cli.no_lowercase {
        config.lowercase = false;
    }
    if cli.all {
        config.top_n = None;
    } else if let Some(top) = cli.top {
        config.top_n = Some(top);
    }
    if cli.parallel {
        config.parallel = true;
    }
    if cli.skip_malformed {
        config.skip_malformed = true;
    }
    if let Some(max_cells) = cli.max_cells {
        config.max_matrix_cells = Some(max_cells);
    }

    config.validate()?;
    Ok(config)
}

fn load_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    AnalysisConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn load_records(cli: &Cli, config: &AnalysisConfig) -> anyhow::Result<Vec<Record>> {
    let format = config.record_format();
    if cli.input.as_os_str() == "-" {
        read_records(io::stdin().lock(), &format).context("failed to read records from stdin")
    } else {
        read_records_from_path(&cli.input, &format)
            .with_context(|| format!("failed to read records from {}", cli.input.display()))
    }
}

/// Run one analysis, writing console output to `out`
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    run_with_config(cli, &config, out)
}

fn run_with_config<W: Write>(cli: &Cli, config: &AnalysisConfig, out: &mut W) -> anyhow::Result<()> {
    let records = load_records(cli, config)?;
    info!(
        "Loaded {} records from {} ({} mode)",
        records.len(),
        cli.input.display(),
        config.token_mode
    );

    let batch = align_records(&records, config);

    if cli.show_alignments {
        for record in &batch.aligned {
            match &record.id {
                Some(id) => writeln!(out, "# line {} ({})", record.line, id)?,
                None => writeln!(out, "# line {}", record.line)?,
            }
            write!(out, "{}", render_alignment(&record.pair))?;
        }
        writeln!(out)?;
    }

    let report = summarize(&batch);

    match cli.format {
        OutputFormat::Text => write!(out, "{}", render_text(&report, config.top_n))?,
        OutputFormat::Json => writeln!(out, "{}", render_json(&report, config.top_n)?)?,
    }

    if let Some(dir) = &cli.output_dir {
        let written = write_report_files(dir, &report, config.top_n)
            .with_context(|| format!("failed to write results to {}", dir.display()))?;
        debug!("Wrote {} files", written.len());
    }

    Ok(())
}

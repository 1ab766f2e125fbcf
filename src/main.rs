//! # Charset Translator CLI
//!
//! Command-line front-end translating files or standard streams between
//! character encodings.

#[cfg(feature = "cli")]
use std::fs::{self, File};
#[cfg(feature = "cli")]
use std::io::{self, BufWriter, Read, Write};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use anyhow::{Context, Result, bail};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use serde::Serialize;

#[cfg(feature = "cli")]
use charset_translator::{
    Charset, Error as TranslateError, Registry, Translation, TranslatorConfig,
};

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

/// Translate byte streams between character encodings
#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "charset-translator")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Translate a file from one encoding to another
    Convert(ConvertArgs),

    /// List all supported encodings
    List(ListArgs),

    /// Display information about an encoding
    Info(InfoArgs),
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ConvertArgs {
    /// Source encoding
    #[arg(short = 'f', long = "from")]
    from: Option<String>,

    /// Target encoding
    #[arg(short = 't', long = "to")]
    to: Option<String>,

    /// Input file (stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write unmappable characters as XML numeric character references
    #[arg(short = 'x', long = "xml-char-refs")]
    xml_char_refs: bool,

    /// Characters decoded per chunk
    #[arg(long)]
    buffer_size: Option<usize>,

    /// JSON translator configuration; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep the partial output file when translation fails
    #[arg(long, requires = "output")]
    keep_partial: bool,

    /// Overwrite the output file if it already exists
    #[arg(long, requires = "output")]
    force: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ListArgs {
    /// Show only ASCII-compatible encodings
    #[arg(long)]
    ascii_compatible: bool,

    /// Show encoding details
    #[arg(long)]
    details: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct InfoArgs {
    /// Encoding to describe
    encoding: String,
}

#[cfg(feature = "cli")]
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ConversionResult<'a> {
    translator: String,
    config: &'a TranslatorConfig,
    #[serde(flatten)]
    translation: Translation,
    processing_time_ms: u64,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct EncodingInfo {
    name: &'static str,
    ascii_compatible: bool,
    unicode: bool,
    bom: Option<String>,
}

#[cfg(feature = "cli")]
impl From<Charset> for EncodingInfo {
    fn from(charset: Charset) -> Self {
        Self {
            name: charset.name(),
            ascii_compatible: charset.is_ascii_compatible(),
            unicode: charset.is_unicode(),
            bom: charset.bom().map(|bom| format!("{:02X?}", bom)),
        }
    }
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert(ref args) => convert_command(args, &cli)?,
        Commands::List(ref args) => list_command(args, &cli)?,
        Commands::Info(ref args) => info_command(args, &cli)?,
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Merge the optional config file with command-line flags.
#[cfg(feature = "cli")]
fn resolve_config(args: &ConvertArgs) -> Result<TranslatorConfig> {
    let file_config = match args.config {
        Some(ref path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: TranslatorConfig = serde_json::from_str(&text)
                .with_context(|| format!("Invalid config file: {}", path.display()))?;
            Some(config)
        }
        None => None,
    };

    let source = args
        .from
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.source_encoding.clone()))
        .context("Source encoding not given (use --from or --config)")?;
    let target = args
        .to
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.target_encoding.clone()))
        .context("Target encoding not given (use --to or --config)")?;

    let mut config = TranslatorConfig::new(source, target);
    if let Some(ref file_config) = file_config {
        config.reference_substitution = file_config.reference_substitution;
        config.buffer_size = file_config.buffer_size;
    }
    if args.xml_char_refs {
        config.reference_substitution = true;
    }
    if args.buffer_size.is_some() {
        config.buffer_size = args.buffer_size;
    }
    Ok(config)
}

/// One-line explanation of a failed translation for the user
#[cfg(feature = "cli")]
fn describe_failure(err: &TranslateError) -> &'static str {
    match err {
        _ if err.is_cancelled() => "Translation was interrupted",
        TranslateError::MalformedInput { .. } => {
            "Input is not valid in the source encoding (wrong --from?)"
        }
        TranslateError::UnmappableCharacter { .. } => {
            "Input contains characters the target encoding cannot represent (try --xml-char-refs)"
        }
        TranslateError::ReadFailure(_) => "Failed to read input",
        TranslateError::WriteFailure(_) => "Failed to write output",
        _ => "Invalid translator configuration",
    }
}

#[cfg(feature = "cli")]
fn convert_command(args: &ConvertArgs, cli: &Cli) -> Result<()> {
    let start_time = std::time::Instant::now();

    let config = resolve_config(args)?;
    let translator = config.build().with_context(|| {
        format!(
            "Failed to create translator from {} to {}",
            config.source_encoding, config.target_encoding
        )
    })?;

    if cli.verbose {
        eprintln!("Translating {}", translator);
    }

    if let Some(ref output_path) = args.output {
        check_output(args.input.as_deref(), output_path, args.force)?;
    }

    let stdin = io::stdin();
    let mut reader: Box<dyn Read> = match args.input {
        Some(ref input_path) => Box::new(File::open(input_path).with_context(|| {
            format!("Failed to open input file: {}", input_path.display())
        })?),
        None => Box::new(stdin.lock()),
    };

    let stdout = io::stdout();
    let mut writer: Box<dyn Write> = match args.output {
        Some(ref output_path) => Box::new(BufWriter::new(File::create(output_path).with_context(
            || format!("Failed to create output file: {}", output_path.display()),
        )?)),
        None => Box::new(BufWriter::new(stdout.lock())),
    };

    let translation = match translator.translate(&mut *reader, &mut *writer) {
        Ok(translation) => translation,
        Err(err) => {
            drop(writer);
            if let Some(ref output_path) = args.output {
                if !args.keep_partial {
                    discard_partial(output_path);
                }
            }
            let summary = describe_failure(&err);
            return Err(anyhow::Error::new(err).context(summary));
        }
    };

    let processing_time = start_time.elapsed();

    if cli.verbose {
        eprintln!(
            "Processed {} bytes -> {} bytes ({} references) in {:?}",
            translation.bytes_read,
            translation.bytes_written,
            translation.substitutions,
            processing_time
        );
    }

    match cli.format {
        OutputFormat::Json => {
            let result = ConversionResult {
                translator: translator.to_string(),
                config: &config,
                translation,
                processing_time_ms: processing_time.as_millis() as u64,
            };
            let report = serde_json::to_string_pretty(&result)?;
            // Keep the report out of translated data written to stdout
            if args.output.is_some() {
                println!("{}", report);
            } else {
                eprintln!("{}", report);
            }
        }
        OutputFormat::Text => {
            if cli.verbose {
                eprintln!("✓ Translation completed successfully");
            }
        }
    }

    Ok(())
}

/// Refuse an output path that is the input itself, or an existing file
/// unless `force` is set. Runs before the output is created, since creating
/// it truncates.
#[cfg(feature = "cli")]
fn check_output(input: Option<&Path>, output: &Path, force: bool) -> Result<()> {
    if let Some(input) = input {
        let input = fs::canonicalize(input)
            .with_context(|| format!("Failed to open input file: {}", input.display()))?;
        if fs::canonicalize(output).is_ok_and(|output| output == input) {
            bail!(
                "Input and output are the same file: {}",
                input.display()
            );
        }
    }
    if !force && output.exists() {
        bail!(
            "Output file already exists: {} (use --force to overwrite)",
            output.display()
        );
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed partial output {}", path.display()),
        Err(err) => log::warn!("could not remove partial output {}: {}", path.display(), err),
    }
}

#[cfg(feature = "cli")]
fn list_command(args: &ListArgs, cli: &Cli) -> Result<()> {
    let charsets: Vec<Charset> = Registry::available()
        .into_iter()
        .filter(|charset| !args.ascii_compatible || charset.is_ascii_compatible())
        .collect();

    match cli.format {
        OutputFormat::Json => {
            let infos: Vec<EncodingInfo> = charsets.into_iter().map(EncodingInfo::from).collect();
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
        OutputFormat::Text => {
            println!("Supported Encodings ({} total):", charsets.len());
            println!();

            for charset in charsets {
                println!("{}", charset.name());

                if args.details {
                    print_details(charset, "    ");
                    println!();
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn info_command(args: &InfoArgs, cli: &Cli) -> Result<()> {
    let charset = Charset::for_name(&args.encoding)
        .with_context(|| format!("Cannot describe encoding {:?}", args.encoding))?;

    match cli.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&EncodingInfo::from(charset))?
            );
        }
        OutputFormat::Text => {
            println!("Encoding Information: {}", charset.name());
            print_details(charset, "");
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn print_details(charset: Charset, indent: &str) {
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
    println!(
        "{}ASCII Compatible: {}",
        indent,
        yes_no(charset.is_ascii_compatible())
    );
    println!("{}Full Unicode: {}", indent, yes_no(charset.is_unicode()));
    match charset.bom() {
        Some(bom) => println!("{}BOM: {:02X?}", indent, bom),
        None => println!("{}BOM: None", indent),
    }
}

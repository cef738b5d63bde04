use clap::{Args, Parser, Subcommand, ValueEnum};
use questionnaire_risk::config::{AppConfig, ExtractionConfig};
use questionnaire_risk::error::AppError;
use questionnaire_risk::telemetry;
use questionnaire_risk::workflows::questionnaire::{
    BatchDriver, BatchOptions, BatchSummary, FieldSource, InputFormat, PdfFormReader,
    ReferenceData,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "questionnaire-risk",
    about = "Extract filled questionnaire PDFs into risk-scored spreadsheet reports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a document or a folder of documents (default command)
    Extract(ExtractArgs),
    /// Print the raw form fields of a single PDF as JSON
    Fields(FieldsArgs),
}

#[derive(Args, Debug, Default)]
struct ExtractArgs {
    /// Document or folder of documents to process
    #[arg(long)]
    input: Option<PathBuf>,
    /// Field metadata file (.json field info or .csv items table)
    #[arg(long)]
    fields: Option<PathBuf>,
    /// Risk profile JSON file
    #[arg(long)]
    risk_profile: Option<PathBuf>,
    /// Folder receiving per-document and master reports
    #[arg(long)]
    output: Option<PathBuf>,
    /// Kind of input documents
    #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
    format: FormatArg,
    /// Display text of the field holding the respondent identifier
    #[arg(long)]
    identifier_label: Option<String>,
}

#[derive(Args, Debug)]
struct FieldsArgs {
    /// PDF to inspect
    #[arg(long)]
    input: PathBuf,
    /// Write the JSON here instead of standard output
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FormatArg {
    /// Filled PDF forms
    #[default]
    Pdf,
    /// JSON field dumps written by the `fields` command
    Json,
}

impl From<FormatArg> for InputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Pdf => InputFormat::Pdf,
            FormatArg::Json => InputFormat::FieldDump,
        }
    }
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Extract(ExtractArgs::default()));

    match command {
        Command::Extract(args) => run_extract(args),
        Command::Fields(args) => run_fields(args),
    }
}

fn run_extract(args: ExtractArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    let format = InputFormat::from(args.format);
    apply_overrides(&mut config.extraction, args);
    let paths = config.extraction.required_paths()?;

    telemetry::init(&config.telemetry)?;
    info!(?config.environment, input = %paths.input.display(), "questionnaire extraction starting");

    let reference = ReferenceData::load(&paths.field_info, &paths.risk_profile)?;
    let source = format.source();
    let options = BatchOptions::new(paths.output_dir)
        .with_identifier_label(config.extraction.identifier_label.clone());
    let driver = BatchDriver::new(&reference, source.as_ref(), options);

    let summary = driver.run(&paths.input)?;
    render_summary(&summary);
    Ok(())
}

fn apply_overrides(extraction: &mut ExtractionConfig, args: ExtractArgs) {
    let ExtractArgs {
        input,
        fields,
        risk_profile,
        output,
        format: _,
        identifier_label,
    } = args;

    if input.is_some() {
        extraction.input = input;
    }
    if fields.is_some() {
        extraction.field_info = fields;
    }
    if risk_profile.is_some() {
        extraction.risk_profile = risk_profile;
    }
    if output.is_some() {
        extraction.output_dir = output;
    }
    if let Some(label) = identifier_label.filter(|label| !label.trim().is_empty()) {
        extraction.identifier_label = label;
    }
}

fn run_fields(args: FieldsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let fields = PdfFormReader.read_fields(&args.input)?;
    let json = serde_json::to_string_pretty(&fields)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!(fields = fields.len(), path = %path.display(), "field dump written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn render_summary(summary: &BatchSummary) {
    println!("Questionnaire extraction {}", summary.batch_timestamp);
    println!(
        "Processed {} of {} document(s) into {}",
        summary.processed,
        summary.total,
        summary.output_dir.display()
    );
    println!(
        "Master tables: {}, {}",
        summary.master_files.scored_csv.display(),
        summary.master_files.raw_csv.display()
    );

    if summary.failed.is_empty() {
        println!("Not processed: none");
    } else {
        println!(
            "\nNot processed ({}), listed in {}",
            summary.failed.len(),
            summary.master_files.not_processed_csv.display()
        );
        for failure in &summary.failed {
            println!("- {}: {}", failure.path.display(), failure.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questionnaire_risk::workflows::questionnaire::DEFAULT_IDENTIFIER_LABEL;

    fn empty_extraction() -> ExtractionConfig {
        ExtractionConfig {
            input: Some(PathBuf::from("env-input")),
            field_info: None,
            risk_profile: Some(PathBuf::from("env-risk.json")),
            output_dir: None,
            identifier_label: DEFAULT_IDENTIFIER_LABEL.to_string(),
        }
    }

    #[test]
    fn extract_is_the_default_command() {
        let cli = Cli::try_parse_from(["questionnaire-risk"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn extract_flags_parse() {
        let cli = Cli::try_parse_from([
            "questionnaire-risk",
            "extract",
            "--input",
            "docs",
            "--fields",
            "items.csv",
            "--format",
            "json",
            "--identifier-label",
            "Vendor ID",
        ])
        .expect("parses");

        let Some(Command::Extract(args)) = cli.command else {
            panic!("expected extract command");
        };
        assert_eq!(args.input, Some(PathBuf::from("docs")));
        assert_eq!(args.fields, Some(PathBuf::from("items.csv")));
        assert_eq!(args.format, FormatArg::Json);
        assert_eq!(InputFormat::from(args.format), InputFormat::FieldDump);
        assert_eq!(args.identifier_label.as_deref(), Some("Vendor ID"));
    }

    #[test]
    fn command_line_values_override_environment() {
        let mut extraction = empty_extraction();
        apply_overrides(
            &mut extraction,
            ExtractArgs {
                fields: Some(PathBuf::from("cli-items.json")),
                output: Some(PathBuf::from("cli-out")),
                identifier_label: Some("  ".to_string()),
                ..ExtractArgs::default()
            },
        );

        assert_eq!(extraction.input, Some(PathBuf::from("env-input")));
        assert_eq!(extraction.field_info, Some(PathBuf::from("cli-items.json")));
        assert_eq!(extraction.risk_profile, Some(PathBuf::from("env-risk.json")));
        assert_eq!(extraction.output_dir, Some(PathBuf::from("cli-out")));
        assert_eq!(extraction.identifier_label, DEFAULT_IDENTIFIER_LABEL);
    }

    #[test]
    fn fields_command_requires_input() {
        assert!(Cli::try_parse_from(["questionnaire-risk", "fields"]).is_err());
        let cli = Cli::try_parse_from(["questionnaire-risk", "fields", "--input", "form.pdf"])
            .expect("parses");
        assert!(matches!(cli.command, Some(Command::Fields(_))));
    }
}

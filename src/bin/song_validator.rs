use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use song_validator::app::{App, ValidateOptions, ValidateResult};
use song_validator::config::{ConfigLoader, DonorSelection};
use song_validator::domain::ProgramId;
use song_validator::error::ValidatorError;
use song_validator::output::{JsonOutput, ReportWriter};
use song_validator::search::ElasticsearchClient;
use song_validator::workflow::Workflow;

#[derive(Parser)]
#[command(name = "song-validator")]
#[command(about = "Index SONG analyses and validate sample metadata and tumour/normal pairing")]
#[command(version, author)]
struct Cli {
    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    /// Search backend base URL (overrides the config file)
    #[arg(long, global = true)]
    es_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Index SONG analysis dumps")]
    Index(IndexArgs),
    #[command(about = "Validate donors of a program")]
    Validate(ValidateArgs),
}

#[derive(Args)]
struct IndexArgs {
    #[arg(short = 'i', long)]
    index_name: String,

    /// SONG JSON dump(s) from the analysis endpoint
    #[arg(short = 'd', long, num_args = 1.., required = true)]
    analysis_dump: Vec<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(short = 'i', long)]
    index_name: String,

    #[arg(short = 'p', long)]
    program_id: String,

    #[arg(short = 'd', long, num_args = 1..)]
    donor_ids: Vec<String>,

    /// File with one donor id per line
    #[arg(short = 'f', long)]
    donor_file: Option<PathBuf>,

    #[arg(short = 'w', long)]
    workflow: Option<Workflow>,

    #[arg(short = 'o', long, default_value = ".")]
    output_dir: Utf8PathBuf,

    /// Also write the raw analyses and aggregations of each donor
    #[arg(long)]
    debug_dump: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ValidatorError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ValidatorError) -> u8 {
    match error {
        ValidatorError::ConflictingDonorSources
        | ValidatorError::DonorFileRead(_)
        | ValidatorError::ConfigRead(_)
        | ValidatorError::ConfigParse(_)
        | ValidatorError::UnknownFieldPath(_)
        | ValidatorError::MissingPairingField(_)
        | ValidatorError::InvalidDonorId(_)
        | ValidatorError::InvalidProgramId(_)
        | ValidatorError::DumpRead { .. }
        | ValidatorError::DumpParse { .. }
        | ValidatorError::MissingAnalysisId(_) => 2,
        ValidatorError::SearchHttp(_)
        | ValidatorError::SearchStatus { .. }
        | ValidatorError::SearchResponse(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(url) = cli.es_url {
        config.elasticsearch_url = url;
    }

    match cli.command {
        Commands::Index(args) => {
            let client = ElasticsearchClient::new(&config.elasticsearch_url)?;
            let app = App::new(client, config);
            let result = app.ingest(&args.index_name, &args.analysis_dump)?;
            if cli.json {
                JsonOutput::print_ingest(&result).into_diagnostic()?;
            } else {
                for file in &result.files {
                    println!("Indexed {} SONG analysis objects from {}", file.indexed, file.path);
                }
            }
            Ok(())
        }
        Commands::Validate(args) => {
            // Donor sources are checked before anything touches the index.
            let donors = DonorSelection::resolve(&args.donor_ids, args.donor_file.as_deref())?;
            let program_id: ProgramId = args.program_id.parse()?;
            let client = ElasticsearchClient::new(&config.elasticsearch_url)?;
            let app = App::new(client, config);
            let options = ValidateOptions {
                index: args.index_name,
                program_id,
                donors,
                workflow: args.workflow,
                output: Some(ReportWriter::new(args.output_dir)),
                debug_dump: args.debug_dump,
            };
            let result = app.validate(&options)?;
            if cli.json {
                JsonOutput::print_validate(&result).into_diagnostic()?;
            } else {
                print_validate_summary(&result);
            }
            Ok(())
        }
    }
}

fn print_validate_summary(result: &ValidateResult) {
    println!(
        "Validated {} donor(s) of {} ({} failed)",
        result.donors.len(),
        result.program_id,
        result.failures.len()
    );
    for donor in &result.donors {
        println!(
            "{}: {} analyses, {} samples, {} with issues",
            donor.donor_id, donor.analyses, donor.samples, donor.samples_with_issues
        );
        println!(
            "   {} pairs, {} tumour(s) unpaired, {} normal(s) unpaired, {} pairing issue(s)",
            donor.tumour_normal_pairs,
            donor.tumour_not_paired,
            donor.normal_not_paired,
            donor.pairing_issues
        );
        if let Some(path) = &donor.report_path {
            println!("   report: {path}");
        }
    }
    for failure in &result.failures {
        println!("{}: failed: {}", failure.donor_id, failure.error);
    }
    if let Some(workflow) = result.workflow {
        let total: usize = result.workflow_candidates.values().map(Vec::len).sum();
        println!("{workflow}: {total} candidate(s)");
    }
}

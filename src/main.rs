use clap::{parser::ValueSource, Arg, ArgAction, ArgMatches, Command};
use log::{error, info, warn};
use std::path::PathBuf;

use lease_trace_core::{
    capture::load_records,
    engine::{Engine, RunOutcome},
    output::{self, Report, Timeline},
    utils::generate_session_id,
    ArtifactError, Config, Result,
};

#[tokio::main]
async fn main() {
    let matches = Command::new("lease-trace")
        .version("0.1.0")
        .about("Extracts and correlates DHCP and DNS artifacts from capture exports")
        .subcommand_required(true)
        .subcommand(
            Command::new("analyze")
                .about("Analyze a DHCP capture and a DNS capture")
                .arg(
                    Arg::new("dhcp")
                        .long("dhcp")
                        .value_name("FILE")
                        .help("JSON export of the DHCP capture")
                )
                .arg(
                    Arg::new("dns")
                        .long("dns")
                        .value_name("FILE")
                        .help("JSON export of the DNS capture")
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Configuration file path")
                        .default_value("config/default.json")
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Directory for the written artifacts")
                )
                .arg(
                    Arg::new("parallel")
                        .long("parallel")
                        .action(ArgAction::SetTrue)
                        .help("Extract both streams on separate workers")
                )
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Fail when any record produced a diagnostic")
                )
        )
        .subcommand(
            Command::new("init-config")
                .about("Write the default configuration file")
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .value_name("FILE")
                        .help("Where to write the configuration")
                        .default_value("config/default.json")
                )
        )
        .get_matches();

    let outcome = match matches.subcommand() {
        Some(("analyze", sub_matches)) => run_analyze(sub_matches).await,
        Some(("init-config", sub_matches)) => run_init_config(sub_matches),
        _ => Err(ArtifactError::Config("No subcommand provided".to_string())),
    };

    if let Err(e) = outcome {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) if use_config_file(path, matches.value_source("config")) => Config::from_file(path)?,
        _ => Config::default(),
    };

    if let Some(path) = matches.get_one::<String>("dhcp") {
        config.input.dhcp_capture = PathBuf::from(path);
    }
    if let Some(path) = matches.get_one::<String>("dns") {
        config.input.dns_capture = PathBuf::from(path);
    }
    if let Some(dir) = matches.get_one::<String>("output") {
        config.output.directory = PathBuf::from(dir);
    }
    if matches.get_flag("parallel") {
        config.analysis.parallel = true;
    }
    if matches.get_flag("strict") {
        config.analysis.fail_on_diagnostics = true;
    }

    config.validate()?;
    Ok(config)
}

/// The built-in default path is optional; a path given on the command line
/// must exist.
fn use_config_file(path: &str, source: Option<ValueSource>) -> bool {
    source != Some(ValueSource::DefaultValue) || std::path::Path::new(path).exists()
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn run_analyze(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    init_logging(&config.logging.level);

    let session_id = generate_session_id();
    info!("Starting analysis session {}", session_id);

    let dhcp_records = load_records(&config.input.dhcp_capture)?;
    let dns_records = load_records(&config.input.dns_capture)?;

    let engine = Engine::new(&config.analysis);
    let RunOutcome { result, diagnostics } = if config.analysis.parallel {
        engine.run_parallel(dhcp_records, dns_records).await?
    } else {
        engine.run(dhcp_records, dns_records)?
    };

    let statistics = result.statistics();
    let report = Report::new(&result, &statistics, &diagnostics)
        .with_keying(engine.keying())
        .with_session_id(&session_id)
        .to_string();
    println!("{}", report);

    let timeline = Timeline::from_result(&result, &statistics);
    let out = &config.output;
    output::write_artifacts_json(config.output_path(&out.artifacts_json), &result)?;
    output::write_events_ndjson(config.output_path(&out.events_ndjson), &result)?;
    output::write_events_csv(config.output_path(&out.events_csv), &result)?;
    output::write_timeline_json(config.output_path(&out.timeline_json), &timeline)?;
    if let Some(name) = &out.report_txt {
        output::write_report(config.output_path(name), &report)?;
    }

    if !diagnostics.is_empty() {
        warn!("{} records produced diagnostics", diagnostics.len());
        if config.analysis.fail_on_diagnostics {
            return Err(ArtifactError::Diagnostics(diagnostics.len()));
        }
    }

    info!("Analysis session {} complete", session_id);
    Ok(())
}

fn run_init_config(matches: &ArgMatches) -> Result<()> {
    init_logging("info");

    let path = matches
        .get_one::<String>("path")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/default.json"));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Config::default().to_file(&path)?;
    info!("Default configuration written to {}", path.display());
    Ok(())
}

mod cli;

use audioprobe::{batch, config, report, service};
use audioprobe_av::probe::{self, ComparisonStatus, ProbeReport, ProbeRequest};
use audioprobe_av::VersionResolver;
use audioprobe_common::AudioFormat;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ServiceCommands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "audioprobe=debug,audioprobe_av=debug".to_string()
        } else {
            "audioprobe=info,audioprobe_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe {
            file,
            ffmpeg_version,
            format,
            json,
        } => probe_file(&file, ffmpeg_version, format, json, cli.config.as_deref()),
        Commands::Batch {
            dir,
            output,
            ffmpeg_version,
            jobs,
            split_folders,
        } => run_batch(
            &dir,
            output,
            ffmpeg_version.as_deref(),
            jobs,
            split_folders,
            cli.config.as_deref(),
        ),
        Commands::Compare { file, versions } => {
            compare_versions(&file, &versions, cli.config.as_deref())
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("audioprobe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Service {
            base_url,
            api_key,
            command,
        } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if base_url.is_some() {
                config.service.base_url = base_url;
            }
            if api_key.is_some() {
                config.service.api_key = api_key;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_service(&config.service, command))
        }
    }
}

fn resolver_from(config: &config::Config) -> VersionResolver {
    VersionResolver::new(config.tools.resolver_settings())
}

fn probe_file(
    file: &Path,
    ffmpeg_version: Option<String>,
    format: Option<AudioFormat>,
    json: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let resolver = resolver_from(&config);

    let mut request = ProbeRequest::new(file);
    if let Some(format) = format {
        request = request.with_format(format);
    }
    if let Some(version) = ffmpeg_version {
        request = request.with_version(version);
    }

    let report = probe::probe_with_resolver(&resolver, &request, &config.probe.options())
        .with_context(|| format!("Failed to probe {:?}", file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(file, &report);
    }
    Ok(())
}

fn print_report(file: &Path, report: &ProbeReport) {
    let result = &report.result;
    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "unknown".to_string());

    println!("File: {}", file.display());
    println!("Format: {}", or_unknown(result.format_name.map(|f| f.to_string())));
    println!("Mime type: {}", or_unknown(result.mime_type.clone()));
    println!("Bitrate: {}", or_unknown(result.bitrate.map(|b| format!("{} kb/s", b))));
    println!("Channels: {}", or_unknown(result.channels.map(|c| c.to_string())));
    println!(
        "Duration: {}",
        or_unknown(
            result
                .duration
                .map(|d| format!("{} ({}s)", batch::format_hms(d), d))
        )
    );
    println!(
        "ffmpeg: {} ({})",
        report.ffmpeg_identifier,
        report.ffmpeg_version.as_deref().unwrap_or("unknown version")
    );
    println!("Strategy: {} (attempts: {})", report.strategy, report.attempts.join(" -> "));

    if !result.warnings.is_empty() {
        println!("\nWarnings: {}", result.warnings.len());
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }
}

fn run_batch(
    dir: &Path,
    output: Option<PathBuf>,
    ffmpeg_version: Option<&str>,
    jobs: Option<usize>,
    split_folders: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    if !dir.is_dir() {
        anyhow::bail!("Input directory does not exist: {:?}", dir);
    }

    let resolver = resolver_from(&config);
    let tool = resolver.resolve(ffmpeg_version)?;
    tracing::info!(
        "Using ffmpeg {} ({})",
        tool.id,
        tool.version.as_deref().unwrap_or("unknown version")
    );
    let orchestrator = probe::orchestrator_for(tool, &config.probe.options())?;
    let runner =
        batch::BatchRunner::new(&orchestrator).jobs(jobs.unwrap_or(config.batch.jobs));

    if split_folders {
        let report_dir = output.unwrap_or_else(|| config.batch.report_dir.clone());
        let planned = batch::plan_library(dir)?;
        if planned.is_empty() {
            println!("No audio files found in {:?}", dir);
            return Ok(());
        }
        let mut failed = Vec::new();
        for job in &planned {
            let path = report::default_report_path(&report_dir, &job.name);
            let written = runner.run_job(job).and_then(|outcome| {
                report::write_csv(&outcome.records, &path)?;
                Ok(outcome)
            });
            println!("\n== {} ==", job.name);
            match written {
                Ok(outcome) => {
                    print!("{}", report::format_summary(&outcome.summary));
                    println!("Report: {}", path.display());
                }
                Err(e) => {
                    tracing::error!("Library job {} failed: {:#}", job.name, e);
                    println!("✗ {}: {:#}", job.name, e);
                    failed.push(job.name.as_str());
                }
            }
        }
        if !failed.is_empty() {
            anyhow::bail!(
                "{} of {} library jobs failed: {}",
                failed.len(),
                planned.len(),
                failed.join(", ")
            );
        }
        return Ok(());
    }

    let outcome = runner.run(dir)?;
    let path = output.unwrap_or_else(|| {
        report::default_report_path(&config.batch.report_dir, &batch::folder_name(dir))
    });
    report::write_csv(&outcome.records, &path)?;

    print!("{}", report::format_summary(&outcome.summary));
    println!("Report: {}", path.display());
    Ok(())
}

fn compare_versions(file: &Path, versions: &[String], config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let resolver = resolver_from(&config);

    let results = probe::compare_versions(&resolver, file, versions, &config.probe.options());
    if results.is_empty() {
        println!("No ffmpeg versions available to compare.");
        return Ok(());
    }

    println!("Comparing ffmpeg versions for {}\n", file.display());
    for comparison in &results {
        let status = match comparison.status {
            ComparisonStatus::Success => "✓",
            ComparisonStatus::Error => "✗",
            ComparisonStatus::Unavailable => "-",
        };
        print!("{} {}", status, comparison.version);
        match (&comparison.report, &comparison.error) {
            (Some(report), _) => {
                let result = &report.result;
                print!(
                    " [{}] bitrate={} channels={} duration={} warnings={}",
                    report.strategy,
                    result.bitrate.map(|b| b.to_string()).unwrap_or_default(),
                    result.channels.map(|c| c.to_string()).unwrap_or_default(),
                    result.duration.map(|d| d.to_string()).unwrap_or_default(),
                    comparison.warnings_count
                );
            }
            (None, Some(error)) => print!(" - {}", error),
            (None, None) => {}
        }
        println!();
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let resolver = resolver_from(&config);

    println!("Checking ffmpeg versions...\n");

    let tools = resolver.status();
    for tool in &tools {
        let status = if tool.available { "✓" } else { "✗" };
        print!("{} {}", status, tool.id);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref location) = tool.location {
            print!(" - {}", location);
        }

        println!();
    }

    println!();
    if config.tools.use_docker {
        if resolver.isolation_available() {
            println!("Docker: available");
        } else {
            println!("Docker: not available");
        }
    }

    match resolver.best_available() {
        Ok(best) => println!("Best available: {}", best),
        Err(_) => println!("No ffmpeg version is available. Install ffmpeg or configure [tools]."),
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            config::validate_config(&config)?;
            println!("Default config:");
            print_config_summary(&config);
        }
    }

    Ok(())
}

fn print_config_summary(config: &config::Config) {
    println!("  Default ffmpeg: {}", config.tools.default_version);
    if let Some(ref preferred) = config.tools.preferred_version {
        println!("  Preferred ffmpeg: {}", preferred);
    }
    println!("  Versions: {}", config.tools.version_table().len());
    println!("  Docker enabled: {}", config.tools.use_docker);
    println!("  Encodings: {}", config.probe.encodings.join(", "));
    println!("  Fallback format: {}", config.probe.fallback_format);
    println!("  Report dir: {}", config.batch.report_dir.display());
    println!("  Batch jobs: {}", config.batch.jobs);
}

async fn run_service(config: &config::ServiceConfig, command: ServiceCommands) -> Result<()> {
    use service::AudioServiceApi;

    let client = service::AudioServiceClient::from_config(config)?;

    match command {
        ServiceCommands::Metadata { checksum } => {
            match client.get_audio_metadata(&checksum).await? {
                Some(metadata) => println!("{}", serde_json::to_string_pretty(&metadata)?),
                None => println!("No metadata for checksum {}", checksum),
            }
        }
        ServiceCommands::Cohort { content_id } => match client.get_cohort(&content_id).await? {
            Some(cohort) => println!("{}", serde_json::to_string_pretty(&cohort)?),
            None => println!("No cohort for content {}", content_id),
        },
        ServiceCommands::StripPlaylist { content_id } => {
            match service::replace_without_playlist(&client, &content_id).await? {
                Some(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                None => println!("No cohort for content {}", content_id),
            }
        }
        ServiceCommands::Durations { content_id } => {
            match service::cohort_durations(&client, &content_id).await? {
                Some(durations) => {
                    for entry in &durations {
                        match entry.duration {
                            Some(ref d) => println!("{}\t{}", entry.checksum, d),
                            None => println!("{}\t(no metadata)", entry.checksum),
                        }
                    }
                }
                None => println!("No cohort for content {}", content_id),
            }
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use release_pipeline::cli::commands::{ClassifyCommand, NotesCommand, PlanCommand, RunCommand, ValidateCommand};
use release_pipeline::cli::output::*;
use release_pipeline::cli::{Cli, Command};
use release_pipeline::command::{CommandRunner, CommandRunnerConfig, SystemCommandRunner};
use release_pipeline::core::{LevelRules, ReleaseConfig, VersionSpec};
use release_pipeline::execution::{ExecutionEngine, SchedulingStrategy};
use release_pipeline::publish::Publisher;
use release_pipeline::release::{build_release, ReleaseDeps};
use release_pipeline::report::PipelineReport;
use std::path::Path;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logging subscriber")?;

    let success = match &cli.command {
        Command::Run(cmd) => run_release(cmd).await?,
        Command::Validate(cmd) => validate_config(cmd)?,
        Command::Classify(cmd) => classify_version(cmd)?,
        Command::Plan(cmd) => show_plan(cmd)?,
        Command::Notes(cmd) => show_notes(cmd).await?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(file: &Path, overrides: &[(String, String)]) -> Result<ReleaseConfig> {
    let mut config = ReleaseConfig::from_file(file)
        .with_context(|| format!("Failed to load release config {}", file.display()))?;
    config.apply_overrides(overrides.iter().cloned());
    Ok(config)
}

fn command_runner(config: &ReleaseConfig) -> Arc<dyn CommandRunner> {
    Arc::new(SystemCommandRunner::new(
        CommandRunnerConfig::new()
            .with_working_dir(config.root_dir())
            .with_timeout(config.commands.timeout_secs),
    ))
}

fn engine(config: &ReleaseConfig, strategy: SchedulingStrategy) -> ExecutionEngine {
    let engine = ExecutionEngine::new(strategy);
    match config.task_timeout_secs {
        Some(secs) => engine.with_default_timeout(secs),
        None => engine,
    }
}

async fn run_release(cmd: &RunCommand) -> Result<bool> {
    let config = load_config(&cmd.file, &cmd.property)?;
    println!("{} Loaded release: {}", INFO, style(&config.name).bold());

    let mut deps = ReleaseDeps::new(command_runner(&config));
    if cmd.skip_publish {
        println!("{} Publishing disabled", WARN);
        deps = deps.with_publisher(Publisher::disabled());
    }
    let graph = build_release(&config, deps).context("Failed to build release pipeline")?;
    let mut pipeline = graph.pipeline;
    println!(
        "{} Version {} classified as {}",
        INFO,
        style(graph.context.version_string()).cyan(),
        style(graph.context.level).bold()
    );

    let mut engine = engine(&config, cmd.strategy.into());
    let progress = (!cmd.json).then(|| create_progress_bar(pipeline.len()));
    if let Some(bar) = &progress {
        let bar = bar.clone();
        engine.add_event_handler(move |event| {
            if is_task_finished(&event) {
                bar.inc(1);
            }
            bar.println(format_execution_event(&event));
        });
    }

    let result = engine.execute(&mut pipeline).await;
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let report = PipelineReport::from_pipeline(&pipeline, graph.context.version_string(), graph.context.level);
    let report_path = report
        .write_json(&graph.output_dir)
        .await
        .context("Failed to write run report")?;

    if cmd.json {
        println!("{}", report.to_json()?);
    } else {
        println!("\n{}", format_report(&report));
        println!("\n{} Report written to {}", INFO, style(report_path.display()).dim());
    }

    if let Err(e) = &result {
        error!("{}", e);
    }
    if report.is_success() {
        println!("{} {} released {}", CHECK, style(&pipeline.name).bold(), style("successfully").green());
    } else {
        println!("{} {} {}", CROSS, style(&pipeline.name).bold(), style("failed").red());
    }
    Ok(report.is_success())
}

fn validate_config(cmd: &ValidateCommand) -> Result<bool> {
    println!("{} Validating release config...", INFO);

    match ReleaseConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Release configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Inputs: {}", style(config.package.inputs.len()).cyan());
            println!("  Publish targets: {}", style(config.publish.len()).cyan());
            println!("  Required properties: {}", config.required_keys().join(", "));
            println!("  Level rules:\n{}", format_level_rules(&config.level_rules()?));

            let missing: Vec<String> = config
                .required_keys()
                .into_iter()
                .filter(|key| config.properties.get(key).is_none())
                .collect();
            if !missing.is_empty() {
                println!(
                    "{} Not set in the file (pass with -P): {}",
                    WARN,
                    style(missing.join(", ")).yellow()
                );
            }

            if cmd.json {
                println!("\n{}", serde_json::to_string_pretty(&config)?);
            }
            Ok(true)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            Ok(false)
        }
    }
}

fn classify_version(cmd: &ClassifyCommand) -> Result<bool> {
    let rules = match &cmd.file {
        Some(file) => load_config(file, &[])?.level_rules()?,
        None => LevelRules::default(),
    };
    let version = match &cmd.suffix {
        Some(suffix) => VersionSpec::new(cmd.version.as_str(), Some(suffix.clone())),
        None => VersionSpec::parse(&cmd.version),
    }
    .context("Invalid version")?;

    let level = rules.classify(&version);
    println!("{} {}", style(version.version_string()).cyan(), style(level).bold());
    println!("  channel tag: {}", level.tag());
    Ok(true)
}

fn show_plan(cmd: &PlanCommand) -> Result<bool> {
    let config = load_config(&cmd.file, &cmd.property)?;
    let graph = build_release(&config, ReleaseDeps::new(command_runner(&config)))
        .context("Failed to build release pipeline")?;

    println!(
        "{} {} {} ({})",
        INFO,
        style(&config.name).bold(),
        style(graph.context.version_string()).cyan(),
        graph.context.level
    );
    println!("{}", format_plan(&graph.pipeline));
    Ok(true)
}

async fn show_notes(cmd: &NotesCommand) -> Result<bool> {
    let config = load_config(&cmd.file, &cmd.property)?;
    let graph = build_release(&config, ReleaseDeps::new(command_runner(&config)).notes_only())
        .context("Failed to build release pipeline")?;
    let mut pipeline = graph.pipeline;

    if let Err(e) = engine(&config, SchedulingStrategy::Parallel).execute(&mut pipeline).await {
        println!("{} {}", CROSS, style(e).red());
        return Ok(false);
    }

    match graph.notes.try_get() {
        Some(notes) => {
            print!("{}", notes.render());
            Ok(true)
        }
        None => {
            println!("{} Release notes were not produced", CROSS);
            Ok(false)
        }
    }
}

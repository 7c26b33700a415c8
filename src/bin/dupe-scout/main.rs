mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, MonitorArgs, OrganizeArgs, ScanArgs};
use dotenv::dotenv;
use dupe_scout::config::load_configuration;
use dupe_scout::organize::{self, TransferMode};
use dupe_scout::{
    ActivityKind, AppConfig, DuplicateGroup, FileMonitor, GroupKind, MonitorOptions, ScanEngine,
    ScanResult,
};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let command = args.command.as_ref().map_or("help", Commands::name);
    let _guard = logging::init_logger(command, matches!(args.command, Some(Commands::Monitor(_))));

    let mut config = match load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command {
        Some(Commands::Scan(scan_args)) => {
            if let Err(err) = run_scan(&mut config, &scan_args) {
                error!("Error: {:#}", err);
            }
        }
        Some(Commands::Monitor(monitor_args)) => {
            if let Err(err) = run_monitor(&config, &monitor_args) {
                error!("Error: {:#}", err);
            }
        }
        Some(Commands::Organize(organize_args)) => {
            if let Err(err) = run_organize(&mut config, &organize_args) {
                error!("Error: {:#}", err);
            }
        }
        Some(Commands::PrintConfig) => {
            let rendered = toml::to_string_pretty(&config).context("rendering configuration")?;
            println!("{}", rendered);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn scan(config: &mut AppConfig, scan_args: &ScanArgs) -> anyhow::Result<ScanResult> {
    scan_args.apply(config);
    let engine = ScanEngine::new(config.clone());
    let reporter = CliReporter::new();
    let result = engine.scan(&reporter).context("scan failed")?;

    println!();
    info!(
        "Inventory: {}, Hash: {}, Similarity: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.hash_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.similarity_duration.as_secs_f64()).green(),
    );
    Ok(result)
}

fn run_scan(config: &mut AppConfig, scan_args: &ScanArgs) -> anyhow::Result<()> {
    let result = scan(config, scan_args)?;
    let groups = result.duplicate_groups();

    for (i, group) in groups.iter().enumerate() {
        print_group(i + 1, group);
    }

    if scan_args.show_names {
        let names = result.session.identical_names();
        if !names.is_empty() {
            println!("{}", "Files sharing a name:".bold());
            for (name, files) in names {
                println!("  {} ({} files)", name.yellow(), files.len());
                for file in files {
                    println!("    {}", file.path.display());
                }
            }
            println!();
        }
    }

    let stats = &result.statistics;
    info!(
        "{} files, {} exact duplicates in {} groups, {} bytes wasted",
        format!("{}", stats.total_files).cyan(),
        format!("{}", stats.exact_duplicates).red(),
        format!("{}", stats.duplicate_groups).red(),
        format!("{}", stats.wasted_bytes).red(),
    );
    info!(
        "{} similar files in {} groups, {} files share a name",
        format!("{}", stats.similar_files).yellow(),
        format!("{}", stats.similarity_groups).yellow(),
        format!("{}", stats.identical_names).cyan(),
    );
    if result.cancelled {
        info!("{}", "Scan was cancelled before completion".yellow());
    }

    Ok(())
}

fn print_group(number: usize, group: &DuplicateGroup) {
    let kind = match group.kind() {
        GroupKind::Exact => "exact".red(),
        GroupKind::Similar => "similar".yellow(),
    };
    println!(
        "{} [{}] {} ({} files, {} bytes reclaimable)",
        format!("Group {}", number).bold(),
        kind,
        group.id.to_string().dimmed(),
        group.files.len(),
        group.wasted_bytes(),
    );
    for file in &group.files {
        println!(
            "    {}  {} bytes  {}",
            file.path.display(),
            file.size,
            file.modified.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    println!();
}

fn run_monitor(config: &AppConfig, monitor_args: &MonitorArgs) -> anyhow::Result<()> {
    let directory = match (&monitor_args.directory, &config.monitor.directory) {
        (Some(dir), _) => dir.clone(),
        (None, Some(dir)) => PathBuf::from(dir),
        (None, None) => bail!("no directory to monitor; pass one or set monitor.directory"),
    };

    let mut options = MonitorOptions::from_config(&config.monitor, directory);
    if monitor_args.no_organize {
        options.auto_organize = false;
    }
    if let Some(path) = &monitor_args.organize_path {
        options.organize_path = Some(path.clone());
    }

    let mut monitor = FileMonitor::new(options);
    monitor.start().context("could not start monitor")?;

    println!(
        "Monitoring {} (press Enter to stop)",
        monitor.options().directory.display().to_string().green()
    );
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    monitor.stop();

    for entry in monitor.activity_log() {
        let kind = match entry.kind {
            ActivityKind::DuplicateDetected => format!("{:?}", entry.kind).red(),
            ActivityKind::Organized => format!("{:?}", entry.kind).yellow(),
            ActivityKind::Error => format!("{:?}", entry.kind).red().bold(),
            _ => format!("{:?}", entry.kind).normal(),
        };
        println!("{}  {:<18} {}", entry.timestamp_string().dimmed(), kind, entry.event);
    }

    Ok(())
}

fn run_organize(config: &mut AppConfig, organize_args: &OrganizeArgs) -> anyhow::Result<()> {
    let result = scan(config, &organize_args.scan)?;
    let groups = result.duplicate_groups();
    if groups.is_empty() {
        println!("No duplicates found, nothing to organize");
        return Ok(());
    }

    if organize_args.keep_newest {
        return run_keep_newest(&groups, organize_args.dry_run);
    }

    let plan = organize::plan_organization(&groups, &organize_args.dest, !organize_args.move_all);
    let mode = if organize_args.copy {
        TransferMode::Copy
    } else {
        TransferMode::Move
    };

    for folder in &plan.folders {
        println!("{}", folder.path.display().to_string().bold());
        for transfer in &folder.transfers {
            println!(
                "    {} -> {}",
                transfer.source.display(),
                transfer.destination.display()
            );
        }
    }
    println!(
        "{} files ({} bytes) in {} folders",
        plan.file_count(),
        plan.total_size(),
        plan.folders.len()
    );

    if organize_args.dry_run {
        return Ok(());
    }

    let verb = match mode {
        TransferMode::Move => "Move",
        TransferMode::Copy => "Copy",
    };
    if !prompt_confirm(&format!("{} these files?", verb), Some(false))? {
        return Ok(());
    }

    let stats = plan.execute(mode);
    info!(
        "{} moved, {} copied, {} errors, {} bytes",
        format!("{}", stats.moved).green(),
        format!("{}", stats.copied).green(),
        format!("{}", stats.errors).red(),
        stats.total_size,
    );

    Ok(())
}

fn run_keep_newest(groups: &[DuplicateGroup], dry_run: bool) -> anyhow::Result<()> {
    let plans: Vec<_> = groups
        .iter()
        .filter(|group| group.kind() == GroupKind::Exact)
        .filter_map(organize::plan_keep_newest)
        .collect();

    for plan in &plans {
        println!("{} {}", "keep".green(), plan.keep.path.display());
        for file in &plan.remove {
            println!("{} {}", "delete".red(), file.path.display());
        }
    }

    if dry_run || plans.is_empty() {
        return Ok(());
    }

    if !prompt_confirm(
        "Are you SURE you want to DELETE every file marked for deletion?",
        Some(false),
    )? {
        return Ok(());
    }

    for plan in &plans {
        let outcome = plan.execute();
        for (path, reason) in &outcome.failed {
            error!("Could not delete {}: {}", path.display(), reason);
        }
        info!("{} deleted", outcome.deleted.len());
    }

    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

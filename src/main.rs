mod cli;

use collectforge::config::{self, Config};
use collectforge::modules::{
    compile_bytes, FieldContract, ImportStorage, ModuleRegistry, ScanOutcome, ScanReport,
};
use collectforge::providers::{self, LookupOrchestrator, LookupResponse};
use collectforge_common::{Error, Identifier};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ModuleCommands};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "collectforge=trace,collectforge_common=trace".to_string()
        } else {
            "collectforge=info,collectforge_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.import_dir {
        config.storage.import_dir = dir;
    }

    match cli.command {
        Commands::Modules { command } => run_modules(command, &config),
        Commands::Validate { file } => validate_definition(&file),
        Commands::Providers { json } => list_providers(&config, json),
        Commands::Lookup {
            module,
            identifiers,
            json,
        } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(lookup(&config, &module, &identifiers, json))
        }
        Commands::Version => {
            println!("collectforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_registry(config: &Config) -> Result<ModuleRegistry> {
    let dir = &config.storage.import_dir;
    let storage = ImportStorage::open(dir)
        .with_context(|| format!("Failed to open import directory: {:?}", dir))?;
    let registry = ModuleRegistry::new(storage);
    let report = registry.load().context("Failed to load modules")?;
    for failure in &report.failed {
        tracing::warn!(file = %failure.source, reason = %failure.reason, "Skipped module file");
    }
    Ok(registry)
}

fn run_modules(command: ModuleCommands, config: &Config) -> Result<()> {
    let registry = open_registry(config)?;

    match command {
        ModuleCommands::List { json } => {
            let modules = registry.list_all();
            if json {
                println!("{}", serde_json::to_string_pretty(&modules)?);
                return Ok(());
            }
            if modules.is_empty() {
                println!("No modules registered.");
            }
            for module in &modules {
                println!(
                    "{:<16} {:<10} {:<9} {}",
                    module.module_key, module.version, module.source, module.name
                );
            }
        }
        ModuleCommands::Show { key, json } => {
            let module = registry.get_by_key(&key)?;
            if json {
                println!("{}", serde_json::to_string_pretty(module.as_ref())?);
                return Ok(());
            }
            let contract = &module.contract;
            println!("{} ({}) v{}", contract.name, contract.key, contract.version);
            if let Some(ref description) = contract.description {
                println!("{}", description);
            }
            println!("Id: {}", module.id);
            println!("Source: {} ({})", module.source, module.source_file);
            println!("Checksum: {}", module.checksum);

            println!("\nStates: {}", contract.states.len());
            for state in &contract.states {
                print!("  {} ({})", state.key, state.label);
                if !state.active {
                    print!(" [inactive]");
                }
                if state.deprecated {
                    print!(" [deprecated]");
                }
                println!();
            }

            println!("\nFields: {}", contract.fields.len());
            for field in &contract.fields {
                print_field(field);
            }

            println!("\nProviders: {}", contract.providers.len());
            for provider in &contract.providers {
                print!("  {} (priority {})", provider.key, provider.priority);
                if !provider.enabled {
                    print!(" [disabled]");
                }
                println!();
            }

            if !contract.workflows.is_empty() {
                println!("\nWorkflows: {}", contract.workflows.len());
                for workflow in &contract.workflows {
                    println!("  {}: {}", workflow.key, workflow.states.join(" -> "));
                }
            }
        }
        ModuleCommands::Raw { key } => {
            print!("{}", registry.get_raw_source(&key)?);
        }
        ModuleCommands::Scan => {
            let report = registry.scan_import_directory()?;
            print_report(&report);
        }
        ModuleCommands::Import { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read definition file: {:?}", file))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match registry.import_file(&file_name, &bytes) {
                Ok(ScanOutcome::Imported(summary)) => {
                    println!("✓ Imported {} v{}", summary.module_key, summary.version);
                }
                Ok(ScanOutcome::Skipped(source)) => {
                    println!("Unchanged: {} is already registered", source);
                }
                Ok(ScanOutcome::Failed(failure)) => {
                    anyhow::bail!("Import of {} failed: {}", failure.source, failure.reason);
                }
                Err(e) => return Err(report_issues(e)),
            }
        }
        ModuleCommands::Remove { key } => {
            let removed = registry.remove(&key)?;
            if removed.is_empty() {
                println!("No definition files left for {}", key);
            }
            for file in &removed {
                println!("✓ Removed {}", file);
            }
            if let Ok(module) = registry.get_by_key(&key) {
                println!("{} now resolves to the {} definition", key, module.source);
            }
        }
    }

    Ok(())
}

fn print_field(field: &FieldContract) {
    print!("  {} ({})", field.key, field.field_type);
    if field.required {
        print!(" [required]");
    }
    if field.constraints.multi_valued {
        print!(" [multi]");
    }
    if !field.providers.is_empty() {
        let providers: Vec<_> = field.providers.iter().map(|m| m.provider.as_str()).collect();
        print!(" <- {}", providers.join(", "));
    }
    println!();
}

fn print_report(report: &ScanReport) {
    println!("Imported: {}", report.imported.len());
    for summary in &report.imported {
        println!("  {} v{}", summary.module_key, summary.version);
    }
    println!("Skipped: {}", report.skipped.len());
    for source in &report.skipped {
        println!("  {}", source);
    }
    println!("Failed: {}", report.failed.len());
    for failure in &report.failed {
        println!("  {}: {}", failure.source, failure.reason);
    }
}

/// Print every validation issue to stderr and turn the error into a summary.
fn report_issues(err: Error) -> anyhow::Error {
    if err.issues().is_empty() {
        return err.into();
    }
    for issue in err.issues() {
        eprintln!("  {}", issue);
    }
    anyhow::anyhow!("Module definition has {} problem(s)", err.issues().len())
}

fn validate_definition(file: &Path) -> Result<()> {
    println!("Validating module definition: {:?}", file);
    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read definition file: {:?}", file))?;
    let compiled = compile_bytes(&bytes).map_err(report_issues)?;
    let contract = &compiled.contract;

    println!("✓ Module definition is valid");
    println!("  Module: {} ({}) v{}", contract.name, contract.key, contract.version);
    println!("  States: {}", contract.states.len());
    println!("  Fields: {}", contract.fields.len());
    println!("  Providers: {}", contract.providers.len());
    println!("  Workflows: {}", contract.workflows.len());
    println!("  Checksum: {}", compiled.checksum);
    Ok(())
}

fn list_providers(config: &Config, json: bool) -> Result<()> {
    let registry = providers::build_registry(config)?;
    let descriptors = registry.list();
    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }
    for provider in &descriptors {
        let status = if provider.is_available() {
            "✓"
        } else {
            "✗"
        };
        let types: Vec<_> = provider.identifier_types.iter().map(|t| t.as_str()).collect();
        print!(
            "{} {} ({}) [{}]",
            status,
            provider.key,
            provider.display_name,
            types.join(", ")
        );
        if provider.requires_credentials && !provider.credentials_configured {
            print!(" - missing API key");
        }
        println!();
    }
    Ok(())
}

async fn lookup(config: &Config, module: &str, identifiers: &[String], json: bool) -> Result<()> {
    let identifiers = identifiers
        .iter()
        .map(|raw| raw.parse::<Identifier>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let modules = Arc::new(open_registry(config)?);
    let providers = Arc::new(providers::build_registry(config)?);
    let orchestrator = LookupOrchestrator::new(modules, providers, &config.lookup);

    let response = orchestrator.lookup_by_key(module, &identifiers).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_lookup(&response);
    }
    Ok(())
}

fn print_lookup(response: &LookupResponse) {
    if response.results.is_empty() {
        println!("No provider returned a result for module '{}'.", response.module_key);
        return;
    }

    println!("Results ({}):", response.results.len());
    for result in &response.results {
        println!(
            "  {} (priority {}) confidence {} [{}]",
            result.provider_key, result.priority, result.confidence.score, result.confidence.label
        );
    }
    if let Some(ref best) = response.best {
        println!("Best: {}", best.provider_key);
    }

    println!("\nAttributes:");
    for (key, value) in &response.merged_attributes {
        println!("  {}: {}", key, value);
    }

    if !response.assets.is_empty() {
        println!("\nAssets:");
        for asset in &response.assets {
            println!("  {} {}", asset.kind, asset.url);
        }
    }
}

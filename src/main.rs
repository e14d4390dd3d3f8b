use clap::Parser;
use pdfwtf::tools::probe_tools;
use pdfwtf::utils::error::ErrorSeverity;
use pdfwtf::utils::{logger, validation::Validate};
use pdfwtf::{CliConfig, Environment, PdfEngine, PdfError, PdfPipeline, SystemRunner};
use std::sync::Arc;

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(context: &str, e: &PdfError) {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();
    let environment = Environment::load();

    let toml = cli.load_toml();
    let log_level = match &toml {
        Ok(Some(config)) => config.monitoring.log_level.clone(),
        _ => None,
    };
    logger::init_cli_logger(cli.verbose, cli.debug, log_level.as_deref());

    tracing::info!("Starting pdfwtf");
    if let Some(path) = &environment.dotenv_file {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    tracing::debug!("CLI config: {:?}", cli);
    tracing::debug!("Environment: {:?}", environment);

    let toml = match toml {
        Ok(toml) => toml,
        Err(e) => {
            report_failure("Failed to load settings file", &e);
            std::process::exit(exit_code(e.severity()));
        }
    };

    if let Err(e) = cli.validate() {
        report_failure("Configuration validation failed", &e);
        std::process::exit(1);
    }

    let options = cli.to_options(toml.as_ref());
    let runner = Arc::new(SystemRunner::new(environment.clone()));

    if cli.check_tools {
        let include_docker = options.unpaper.runner == pdfwtf::domain::model::UnpaperRunner::Docker;
        for status in probe_tools(runner.as_ref(), &options.tools, include_docker).await {
            match status.version {
                Some(version) => println!("✅ {:<12} {:<20} {}", status.name, status.program, version),
                None => println!("❌ {:<12} {:<20} not available", status.name, status.program),
            }
        }
        return;
    }

    let monitor_enabled = cli.monitor || toml.as_ref().map(|t| t.monitoring_enabled()).unwrap_or(false);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let mut worst: Option<ErrorSeverity> = None;
    for source in cli.inputs() {
        tracing::info!("📂 Input: {}", source);
        let pipeline = PdfPipeline::new(runner.clone(), options.clone(), source.clone(), environment.temp_root());
        let engine = PdfEngine::new_with_monitoring(pipeline, monitor_enabled);

        match engine.run().await {
            Ok(report) => {
                println!("✅ {} processed", source);
                println!("📄 Output: {}", report.output_pdf.display());
                if let Some(doi) = report.metadata.doi.as_ref().filter(|d| !d.is_empty()) {
                    println!("🔗 DOI: {}", doi.join(", "));
                }
            }
            Err(e) => {
                report_failure(&format!("Processing {} failed", source), &e);
                worst = worst.max(Some(e.severity()));
            }
        }
    }

    // Low severity counts as success
    if let Some(code) = worst.map(exit_code).filter(|code| *code > 0) {
        std::process::exit(code);
    }
}

use clap::Parser;
use rbsync::utils::error::{ErrorSeverity, RbsyncError};
use rbsync::utils::{logger, validation::Validate};
use rbsync::{CliArgs, LocalStorage, RunSummary, SessionConfig, SessionRunner};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting rbsync");
    tracing::info!("📁 Loading session from: {}", args.config);

    let mut config = match SessionConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load session file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(config.export.output_path.clone());
    tracing::info!("📂 Output directory: {}", storage.base_path().display());
    let runner = SessionRunner::new(storage, config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no files will be written");
        match runner.plan() {
            Ok(matches) => {
                for slice_match in matches {
                    println!("{}", slice_match.diagnostic());
                }
                return Ok(());
            }
            Err(e) => exit_with(e),
        }
    }

    match runner.run() {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => exit_with(e),
    }
}

fn print_summary(summary: &RunSummary) {
    tracing::info!("✅ Matching completed successfully!");
    println!("✅ Matched {} source slices along {}", summary.mapping.len(), summary.axis);
    println!(
        "   source slices: {}, target slices: {}, manual: {}",
        summary.source_slices, summary.target_slices, summary.manual
    );
    for path in &summary.outputs {
        println!("📁 Output saved to: {}", path.display());
    }
}

fn exit_with(e: RbsyncError) -> ! {
    tracing::error!(
        "❌ rbsync failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

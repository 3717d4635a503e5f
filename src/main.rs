use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use epub_translator::core::{print_error_message, print_info_message, translate_archive, RunConfig};
use epub_translator::env::core::{LogLevel, NoColor};
use epub_translator::env::EnvVar;
use epub_translator::translation::backends::{ensure_installed, ArgosRuntime, InstallStatus};
use epub_translator::translation::{
    progress_channel, BackendKind, CancellationFlag, ConfigManager, LanguagePair, RunStatus,
    TranslationError, TranslationResult, TranslatorConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "epub-translator",
    version,
    about = "Translate EPUB books into bilingual editions",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a book (default when no subcommand is given)
    Translate(TranslateArgs),

    /// Install the local model for a language pair
    InstallModel(InstallModelArgs),

    /// Write a configuration file with the default settings
    InitConfig {
        #[arg(value_name = "PATH", default_value = "epub-translator.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input book (.epub, or .mobi/.azw3/.azw through ebook-convert)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Target language code
    #[arg(short, long, value_name = "LANG")]
    to: Option<String>,

    /// Source language code
    #[arg(short, long, value_name = "LANG")]
    from: Option<String>,

    /// Translation backend: local, deepl, google_free, gemini
    #[arg(short, long, value_name = "NAME", value_parser = parse_backend)]
    backend: Option<BackendKind>,

    #[arg(long, value_name = "KEY")]
    deepl_key: Option<String>,

    #[arg(long, value_name = "KEY")]
    gemini_key: Option<String>,

    /// Translate only a limited number of units
    #[arg(long)]
    test_mode: bool,

    /// Unit limit in test mode
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Copy documents before this reading-order index unchanged
    #[arg(long, value_name = "N")]
    start_index: Option<usize>,

    /// Also translate table-of-contents and navigation documents
    #[arg(long)]
    no_skip_nav: bool,

    /// Output file (default: <input>_translated_<lang>.epub)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InstallModelArgs {
    #[arg(short, long, value_name = "LANG")]
    from: Option<String>,

    #[arg(short, long, value_name = "LANG")]
    to: Option<String>,

    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn parse_backend(value: &str) -> Result<BackendKind, TranslationError> {
    value.parse()
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Translate(args)) => translate(args),
        Some(Commands::InstallModel(args)) => install_model(args),
        Some(Commands::InitConfig { path, force }) => init_config(path, force),
        None => translate(cli.translate),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            print_error_message(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let level = LogLevel::get().unwrap_or_else(|e| {
        eprintln!("{}", e);
        "info".to_string()
    });
    let filter = EnvFilter::try_new(format!("epub_translator={}", level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!NoColor::get_or_default(false))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> TranslationResult<TranslatorConfig> {
    let manager = ConfigManager::with_file(path.map(PathBuf::as_path))?;
    Ok(manager.get_config().clone())
}

fn translate(args: TranslateArgs) -> TranslationResult<ExitCode> {
    let input = args.input.clone().ok_or_else(|| {
        TranslationError::ConfigError("missing INPUT (see --help)".to_string())
    })?;

    let mut config = load_config(args.config.as_ref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let mut run_config = RunConfig::from_config(&config, input)?;
    run_config.output = args.output;

    watch_interrupt(run_config.cancel.clone());

    let (progress, mut events) = progress_channel();
    let printer = thread::spawn(move || {
        while let Some(event) = events.blocking_recv() {
            if event.message.starts_with("Error:") {
                print_error_message(&event.message);
            } else {
                print_info_message(&format!("[{:>3.0}%] {}", event.percent, event.message));
            }
        }
    });

    let result = translate_archive(run_config, Some(progress));
    if printer.join().is_err() {
        tracing::warn!("progress printer panicked");
    }

    // 结束消息已经由进度输出打印
    Ok(match result {
        Ok(report) => match report.status() {
            RunStatus::Completed => ExitCode::SUCCESS,
            RunStatus::Stopped => ExitCode::from(130),
        },
        Err(_) => ExitCode::FAILURE,
    })
}

fn apply_overrides(config: &mut TranslatorConfig, args: &TranslateArgs) {
    if let Some(to) = &args.to {
        config.target_lang = to.clone();
    }
    if let Some(from) = &args.from {
        config.source_lang = from.clone();
    }
    if let Some(backend) = args.backend {
        config.backend = backend.as_str().to_string();
    }
    if let Some(key) = &args.deepl_key {
        config.deepl_key = Some(key.clone());
    }
    if let Some(key) = &args.gemini_key {
        config.gemini_key = Some(key.clone());
    }
    if args.test_mode {
        config.test_mode = true;
    }
    if let Some(limit) = args.limit {
        config.test_limit = limit;
    }
    if let Some(start_index) = args.start_index {
        config.start_index = start_index;
    }
    if args.no_skip_nav {
        config.skip_navigation = false;
    }
}

/// Ctrl-C 只设置取消标志，运行在下一个检查点停下并写出完整的归档
fn watch_interrupt(cancel: CancellationFlag) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!("无法监听 Ctrl-C: {}", e);
                return;
            }
        };

        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                print_info_message("Stopping after the documents in progress...");
                cancel.cancel();
            }
        });
    });
}

fn install_model(args: InstallModelArgs) -> TranslationResult<ExitCode> {
    let config = load_config(args.config.as_ref())?;
    let pair = LanguagePair::new(
        args.from.unwrap_or(config.source_lang.clone()),
        args.to.unwrap_or(config.target_lang.clone()),
    );

    let runtime = ArgosRuntime::new(
        &config.local_api_url,
        &config.argospm_command,
        config.request_timeout(),
    )?;

    match ensure_installed(&runtime, &pair)? {
        InstallStatus::AlreadyInstalled => {
            print_info_message(&format!("Model {} is already installed", pair))
        }
        InstallStatus::Installed(package) => {
            print_info_message(&format!("Installed {}", package.name))
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_config(path: PathBuf, force: bool) -> TranslationResult<ExitCode> {
    if path.exists() && !force {
        return Err(TranslationError::ConfigError(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    ConfigManager::generate_example_config(&path)?;
    print_info_message(&format!("Wrote {}", path.display()));
    Ok(ExitCode::SUCCESS)
}

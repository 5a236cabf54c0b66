use anyhow::{Context, Result};
use babeldoc_mcp::config::{
    default_config_path, find_config_file, get_config, load_config, save_config, Config,
};
use babeldoc_mcp::mcp::server::McpServer;
use babeldoc_mcp::models::{JobResult, ToolRequest};
use babeldoc_mcp::status::{render_result, render_snapshot};
use babeldoc_mcp::ui::{self, Spinner, Status};
use babeldoc_mcp::{ToolError, TranslationBridge};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// BabelDOC MCP - Layout-preserving PDF translation for AI agents
#[derive(Parser, Debug)]
#[command(name = "babeldoc-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing BabelDOC PDF translation to AI agents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Log line format (logs always go to stderr)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table in a terminal, JSON otherwise
    Auto,
    /// Human-readable tables
    Table,
    /// JSON, as returned by the MCP tools
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (for Claude Desktop and other MCP clients)
    Serve {
        /// Run in stdio mode (for MCP clients like Claude Desktop)
        #[arg(long, default_value_t = true)]
        stdio: bool,

        /// Run in HTTP/SSE mode (overrides --stdio)
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Translate a PDF from the command line
    #[command(alias = "t")]
    Translate {
        /// Input PDF file
        input: String,

        /// Output directory (default: the input file's directory)
        #[arg(long, short = 'd')]
        output_dir: Option<String>,

        /// Source language code
        #[arg(long, short = 'i')]
        lang_in: Option<String>,

        /// Target language code
        #[arg(long, short = 'l')]
        lang_out: Option<String>,

        /// Pages to translate (e.g., "1-5", "1,3,5", "3-")
        #[arg(long)]
        pages: Option<String>,

        /// Skip the bilingual output
        #[arg(long)]
        no_dual: bool,

        /// Skip the monolingual output
        #[arg(long)]
        no_mono: bool,

        /// Translation service (openrouter, openai)
        #[arg(long, short)]
        service: Option<String>,

        /// Model override
        #[arg(long, short)]
        model: Option<String>,

        /// Queries per second allowed against the service
        #[arg(long)]
        qps: Option<u32>,

        /// Do not watermark the output
        #[arg(long)]
        no_watermark: bool,
    },

    /// Show provider configuration and supported languages
    #[command(alias = "st")]
    Status,

    /// Check configuration and pipeline installation
    #[command(alias = "diag")]
    Doctor,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,

        /// Where to write (default: the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Print the effective configuration
    Show,
}

/// Print all available environment variables
fn print_env_vars() {
    println!("BabelDOC MCP - Environment Variables");
    println!();
    println!("Translation Services:");
    println!("  OPENROUTER_API_KEY          API key for OpenRouter");
    println!("  OPENROUTER_BASE_URL         OpenRouter endpoint (default: https://openrouter.ai/api/v1)");
    println!("  OPENROUTER_MODEL            OpenRouter model (default: google/gemini-2.5-flash)");
    println!("  OPENAI_API_KEY              API key for OpenAI");
    println!("  OPENAI_BASE_URL             OpenAI endpoint (default: https://api.openai.com/v1)");
    println!("  OPENAI_MODEL                OpenAI model (default: gpt-4o-mini)");
    println!();
    println!("Pipeline Settings:");
    println!("  BABELDOC_MCP__PIPELINE__EXECUTABLE              BabelDOC executable (default: babeldoc)");
    println!("  BABELDOC_MCP__PIPELINE__JOB_TIMEOUT_SECONDS     Limit for one translation, 0 = none (default: 0)");
    println!("  BABELDOC_MCP__PIPELINE__DIAGNOSTICS_MAX_BYTES   Pipeline output kept on failure (default: 8192)");
    println!("  BABELDOC_MCP__PIPELINE__KEY_ON_COMMAND_LINE     Also pass the API key as an argument (default: false)");
    println!();
    println!("Dispatch Settings:");
    println!("  BABELDOC_MCP__DISPATCH__MAX_CONCURRENT_JOBS        Simultaneous translations (default: 2)");
    println!("  BABELDOC_MCP__DISPATCH__ADMISSION_TIMEOUT_SECONDS  Wait for a free slot, 0 = forever (default: 0)");
    println!();
    println!("Service Defaults:");
    println!("  BABELDOC_MCP__PROVIDERS__DEFAULT_SERVICE  Service used when a request names none (default: openrouter)");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export OPENROUTER_API_KEY=\"sk-or-...\"");
    println!("  export BABELDOC_MCP__DISPATCH__MAX_CONCURRENT_JOBS=4");
    std::process::exit(0);
}

fn load_effective_config(path: Option<&PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = path {
        let config = load_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        return Ok((config, Some(path.clone())));
    }
    if let Some(path) = find_config_file() {
        let config = load_config(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        return Ok((config, Some(path)));
    }
    Ok((get_config().context("Failed to read configuration")?, None))
}

fn init_tracing(cli: &Cli, config: &Config) {
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("babeldoc_mcp={}", env_filter)),
    );

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.logging.format.as_deref() == Some("json"),
    };

    // stdout carries the MCP protocol in stdio mode
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    match format {
        OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
        OutputFormat::Auto => OutputFormat::Json,
        other => other,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
    }

    let (config, config_path) = load_effective_config(cli.config.as_ref())?;
    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Some(Commands::Serve {
            stdio,
            http,
            port,
            host,
        }) => {
            let bridge = Arc::new(TranslationBridge::from_config(&config)?);
            let server = McpServer::new(bridge)?;

            // Use HTTP mode if --http flag is provided, otherwise use --stdio flag
            let use_http = http || !stdio;

            if use_http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                tokio::select! {
                    result = handle => {
                        result.map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutting down MCP server");
                    }
                }
            } else {
                server.run().await?;
            }
        }

        Some(Commands::Translate {
            input,
            output_dir,
            lang_in,
            lang_out,
            pages,
            no_dual,
            no_mono,
            service,
            model,
            qps,
            no_watermark,
        }) => {
            let bridge = TranslationBridge::from_config(&config)?;
            let request = ToolRequest {
                input_file: Some(input.clone()),
                output_dir,
                lang_in,
                lang_out,
                pages,
                no_dual,
                no_mono,
                service,
                model,
                qps,
                watermark: Some(!no_watermark),
                admission_timeout_secs: None,
            };

            let format = resolve_format(cli.output);
            let spinner = (format == OutputFormat::Table && !cli.quiet)
                .then(|| Spinner::new(&format!("Translating {}", input)));

            let result = bridge.translate(request).await;
            let success = result.is_success();
            print_translation(result, format, spinner)?;
            if !success {
                std::process::exit(1);
            }
        }

        Some(Commands::Status) => {
            let bridge = TranslationBridge::from_config(&config)?;
            let snapshot = bridge.status();

            match resolve_format(cli.output) {
                OutputFormat::Json => {
                    let value = render_snapshot(&snapshot).map_err(anyhow::Error::new)?;
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                _ => {
                    ui::print_section(&format!("{} v{}", snapshot.service, snapshot.version));
                    println!("{}", ui::provider_table(&snapshot));
                    ui::print_section("Languages");
                    println!("{}", ui::language_table(&snapshot));
                    println!(
                        "Up to {} concurrent translations",
                        snapshot.dispatcher.max_concurrent_jobs
                    );
                }
            }
        }

        Some(Commands::Doctor) => {
            run_doctor(&config, config_path.as_ref()).await?;
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Init { force, path } => {
                let path = path
                    .or_else(default_config_path)
                    .context("Could not determine a configuration directory; pass --path")?;
                save_config(&Config::default(), &path, force)?;
                ui::print_status(
                    Status::Success,
                    &format!("Wrote default configuration to {}", path.display()),
                );
            }
            ConfigCommands::Show => {
                println!("{}", toml::to_string_pretty(&config.redacted())?);
            }
        },

        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "babeldoc-mcp",
                &mut std::io::stdout(),
            );
        }

        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

fn print_translation(
    result: JobResult,
    format: OutputFormat,
    spinner: Option<Spinner>,
) -> Result<()> {
    match (format, result) {
        (OutputFormat::Table, JobResult::Succeeded(success)) => {
            if let Some(spinner) = spinner {
                spinner.finish_with_success(&format!(
                    "✓ Translated {} in {}",
                    success.input_file.display(),
                    ui::format_duration(Duration::from_millis(success.elapsed_ms))
                ));
            }
            println!("{}", ui::output_table(&success));
        }
        (OutputFormat::Table, JobResult::Failed(err)) => {
            if let Some(spinner) = spinner {
                spinner.finish_with_error("✗ Translation failed");
            }
            let err = ToolError::from(err);
            ui::print_status(Status::Error, &err.message);
            if let Some(diagnostics) = &err.diagnostics {
                ui::print_divider();
                eprintln!("{}", diagnostics);
            }
        }
        (_, result) => {
            let value = match render_result(result) {
                Ok(value) => value,
                Err(err) => serde_json::to_value(&err)?,
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

async fn run_doctor(config: &Config, config_path: Option<&PathBuf>) -> Result<()> {
    println!("BabelDOC MCP - Doctor");
    println!("================================");

    ui::print_section("Configuration");
    match config_path {
        Some(path) => ui::print_status(Status::Info, &format!("Config file: {}", path.display())),
        None => ui::print_status(Status::Info, "No config file found; using defaults"),
    }

    ui::print_section("Translation services");
    let bridge = match TranslationBridge::from_config(config) {
        Ok(bridge) => bridge,
        Err(e) => {
            ui::print_status(Status::Error, &format!("Invalid service settings: {}", e));
            return Ok(());
        }
    };
    let snapshot = bridge.status();
    for provider in &snapshot.providers {
        if provider.configured {
            ui::print_status(
                Status::Success,
                &format!("{}: configured ({})", provider.name, provider.model),
            );
        } else {
            ui::print_status(
                Status::Warning,
                &format!("{}: not configured (set {})", provider.name, provider.env_var),
            );
        }
    }
    if !snapshot.providers.iter().any(|p| p.configured) {
        ui::print_status(Status::Error, "No translation service is configured");
    }

    ui::print_section("Pipeline");
    match bridge.pipeline().check().await {
        Ok(version) => ui::print_status(
            Status::Success,
            &format!("{}: {}", config.pipeline.executable.display(), version),
        ),
        Err(e) => ui::print_status(
            Status::Error,
            &format!("{}: {}", config.pipeline.executable.display(), e),
        ),
    }

    ui::print_section("Dispatch");
    ui::print_status(
        Status::Info,
        &format!(
            "Up to {} concurrent translations",
            snapshot.dispatcher.max_concurrent_jobs
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["babeldoc-mcp"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.log_format.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["babeldoc-mcp", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["babeldoc-mcp", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_output_and_log_format() {
        let cli = Cli::parse_from(["babeldoc-mcp", "-o", "json", "--log-format", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["babeldoc-mcp", "serve"]);
        match &cli.command {
            Some(Commands::Serve {
                stdio,
                http,
                port,
                host,
            }) => {
                assert!(*stdio);
                assert!(!*http);
                assert_eq!(*port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_translate_command() {
        let cli = Cli::parse_from([
            "babeldoc-mcp",
            "translate",
            "paper.pdf",
            "--lang-out",
            "ja",
            "--pages",
            "1-3",
            "--no-mono",
            "--service",
            "openai",
            "--qps",
            "8",
        ]);
        match &cli.command {
            Some(Commands::Translate {
                input,
                lang_out,
                pages,
                no_mono,
                no_dual,
                service,
                qps,
                no_watermark,
                ..
            }) => {
                assert_eq!(input, "paper.pdf");
                assert_eq!(lang_out.as_deref(), Some("ja"));
                assert_eq!(pages.as_deref(), Some("1-3"));
                assert!(*no_mono);
                assert!(!*no_dual);
                assert_eq!(service.as_deref(), Some("openai"));
                assert_eq!(*qps, Some(8));
                assert!(!*no_watermark);
            }
            _ => panic!("Expected Translate command"),
        }
    }

    #[test]
    fn test_cli_config_init() {
        let cli = Cli::parse_from([
            "babeldoc-mcp",
            "config",
            "init",
            "--force",
            "--path",
            "/tmp/babeldoc.toml",
        ]);
        match cli.command {
            Some(Commands::Config {
                command: ConfigCommands::Init { force, path },
            }) => {
                assert!(force);
                assert_eq!(path, Some(PathBuf::from("/tmp/babeldoc.toml")));
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_cli_completions() {
        let cli = Cli::parse_from(["babeldoc-mcp", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Completions {
                shell: clap_complete::Shell::Bash
            })
        ));
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}

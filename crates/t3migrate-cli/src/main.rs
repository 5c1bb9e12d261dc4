use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use t3migrate_core::NamespaceConversion;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "t3migrate", version, about = "TYPO3 extension migration toolkit (Rust)")]
struct Cli {
    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a legacy locallang XML file to XLIFF (one file per language)
    #[command(name = "xml2xlf")]
    Xml2Xlf {
        /// Legacy locale XML file to convert
        xml: PathBuf,
    },

    /// Rewrite brace-style Fluid namespaces into an <html> root tag
    #[command(name = "fluid-ns-to-html")]
    FluidNsToHtml {
        /// Template file, or a directory searched recursively for *.html
        template: PathBuf,
    },
}

trait Runnable {
    fn run(self, use_color: bool) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, use_color: bool) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!("▶ Starting command: {}", cmd_name);

        let result = match self {
            Commands::Xml2Xlf { xml } => run_xml2xlf(xml, use_color),
            Commands::FluidNsToHtml { template } => run_fluid_ns_to_html(template, use_color),
        };

        match &result {
            Ok(_) => info!("✔ Finished command: {}", cmd_name),
            Err(e) => error!("✖ Command {} failed: {:?}", cmd_name, e),
        }

        result
    }
}

fn run_xml2xlf(xml: PathBuf, use_color: bool) -> Result<()> {
    debug!("Xml2Xlf args: xml={:?}", xml);

    if !xml.is_file() {
        eprintln!("File does not exist: \"{}\"", xml.display());
        std::process::exit(2);
    }

    let plan = t3migrate_services::plan_xlf_conversion(&xml)?;

    let names = plan
        .document
        .languages
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    println!(
        "Found {} languages: {}",
        plan.document.languages.len(),
        paint(&names, use_color)
    );

    for (language, labels) in &plan.document.languages {
        println!(
            "Found {} language labels for language {}",
            labels.len(),
            paint(language, use_color)
        );
        for (key, value) in labels {
            println!("{}: {}", paint(key, use_color), value);
        }
    }

    for output in &plan.outputs {
        match std::fs::write(&output.path, &output.content) {
            Ok(()) => println!(
                "Wrote {} labels to: {}",
                paint(&output.language, use_color),
                output.path.display()
            ),
            Err(err) => {
                warn!("write failed: {}: {}", output.path.display(), err);
                eprintln!(
                    "An error occurred while creating the translation file at {}: {}",
                    output.path.display(),
                    err
                );
            }
        }
    }

    Ok(())
}

fn run_fluid_ns_to_html(template: PathBuf, use_color: bool) -> Result<()> {
    debug!("FluidNsToHtml args: template={:?}", template);

    if !template.is_file() && !template.is_dir() {
        eprintln!("File or directory does not exist: \"{}\"", template.display());
        std::process::exit(2);
    }

    let targets = t3migrate_services::fluid_targets(&template)?;
    debug!("Matched {} template file(s)", targets.len());

    for path in targets {
        match t3migrate_services::rewrite_template_file(&path) {
            Ok(NamespaceConversion::NoLegacyNamespaces) => {
                println!("Found 0 old namespaces in {}", path.display());
            }
            Ok(NamespaceConversion::Conflict { .. }) => {
                println!(
                    "Found old namespaces but also a html tag in {}. Please investigate.",
                    path.display()
                );
            }
            Ok(NamespaceConversion::Converted { declarations, .. }) => {
                println!(
                    "Found {} old namespaces in {}:",
                    declarations.len(),
                    path.display()
                );
                for decl in &declarations {
                    println!("- {}", paint(&decl.raw, use_color));
                }
                println!("Wrote template data to: {}", path.display());
            }
            Err(err) => {
                // one broken file must not abort the batch
                warn!("skipping {}: {}", path.display(), err);
                eprintln!("Skipping {}: {}", path.display(), err);
            }
        }
    }

    Ok(())
}

fn paint(text: &str, use_color: bool) -> String {
    if use_color {
        use owo_colors::OwoColorize;
        format!("{}", text.green())
    } else {
        text.to_string()
    }
}

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = rolling::daily("logs", "t3migrate.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let _guard = init_tracing();

    let cli = Cli::parse();

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    cli.cmd.run(use_color)
}

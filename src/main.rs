//! Dash Bridge CLI
//!
//! Usage:
//!   dash-bridge layout <LAYOUT.json> [OPTIONS]
//!   dash-bridge endpoints [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>        Bridge configuration (TOML format)
//!   -t, --template <NAME>      Template name (default: app)
//!   -i, --instance <ID>        Instance identifier
//!   -r, --replacements <FILE>  Initial-layout replacements (JSON object)
//!   --adjust-ids               Namespace component ids with the instance identifier
//!   -h, --help                 Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use dash_bridge::logging::init_tracing;
use dash_bridge::{BridgeConfig, BridgeError, InstanceOptions, LayoutNode, Registry, ReplacementMap};

#[derive(Parser)]
#[command(name = "dash-bridge")]
#[command(about = "Inspect how dashboard instances are served")]
struct Cli {
    /// Bridge configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the initial layout an instance would serve
    Layout {
        /// Layout file (JSON)
        layout: PathBuf,

        #[command(flatten)]
        instance: InstanceArgs,

        /// Replacement map file: {"<id>": {"<property>": <value>}}
        #[arg(short, long)]
        replacements: Option<PathBuf>,

        /// Namespace component ids with the instance identifier
        #[arg(long)]
        adjust_ids: bool,
    },
    /// List the endpoints an instance registers on the host server
    Endpoints {
        #[command(flatten)]
        instance: InstanceArgs,
    },
}

#[derive(Args)]
struct InstanceArgs {
    /// Template name
    #[arg(short, long, default_value = "app")]
    template: String,

    /// Instance identifier (defaults to the template name)
    #[arg(short, long)]
    instance: Option<String>,
}

impl InstanceArgs {
    fn id(&self) -> &str {
        self.instance.as_deref().unwrap_or(&self.template)
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match BridgeConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => BridgeConfig::default(),
    };
    init_tracing(&config.logging.level);

    let registry = Registry::new(config);
    let result = match &cli.command {
        Command::Layout {
            layout,
            instance,
            replacements,
            adjust_ids,
        } => print_layout(&registry, layout, instance, replacements.as_deref(), *adjust_ids),
        Command::Endpoints { instance } => print_endpoints(&registry, instance),
    };

    if let Err(message) = result {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

fn print_layout(
    registry: &Registry,
    layout_path: &Path,
    args: &InstanceArgs,
    replacements_path: Option<&Path>,
    adjust_ids: bool,
) -> Result<(), String> {
    let source = fs::read_to_string(layout_path)
        .map_err(|e| format!("Error reading file '{}': {}", layout_path.display(), e))?;
    let filename = layout_path.display().to_string();
    let layout = LayoutNode::from_slice(source.as_bytes()).map_err(|e| e.format(&source, &filename))?;

    let mut options = InstanceOptions::new();
    if adjust_ids {
        options = options.with_adjust_id(true);
    }
    if let Some(path) = replacements_path {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Error reading file '{}': {}", path.display(), e))?;
        let replacements: ReplacementMap = serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing replacements '{}': {}", path.display(), e))?;
        options = options.with_replacements(replacements);
    }

    let template = registry.define_template(Some(args.template.as_str())).map_err(describe)?;
    template.set_layout(layout);

    let instance = registry
        .resolve_or_create(args.id(), &args.template, options)
        .map_err(describe)?;
    let response = instance.initial_layout().map_err(describe)?;
    println!("{}", response.body_text());
    Ok(())
}

fn print_endpoints(registry: &Registry, args: &InstanceArgs) -> Result<(), String> {
    registry.define_template(Some(args.template.as_str())).map_err(describe)?;
    let instance = registry
        .resolve_or_create(args.id(), &args.template, InstanceOptions::new())
        .map_err(describe)?;

    for rule in instance.rules() {
        let methods: Vec<String> = rule
            .methods
            .iter()
            .map(|m| format!("{:?}", m).to_uppercase())
            .collect();
        println!("{:<6} {}", methods.join(","), rule.endpoint);
    }
    Ok(())
}

fn describe(error: BridgeError) -> String {
    match error.suggestions() {
        Some(suggestions) if !suggestions.is_empty() => {
            format!("Error: {} (did you mean: {}?)", error, suggestions.join(", "))
        }
        _ => format!("Error: {}", error),
    }
}

//! Sparrow CLI
//!
//! Open a page, list its forms and links, optionally fill and submit a form.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use sparrow_browser::{BrowserSession, SessionConfig};
use sparrow_forms::FormModel;
use sparrow_html::HtmlTree;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Sparrow, a headless form-aware browser
#[derive(Parser, Debug)]
#[command(name = "sparrow")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Print a page summary
    sparrow https://example.com

    # List forms and links
    sparrow --forms --links https://example.com/login

    # Fill the first form and submit it with its "login" button
    sparrow https://example.com/login --submit 0 \
        --set user=jo --set password=secret --button login
"#)]
struct Cli {
    /// URL to open
    #[arg(value_name = "URL")]
    url: String,

    /// List the forms of the page
    #[arg(long)]
    forms: bool,

    /// List the links of the page
    #[arg(long)]
    links: bool,

    /// Set a form field before submitting (repeatable)
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_assignment, requires = "submit")]
    set: Vec<(String, String)>,

    /// Submit the form with this index
    #[arg(long, value_name = "N")]
    submit: Option<usize>,

    /// Name or label of the submit button to click
    #[arg(long, value_name = "NAME", requires = "submit")]
    button: Option<String>,

    /// Session configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the User-Agent header
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Override the redirect limit
    #[arg(long, value_name = "N")]
    max_redirects: Option<usize>,

    /// Do not follow Refresh headers and meta refresh
    #[arg(long)]
    no_refresh: bool,

    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG wins
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_assignment(input: &str) -> Result<(String, String), String> {
    input
        .split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got `{input}`"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    debug!(?config, "session configuration");
    let mut session = BrowserSession::from_config(config)?;

    let document = session
        .open(&cli.url)
        .with_context(|| format!("failed to open {}", cli.url))?;
    print_summary(&document);
    if cli.forms {
        print_forms(&FormModel::all(&document));
    }
    if cli.links {
        print_links(&document);
    }

    let Some(index) = cli.submit else {
        return Ok(());
    };
    let mut form = session.form(index)?;
    for (name, value) in &cli.set {
        form.set_field(name, value)
            .with_context(|| format!("cannot set `{name}`"))?;
    }
    debug!(index, fields = cli.set.len(), "filling form");
    let submitter = cli
        .button
        .as_deref()
        .map(|button| {
            form.submitter_by_name(button)
                .with_context(|| format!("form {index} has no submit button `{button}`"))
        })
        .transpose()?;

    let result = session
        .submit_form(&form, submitter)
        .with_context(|| format!("failed to submit form {index}"))?;
    println!();
    print_summary(&result);
    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The configuration file, if any, with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid configuration in {}", path.display()))?
        }
        None => SessionConfig::default(),
    };
    if let Some(user_agent) = &cli.user_agent {
        config.user_agent.clone_from(user_agent);
    }
    if let Some(max_redirects) = cli.max_redirects {
        config.max_redirects = max_redirects;
    }
    if cli.no_refresh {
        config.follow_refresh = false;
    }
    Ok(config)
}

fn print_summary(document: &HtmlTree) {
    let title = document.title().unwrap_or_default();
    println!("{} {}", "==>".green().bold(), document.url().bold());
    if !title.is_empty() {
        println!("    {}", title.cyan());
    }
}

fn print_forms(forms: &[FormModel]) {
    println!("\n{}", "=== Forms ===".bold());
    if forms.is_empty() {
        println!("  (none)");
    }
    for (index, form) in forms.iter().enumerate() {
        let label = form.name().or_else(|| form.id()).unwrap_or("");
        let action = form
            .action()
            .map_or_else(|e| e.to_string().red().to_string(), |url| url.to_string());
        println!(
            "  [{}] {} {} {} ({})",
            index.yellow(),
            label.bold(),
            form.method(),
            action,
            form.enctype()
        );
        for control in form.controls() {
            let name = control.name().unwrap_or("-");
            let selected = control.selected_values().join(",");
            let value = if selected.is_empty() {
                control.value()
            } else {
                selected.as_str()
            };
            let line = format!("      {:<10} {name} = {value:?}", control.input_type());
            if control.is_disabled() {
                println!("{}", line.dimmed());
            } else {
                println!("{line}");
            }
        }
    }
}

fn print_links(document: &HtmlTree) {
    println!("\n{}", "=== Links ===".bold());
    for link in document.links() {
        println!("  {} {}", link.url.blue(), link.text);
    }
}

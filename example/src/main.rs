use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use theme_handlebars::{FunctionMap, Helper, Options, StaticTheme, Themes, add_builtins};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "example")]
#[command(about = "Compiles a theme and prints the helper tree of every template")]
struct Args {
    /// Directory holding one sub-directory per theme
    #[arg(long, default_value = "themes")]
    themes: PathBuf,

    /// Name of the theme to compile
    #[arg(long, default_value = "casper")]
    theme: String,

    /// Keep running and recompile whenever a template changes
    #[arg(long)]
    dev: bool,

    /// Quiet period before a burst of changes triggers a rebuild
    #[arg(long, default_value = "250")]
    debounce_ms: u64,
}

/// Renders a helper tree as an indented outline
fn outline(helper: &Helper, depth: usize, out: &mut String) {
    let arguments: Vec<&str> = helper
        .arguments
        .iter()
        .filter(|argument| argument.name != "else")
        .map(|argument| argument.name.as_str())
        .collect();
    out.push_str(&"  ".repeat(depth));
    out.push_str(&helper.name);
    if helper.unescaped {
        out.push_str(" (unescaped)");
    }
    if !arguments.is_empty() {
        out.push_str(" [");
        out.push_str(&arguments.join(", "));
        out.push(']');
    }
    out.push_str(&format!(" @{}\n", helper.position));
    for child in &helper.children {
        outline(child, depth + 1, out);
    }
    if let Some(else_helper) = helper.else_branch() {
        outline(else_helper, depth + 1, out);
    }
}

fn print_templates(themes: &Themes) {
    let snapshot = themes.snapshot();
    println!("theme {} (generation {})", snapshot.theme(), snapshot.generation());
    for name in snapshot.names() {
        if let Some(root) = snapshot.get(name) {
            let mut out = String::new();
            outline(root, 0, &mut out);
            print!("{}", out);
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "theme_handlebars=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let options = Options {
        themes_path: args.themes,
        dev_mode: args.dev,
        debounce_ms: args.debounce_ms,
        ..Options::default()
    };

    let mut functions = FunctionMap::new();
    add_builtins(&mut functions);

    let themes = Themes::load(options, StaticTheme(args.theme), functions)?;
    print_templates(&themes);

    if args.dev {
        info!(directories = ?themes.watched_directories(), "Watching theme for changes");
        let mut seen = themes.generation();
        loop {
            thread::sleep(Duration::from_millis(200));
            let generation = themes.generation();
            if generation != seen {
                seen = generation;
                print_templates(&themes);
            }
        }
    }
    Ok(())
}

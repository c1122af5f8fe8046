//! DJ CLI — runs an operations script over a dictionary stream.

use clap::Parser as ClapParser;
use dj_compiler::compiler::ast::Directive;
use dj_compiler::diagnostics::Diagnostic;
use dj_core::ops::PluginRegistry;
use dj_rt::driver::{self, DriverOptions};
use dj_rt::env::RuntimeEnv;
use dj_rt::output::OutputHub;
use log::LevelFilter;
use std::fs;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Exit code for script errors (lex, parse, resolve, config).
const EXIT_SCRIPT_ERROR: i32 = 2;
/// Exit code for I/O and runtime failures.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(ClapParser)]
#[command(
    name = "dj",
    version,
    about = "DJ — analyse, transform, filter, and generate dictionary entries",
    long_about = "DJ applies a script of chained operations to every entry of a\n\
                  dictionary, streaming results to files or standard output.\n\n\
                  Examples:\n  \
                  dj mangle.dj -d rockyou.txt\n  \
                  dj -i 'split \" \" report' -d words.txt\n  \
                  cat words.txt | dj -o ops.dj -u"
)]
struct Cli {
    /// Path to the script file
    script: Option<PathBuf>,

    /// Path to the script file (alternative to the positional argument)
    #[arg(short = 'o', long = "operations", value_name = "FILE")]
    operations: Option<PathBuf>,

    /// Inline script text
    #[arg(short = 'i', long = "inline", value_name = "SCRIPT")]
    inline: Option<String>,

    /// Input dictionary (default: standard input)
    #[arg(short = 'd', long = "dictionary", value_name = "FILE")]
    dictionary: Option<PathBuf>,

    /// Deduplicate all emissions globally
    #[arg(short = 'u', long = "unique")]
    unique: bool,

    /// Verbose (debug) logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Report wall-clock timing on stderr
    #[arg(short = 't', long = "timing")]
    timing: bool,

    /// Worker threads; 0 means one per CPU
    #[arg(short = 'j', long = "jobs", default_value_t = 1, value_name = "N")]
    jobs: usize,

    /// Log a progress line every N entries
    #[arg(long = "progress", value_name = "N")]
    progress: Option<u64>,

    /// Sleep this many milliseconds between entries
    #[arg(long = "pace", value_name = "MS")]
    pace: Option<u64>,

    /// Print the resolved script as JSON and exit
    #[arg(long = "emit-ast")]
    emit_ast: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(err) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("dj: failed to initialise logging: {}", err);
    }
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let (source, source_name) = match load_script(&cli) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("dj: {}", err);
            return EXIT_RUNTIME_ERROR;
        }
    };

    let plugins = PluginRegistry::new();
    let resolved = match dj_compiler::compile_source(&source, &plugins) {
        Ok(resolved) => resolved,
        Err(err) => {
            let diag = Diagnostic::from_compile_error(&err, &source, source_name.as_deref());
            eprint!("{}", diag.render_ansi());
            return EXIT_SCRIPT_ERROR;
        }
    };

    if cli.emit_ast {
        match serde_json::to_string_pretty(&resolved.script) {
            Ok(json) => {
                println!("{}", json);
                return 0;
            }
            Err(err) => {
                eprintln!("dj: {}", err);
                return EXIT_RUNTIME_ERROR;
            }
        }
    }

    let started = Instant::now();
    let hub = OutputHub::new(cli.unique);
    for directive in &resolved.script.directives {
        if let Directive::Create { path, .. } = directive {
            if let Err(err) = hub.create(path) {
                eprintln!("dj: cannot create '{}': {}", path, err);
                return EXIT_RUNTIME_ERROR;
            }
        }
    }

    let env = match RuntimeEnv::build(resolved, plugins) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("dj: {}", err);
            return EXIT_RUNTIME_ERROR;
        }
    };

    let opts = DriverOptions {
        jobs: cli.jobs,
        progress: cli.progress,
        pace: cli.pace.map(Duration::from_millis),
    };

    let result = match &cli.dictionary {
        Some(path) => match fs::File::open(path) {
            Ok(file) => driver::process(&env, &hub, BufReader::new(file), &opts),
            Err(err) => {
                eprintln!("dj: cannot open '{}': {}", path.display(), err);
                return EXIT_RUNTIME_ERROR;
            }
        },
        None => {
            let stdin = io::stdin();
            driver::process(&env, &hub, stdin.lock(), &opts)
        }
    };

    match result {
        Ok(stats) => {
            if cli.timing {
                eprintln!(
                    "dj: {} entries, {} lines emitted in {:.3}s",
                    stats.entries,
                    stats.lines_emitted,
                    started.elapsed().as_secs_f64()
                );
            }
            0
        }
        Err(err) => {
            let _ = hub.flush_all();
            eprintln!("dj: {}", err);
            EXIT_RUNTIME_ERROR
        }
    }
}

/// Exactly one script source: positional path, `-o`, or `-i`.
fn load_script(cli: &Cli) -> Result<(String, Option<String>), String> {
    let sources = [
        cli.script.is_some(),
        cli.operations.is_some(),
        cli.inline.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();
    if sources != 1 {
        return Err("pass exactly one script source: a path, -o FILE, or -i SCRIPT".to_string());
    }
    if let Some(text) = &cli.inline {
        return Ok((text.clone(), None));
    }
    let path = cli
        .script
        .as_ref()
        .or(cli.operations.as_ref())
        .expect("one source is present");
    match fs::read_to_string(path) {
        Ok(source) => Ok((source, Some(path.display().to_string()))),
        Err(err) => Err(format!("cannot read '{}': {}", path.display(), err)),
    }
}

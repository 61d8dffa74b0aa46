//! Thin plan-mode binary: load a marshaled snapshot and a command script,
//! validate the script against the snapshot, dry-run it and print the
//! report. Real cloud drivers are wired in by embedding the library.

use std::{env, fs, process};

use tracing_subscriber::EnvFilter;

use stratus::driver::DriverRegistry;
use stratus::error::{Result, StratusError};
use stratus::graph::Graph;
use stratus::printer::Printer;
use stratus::runner::Runner;
use stratus::script::Template;
use stratus::settings::Settings;
use stratus::validation::UniqueNameValidator;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    if let Err(e) = run() {
        eprintln!("stratus: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let (snapshot_path, script_path) = match (args.next(), args.next()) {
        (Some(snapshot), Some(script)) => (snapshot, script),
        _ => {
            eprintln!("usage: stratus <snapshot.triples> <script>");
            return Err(StratusError::Config("missing arguments".to_owned()));
        }
    };

    let settings = Settings::load()?;
    let graph = Graph::unmarshal(&fs::read_to_string(&snapshot_path)?)?;
    let mut template = Template::parse(&fs::read_to_string(&script_path)?)?;

    let lookup = |_kind: &str| -> Option<&Graph> { Some(&graph) };
    let unique_names = UniqueNameValidator { lookup: &lookup };
    let errs = template.validate(&[&unique_names]);
    if !errs.is_empty() {
        for e in &errs {
            eprintln!("stratus: {}", e);
        }
        return Err(StratusError::Validation(
            "template validation failed".to_owned(),
        ));
    }

    let registry = DriverRegistry::offline_for(&template);
    let mut runner = Runner::new(&registry, Some(&lookup));
    runner.dry_run(&mut template)?;

    let printer = Printer {
        include_errs: settings.detailed_errors,
    };
    print!("{}", printer.print_report(&template));
    Ok(())
}

mod cli;

use clap::Parser;
use cli::{Cli, Commands, StyleOptions};
use sbcss_core::{
    compile_to_module, Config, Error, FsResolver, Generator, GeneratorOptions, StyleSheet,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr, and only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Build {
            inputs,
            output,
            options,
        } => build(&inputs, output.as_deref(), &generator_options(&options)?),
        Commands::Module { input, options } => {
            let source = fs::read_to_string(&input).map_err(|source| Error::Io {
                path: input.clone(),
                source,
            })?;
            let options = generator_options(&options)?;
            let module = compile_to_module(&source, &input, &FsResolver, &options)?;
            print!("{}", module);
            Ok(())
        }
    }
}

fn generator_options(options: &StyleOptions) -> Result<GeneratorOptions, Error> {
    let config = match &options.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut generator_options = config.generator_options();
    if let Some(divider) = &options.divider {
        generator_options.namespace_divider = divider.clone();
    }
    Ok(generator_options)
}

fn build(
    inputs: &[PathBuf],
    output: Option<&Path>,
    options: &GeneratorOptions,
) -> Result<(), Error> {
    let sheets = inputs
        .iter()
        .map(|path| StyleSheet::from_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let generation = Generator::new(options.clone(), &FsResolver).generate(&sheets)?;
    for diagnostic in &generation.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }

    let css = generation.css();
    match output {
        Some(path) => {
            fs::write(path, &css).map_err(|source| Error::Write {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(
                path = %path.display(),
                rules = generation.rules.len(),
                "wrote style sheet"
            );
        }
        None => print!("{}", css),
    }
    Ok(())
}

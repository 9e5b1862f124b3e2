//! Main module.
//
// All rights reserved 2021 (c) The Hash Language authors

mod args;
mod error;

use std::fs;
use std::time::Instant;

use clap::Parser;
use error::CliError;
use glsl_pipeline::{compile_shader, compiler_create, compiler_destroy, Shader};
use log::log_enabled;

fn main() {
    execute(run)
}

fn execute(f: impl FnOnce() -> Result<(), CliError>) {
    if let Err(e) = f() {
        e.report_and_exit();
    }
}

fn run() -> Result<(), CliError> {
    pretty_env_logger::init();

    let opts = args::CompilerOptions::parse();
    if opts.debug {
        println!("optimisation level: {:?}", opts.optimisation_level);
    }

    let (settings, filename, kind_arg) = opts.resolve()?;
    let kind = args::infer_kind(kind_arg, &filename)?;
    let source = fs::read_to_string(&filename)?;

    let compiler = compiler_create(settings);
    let mut shader = Shader::new(kind, source);

    let ok = timed(
        || compile_shader(&compiler, &mut shader),
        log::Level::Debug,
        |elapsed| log::debug!("compiled {filename} in {elapsed:?}"),
    );

    if !shader.log_text().is_empty() {
        eprint!("{}", shader.log_text());
    }

    compiler_destroy(compiler);

    if !ok {
        std::process::exit(1);
    }
    if let Some(il) = shader.il() {
        println!("{il}");
    }
    Ok(())
}

#[inline(always)]
fn timed<T>(op: impl FnOnce() -> T, level: log::Level, on_elapsed: impl FnOnce(std::time::Duration)) -> T {
    if log_enabled!(level) {
        let begin = Instant::now();
        let result = op();
        on_elapsed(begin.elapsed());
        result
    } else {
        op()
    }
}

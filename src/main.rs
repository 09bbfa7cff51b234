use std::{env, io, process};

use skipkv::{cli::Dispatcher, Options, SkipList};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut options = Options::default();
    if let Some(path) = env::args_os().nth(1) {
        options = options.dump_path(path);
    }
    if let Ok(seed) = env::var("SKIPKV_SEED") {
        match seed.parse() {
            Ok(seed) => options = options.seed(seed),
            Err(e) => {
                eprintln!("invalid SKIPKV_SEED {:?}: {}", seed, e);
                process::exit(2);
            }
        }
    }

    let dispatcher = Dispatcher::new(SkipList::new(options));
    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    if let Err(e) = dispatcher.run(stdin.lock(), &mut stdout.lock(), &mut stderr.lock()) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

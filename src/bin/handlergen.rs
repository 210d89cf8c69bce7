use handlergen::cli::run_cli;
use handlergen::logging::{init_logging, LogConfig};

fn main() {
    if let Err(err) = init_logging(&LogConfig::from_env()) {
        eprintln!("Warning: {err:#}");
    }
    match run_cli() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}

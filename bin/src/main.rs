use std::process::exit;

use persistance::fs::{get_config_location, get_templates_location, read_config, ConfigError};
use www::{ServerContext, ServerHandle};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let args = std::env::args().skip(1).collect::<Vec<String>>();
    for arg in args.iter() {
        match arg.as_ref() {
            "-v" | "--version" => return print_version(),
            "-h" | "--help" => return print_help(),
            "-i" | "--init" => return init(),
            _ => {
                eprintln!("unknown option: {}", arg);
                exit(1);
            }
        }
    }
    let config = match read_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };
    let ctx = match ServerContext::from_config(&config) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };
    let mut handle = ServerHandle::new();
    let addr = match handle.start(ctx) {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };
    println!("Serving documents at http://{}", addr);
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("could not listen for shutdown signal: {}", err);
    }
    handle.stop();
}

/// Writes a default config file and the templates directory, then reports
/// where they live.
fn init() {
    if let Err(err) = try_init() {
        eprintln!("{}", err);
        exit(1);
    }
}

fn try_init() -> Result<(), ConfigError> {
    read_config()?;
    let templates = get_templates_location()?;
    std::fs::create_dir_all(&templates)?;
    let (_, config_path) = get_config_location()?;
    println!(
        "Config file found at \x1b[38;5;47m{:#?}\x1b[0m\nTemplates found at \x1b[38;5;37m{:#?}\x1b[0m",
        config_path, templates
    );
    Ok(())
}

fn print_version() {
    println!("mdserve v{}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    print!(
        "Usage: mdserve [options]
        Options:
        -i, --init                   Initialize config file and templates directory
        -v, --version                Print version.
        -h, --help                   Show this message.
        ",
    );
}

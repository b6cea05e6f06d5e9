use {
    arbor::{
        config::Config,
        router::{router, AppState},
        snapshot,
    },
    log::info,
    std::{env, process},
};

fn main() {
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.ini".to_owned());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("cannot load configuration from {config_path}: {err}");
            process::exit(1);
        }
    };

    // RUST_LOG still wins when set; the environment only picks the default.
    let default_level = if config.is_production() { "error" } else { "debug" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let forest = match snapshot::bootstrap(&config.data_file) {
        Ok(forest) => forest,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };
    info!("loaded forest from {}", config.data_file.display());

    let addr = format!("0.0.0.0:{}", config.port);
    info!("listening for requests at http://{addr}");
    let app_state = AppState::new(forest, config.data_file.clone());
    if let Err(err) = gotham::start(addr, router(app_state)) {
        eprintln!("server failed to start: {err}");
        process::exit(1);
    }
}

use clap::Parser;
use clap::error::ErrorKind;
use remind_cli::bot::{Bot, ChatNotifier};
use remind_cli::cli::{Cli, collect_overrides, normalize_parse_error};
use remind_cli::render;
use remind_core::clock::{Clock, SystemClock};
use remind_core::config::{Config, load_config_with_fallback, merge_overrides};
use remind_core::error::AppError;
use remind_core::notify::desktop_notifier;
use remind_core::storage::TaskStore;
use remind_core::storage::json_store;
use remind_core::task_api::{TaskApi, TaskApiBuilder};
use std::io;
use std::sync::Arc;

fn load_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        log::warn!("ignoring config file: {err}");
    }
    let overrides = collect_overrides(raw_overrides)?;
    Ok(merge_overrides(&loaded.config, &overrides))
}

fn clock_for(config: &Config) -> Result<Arc<dyn Clock>, AppError> {
    let clock = match config.offset()? {
        Some(offset) => SystemClock::new(offset),
        None => SystemClock::local(),
    };
    log::debug!("using utc offset {}", clock.offset());
    Ok(Arc::new(clock))
}

fn api_builder(config: &Config) -> Result<TaskApiBuilder, AppError> {
    // The clock reads the local offset, so it has to exist before any thread.
    let clock = clock_for(config)?;
    let path = json_store::store_path(config.store_path.as_deref())?;
    let store = TaskStore::open(&path)?;
    log::info!("using task store {}", store.path().display());

    let mut builder = TaskApi::builder(store, clock);
    if config.desktop_notifications {
        builder = builder.with_notifier(desktop_notifier()?);
    }
    Ok(builder)
}

fn run_bot(config: &Config) -> Result<(), AppError> {
    let api = api_builder(config)?
        .with_notifier(Box::new(ChatNotifier))
        .build();

    let missed = api.reconcile()?;
    api.start()?;

    let today = api.now().date();
    println!("{}", render::BANNER);
    if let Some(message) = render::missed(&missed, today) {
        println!("{message}");
    }

    let bot = Bot::new(api);
    let outcome = bot.run(io::stdin().lock(), io::stdout());
    bot.api().shutdown();
    outcome
}

fn run_once(cli: &Cli, config: &Config) -> Result<(), AppError> {
    let Some(command) = cli.command.as_ref() else {
        return run_bot(config);
    };

    let bot = Bot::new(api_builder(config)?.build());
    let reply = bot.execute(command)?;
    if cli.json {
        println!("{}", reply.json);
    } else {
        println!("{}", reply.text);
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let result = load_config(&cli.config_override).and_then(|config| run_once(&cli, &config));
    if let Err(err) = result {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

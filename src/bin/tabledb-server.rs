//! this binary starts the tabledb server
//! to see the list of options, type: `tabledb-server --help`

use std::net::TcpListener;
use std::path::Path;
use std::process::exit;
use std::thread;

use clap::{arg_enum, crate_version, value_t, App, Arg, ArgMatches};
use crossbeam::channel;
use tabledb::{
    AdmissionController, CsvTable, RayonThreadPool, Result, Router, ServerConfig, ServerEvent,
    SharedQueueThreadPool, ShutdownHandle, TableConfig, TableError, TableServer, ThreadPool,
};
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

arg_enum! {
    #[allow(non_camel_case_types)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Pool {
        shared,
        rayon
    }
}

const DEFAULT_POOL: Pool = Pool::shared;

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    config: ServerConfig,
    pool: Pool,
}

impl Opt {
    /// reads the configuration file, if one was given, and applies the command line flags on top
    /// of it.
    /// # Errors
    /// returns [`TableError::Parsing`] or [`TableError::Config`] if one of the options is invalid
    fn build(matches: &ArgMatches) -> Result<Opt> {
        let mut config = match matches.value_of("config") {
            Some(path) => ServerConfig::from_file(Path::new(path))?,
            None => ServerConfig::default(),
        };

        if let Some(addr) = matches.value_of("addr") {
            config.addr = addr.to_string();
        }
        if matches.is_present("max-sessions") {
            config.max_sessions = value_t!(matches, "max-sessions", usize)
                .map_err(|e| TableError::Parsing(e.message))?;
        }
        if matches.is_present("grace-period") {
            config.grace_period_secs = value_t!(matches, "grace-period", f64)
                .map_err(|e| TableError::Parsing(e.message))?;
        }
        if matches.is_present("threads") {
            config.threads = Some(
                value_t!(matches, "threads", u32).map_err(|e| TableError::Parsing(e.message))?,
            );
        }
        if let Some(dir) = matches.value_of("data-dir") {
            config.data_dir = dir.into();
        }
        if let Some(kinds) = matches.values_of("table") {
            config.tables = kinds.map(TableConfig::new).collect();
        }
        config.validate()?;

        let pool = value_t!(matches, "pool", Pool).unwrap_or(DEFAULT_POOL);
        Ok(Opt { config, pool })
    }
}

fn main() {
    // parse command line args
    let matches = App::new("tabledb-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a multi-threaded record store over CSV backed tables")
        .arg(Arg::with_name("config")
            .long("config")
            .value_name("FILE")
            .help("reads settings from a JSON configuration file"))
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT that the server listens on [default: 127.0.0.1:7000]"))
        .arg(Arg::with_name("max-sessions")
            .long("max-sessions")
            .value_name("COUNT")
            .help("sets the maximum number of concurrent sessions [default: 5]"))
        .arg(Arg::with_name("grace-period")
            .long("grace-period")
            .value_name("SECONDS")
            .help("sets how long the server waits without sessions before shutting down [default: 10]"))
        .arg(Arg::with_name("threads")
            .long("threads")
            .value_name("COUNT")
            .help("sets the number of worker threads [default: max-sessions]"))
        .arg(Arg::with_name("data-dir")
            .long("data-dir")
            .value_name("DIR")
            .help("sets the directory table files are kept in [default: .]"))
        .arg(Arg::with_name("table")
            .long("table")
            .value_name("KIND")
            .multiple(true)
            .number_of_values(1)
            .help("serves a table of the given record kind, the first one is the primary table [default: DemoData]"))
        .arg(Arg::with_name("pool")
            .long("pool")
            .value_name("POOL")
            .possible_values(&Pool::variants())
            .help("sets the thread pool to use, either 'shared' or 'rayon'")
            .default_value("shared"))
        .arg(Arg::with_name("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .possible_values(&["error", "warn", "info", "debug", "trace"])
            .help("sets the most verbose level that is logged")
            .default_value("info"))
        .get_matches();

    // set up a tracing subscriber to log to STDERR
    let level = value_t!(matches, "log-level", Level).unwrap_or(Level::INFO);
    subscriber_config(level);

    // validate command line options, store them in Opt
    let opt = match Opt::build(&matches) {
        Ok(opt) => opt,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    // start the server
    if let Err(e) = run(opt) {
        eprintln!("{}", e);
        exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    info!("tabledb-server {}", env!("CARGO_PKG_VERSION"));
    info!("Thread pool: {}", opt.pool);

    let config = opt.config;
    let tables = config.open_tables()?;
    let listener = TcpListener::bind(config.socket_addr()?)?;
    info!("Listening on {}", listener.local_addr()?);

    let shutdown = ShutdownHandle::new(listener.local_addr()?);
    let on_idle = shutdown.clone();
    let admission = AdmissionController::new(config.max_sessions, config.grace_period(), move || {
        on_idle.trigger()
    })?;
    let router = Router::new(tables, admission)?;

    match opt.pool {
        Pool::shared => run_with_pool(
            router,
            SharedQueueThreadPool::new(config.worker_threads())?,
            listener,
            shutdown,
        ),
        Pool::rayon => run_with_pool(
            router,
            RayonThreadPool::new(config.worker_threads())?,
            listener,
            shutdown,
        ),
    }
}

fn run_with_pool<P: ThreadPool>(
    router: Router<CsvTable>,
    pool: P,
    listener: TcpListener,
    shutdown: ShutdownHandle,
) -> Result<()> {
    let (tx, rx) = channel::unbounded();
    let view = thread::Builder::new()
        .name("server-events".into())
        .spawn(move || log_events(rx))?;

    TableServer::new(router, pool)
        .with_events(tx)
        .run(listener, shutdown)?;

    // the server has dropped its sender, so the event thread drains and returns
    if view.join().is_err() {
        error!("the server event thread panicked");
    }
    Ok(())
}

/// reports server events, standing in for a status display
fn log_events(rx: channel::Receiver<ServerEvent>) {
    for event in rx {
        match event {
            ServerEvent::Responded {
                method,
                status,
                body,
                active_sessions,
                records,
            } => debug!(%method, status, %body, active_sessions, records, "responded"),
            ServerEvent::Stopped => info!("server stopped, shutting down"),
        }
    }
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config(level: Level) {
    let subscriber = FmtSubscriber::builder()
        // all spans/events with a level at or above `level` will be written
        .with_max_level(level)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}

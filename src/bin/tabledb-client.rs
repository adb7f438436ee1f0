//! The tabledb-client executable supports the following command line arguments:
//!
//! `tabledb-client probe [--addr IP-PORT]`
//!
//!     Asks the server to admit a new session. Prints "Request Success" or "Request Failed".
//!
//! `tabledb-client generate-id [--addr IP-PORT]`
//!
//!     Creates a new user in every table and prints its identity.
//!
//! `tabledb-client close <ID>` / `tabledb-client delete <ID>`
//!
//!     Ends the session of a user, or removes the user from every table and ends its session.
//!
//! `tabledb-client get-name <ID>` / `tabledb-client get-score <ID>`
//!
//!     Prints the name or score of a user.
//!
//! `tabledb-client set-name <ID> <NAME>` / `tabledb-client set-score <ID> <SCORE>`
//!
//!     Sets the name or score of a user.
//!
//! `tabledb-client ranking <FROM> <TO>`
//!
//!     Prints ranks FROM through TO of the score ranking, highest score first.
//!
//! `tabledb-client user-data <ID> <KIND>`
//!
//!     Prints every field of a user from the table of the given record kind.
//!
//! --addr accepts an IP address, either v4 or v6, and a port number, with the format IP:PORT.
//! If --addr is not specified then connect on 127.0.0.1:7000.
//! An error is printed and a non-zero exit code returned on server or connection errors, if
//! IP-PORT does not parse as an address, or if a mutating request answers "Request Failed".
//!
//! `tabledb-client -V`
//!
//!     Print the version.

use std::net::SocketAddr;
use std::process::exit;

use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use tabledb::{Operation, Request, Result, TableClient, TableError};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_ADDRESS: &str = "127.0.0.1:7000";

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    /// the server's ip:port
    addr: SocketAddr,
    req: Request,
}

impl Opt {
    fn new(addr: SocketAddr, req: Request) -> Self {
        Self { addr, req }
    }

    /// validates the `addr` parameter is a valid IP address and PORT
    /// returns `Ok<Opt>` if everything is valid
    /// # Errors
    /// returns [`TableError::Parsing`] if one of the parameters is invalid
    ///
    fn build(addr: &str, req: Request) -> Result<Opt> {
        let addr: SocketAddr = addr.parse().map_err(|_| {
            TableError::Parsing(format!("could not parse {} into an IP address and port", &addr))
        })?;

        Ok(Opt::new(addr, req))
    }
}

fn main() {
    // configure a subscriber that will log messages to STDERR
    subscriber_config();

    let id = || Arg::with_name("ID").required(true).index(1);
    let matches = App::new("tabledb-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("talks to a tabledb server")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommands(vec![
            SubCommand::with_name("probe").about("Asks the server to admit a new session"),
            SubCommand::with_name("generate-id").about("Creates a new user and prints its identity"),
            SubCommand::with_name("close")
                .about("Ends the session of a user")
                .arg(id()),
            SubCommand::with_name("delete")
                .about("Removes a user from every table")
                .arg(id()),
            SubCommand::with_name("get-name")
                .about("Prints the name of a user")
                .arg(id()),
            SubCommand::with_name("get-score")
                .about("Prints the score of a user")
                .arg(id()),
            SubCommand::with_name("set-name")
                .about("Sets the name of a user")
                .arg(id())
                .arg(Arg::with_name("NAME").required(true).index(2)),
            SubCommand::with_name("set-score")
                .about("Sets the score of a user")
                .arg(id())
                .arg(Arg::with_name("SCORE").required(true).index(2)),
            SubCommand::with_name("ranking")
                .about("Prints a slice of the score ranking")
                .arg(Arg::with_name("FROM").required(true).index(1))
                .arg(Arg::with_name("TO").required(true).index(2)),
            SubCommand::with_name("user-data")
                .about("Prints every field of a user from the table of a record kind")
                .arg(id())
                .arg(Arg::with_name("KIND").required(true).index(2)),
        ])
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT of the server to connect to")
            .default_value(DEFAULT_ADDRESS)
            .global(true))
        .get_matches();

    // parse commands into an Opt struct, then run the request
    if let Err(e) = parse_options(&matches).and_then(run) {
        eprintln!("{}", e);
        exit(1);
    }
}

/// runs the specified request on a [`TableClient`]
/// `opt` contains the server address and the request to send
fn run(opt: Opt) -> Result<()> {
    let client = TableClient::connect(opt.addr)?;
    let ok = |done: bool, what: &str| {
        if done {
            Ok(())
        } else {
            Err(TableError::Protocol(format!("{} failed", what)))
        }
    };

    match opt.req {
        Request::Probe => {
            let admitted = client.probe()?;
            println!("{}", if admitted { tabledb::SUCCESS } else { tabledb::FAILED });
            ok(admitted, "probe")
        }
        Request::Command(op) => match op {
            Operation::GenerateId => {
                println!("{}", client.generate_id()?);
                Ok(())
            }
            Operation::CloseClient { id } => ok(client.close_client(&id)?, "close"),
            Operation::DeleteUserData { id } => ok(client.delete_user_data(&id)?, "delete"),
            Operation::GetName { id } => print_data(client.get_name(&id)?),
            Operation::GetScore { id } => print_data(client.get_score(&id)?),
            Operation::SetName { id, name } => ok(client.set_name(&id, &name)?, "set-name"),
            Operation::SetScore { id, score } => ok(client.set_score(&id, &score)?, "set-score"),
            Operation::GetRanking { from, to } => {
                println!("{}", client.get_ranking(from, to)?);
                Ok(())
            }
            Operation::GetUserData { id, kind } => print_data(client.get_user_data(&id, &kind)?),
        },
    }
}

fn print_data(data: Option<String>) -> Result<()> {
    match data {
        Some(data) => println!("{}", data),
        None => println!("User not found"),
    }
    Ok(())
}

/// parses the matches from the command line into an [`Opt`] struct
fn parse_options(matches: &ArgMatches) -> Result<Opt> {
    let (name, args) = match matches.subcommand() {
        (name, Some(args)) => (name, args),
        _ => return Err(TableError::Parsing("no command given".to_string())),
    };
    let addr = args
        .value_of("addr")
        .or_else(|| matches.value_of("addr"))
        .unwrap_or(DEFAULT_ADDRESS);
    let arg = |key: &str| args.value_of(key).map(String::from).unwrap_or_default();
    let rank = |key: &str| {
        arg(key)
            .parse::<usize>()
            .map_err(|_| TableError::Parsing(format!("{} must be a positive number", key)))
    };

    let op = match name {
        "probe" => return Opt::build(addr, Request::Probe),
        "generate-id" => Operation::GenerateId,
        "close" => Operation::CloseClient { id: arg("ID") },
        "delete" => Operation::DeleteUserData { id: arg("ID") },
        "get-name" => Operation::GetName { id: arg("ID") },
        "get-score" => Operation::GetScore { id: arg("ID") },
        "set-name" => Operation::SetName {
            id: arg("ID"),
            name: arg("NAME"),
        },
        "set-score" => Operation::SetScore {
            id: arg("ID"),
            score: arg("SCORE"),
        },
        "ranking" => Operation::GetRanking {
            from: rank("FROM")?,
            to: rank("TO")?,
        },
        "user-data" => Operation::GetUserData {
            id: arg("ID"),
            kind: arg("KIND"),
        },
        other => return Err(TableError::Parsing(format!("unknown command {}", other))),
    };
    Opt::build(addr, Request::Command(op))
}

/// configures a tracing subscriber that will log warnings and errors to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}

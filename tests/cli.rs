use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;
use walkdir::WalkDir;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn client(addr: &str, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("tabledb-client").unwrap();
    cmd.args(args).args(&["--addr", addr]);
    cmd
}

fn wait_for_listener(addr: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while TcpStream::connect(addr).is_err() {
        assert!(Instant::now() < deadline, "server never started listening");
        thread::sleep(Duration::from_millis(50));
    }
}

fn wait_for_exit(child: &mut Child, within: Duration) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return status.success();
        }
        thread::sleep(Duration::from_millis(50));
    }
    let _ = child.kill();
    panic!("server did not exit in time");
}

#[test]
fn client_cli_version() {
    Command::cargo_bin("tabledb-client")
        .unwrap()
        .args(&["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn server_cli_version() {
    Command::cargo_bin("tabledb-server")
        .unwrap()
        .args(&["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn client_cli_no_args() {
    Command::cargo_bin("tabledb-client")
        .unwrap()
        .assert()
        .failure();
}

#[test]
fn client_cli_invalid_commands() {
    let addr = "127.0.0.1:7000";
    client(addr, &["get-score"]).assert().failure();
    client(addr, &["set-score", "u1"]).assert().failure();
    client(addr, &["ranking", "one", "3"]).assert().failure();
    client(addr, &["user-data", "u1"]).assert().failure();
    client(addr, &["dance"]).assert().failure();
    client("not-an-address", &["probe"]).assert().failure();
}

#[test]
fn client_cli_no_server() {
    let addr = format!("127.0.0.1:{}", free_port());
    client(&addr, &["probe"]).assert().failure();
}

#[test]
fn server_cli_invalid_options() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let data_dir = temp_dir.path().to_str().unwrap();
    let server = || {
        let mut cmd = Command::cargo_bin("tabledb-server").unwrap();
        cmd.args(&["--data-dir", data_dir]);
        cmd
    };

    server().args(&["--addr", "nonsense"]).assert().failure();
    server().args(&["--max-sessions", "0"]).assert().failure();
    server().args(&["--max-sessions", "many"]).assert().failure();
    server().args(&["--grace-period", "-3"]).assert().failure();
    server().args(&["--pool", "naive"]).assert().failure();
    server().args(&["--table", "NoSuchKind"]).assert().failure();
    server()
        .args(&["--config", temp_dir.path().join("missing.json").to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn serves_until_idle() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let addr = format!("127.0.0.1:{}", free_port());

    let mut server = Command::cargo_bin("tabledb-server")
        .unwrap()
        .args(&[
            "--addr",
            addr.as_str(),
            "--data-dir",
            temp_dir.path().to_str().unwrap(),
            "--table",
            "DemoData",
            "--table",
            "ScoreData",
            "--grace-period",
            "1",
            "--log-level",
            "warn",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    wait_for_listener(&addr);

    client(&addr, &["probe"])
        .assert()
        .success()
        .stdout(contains("Request Success"));

    let output = client(&addr, &["generate-id"]).output().unwrap();
    assert!(output.status.success());
    let id = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert_eq!(id.len(), 8);

    client(&addr, &["set-score", &id, "42"]).assert().success();
    client(&addr, &["set-score", &id, "lots"]).assert().failure();
    client(&addr, &["get-score", &id])
        .assert()
        .success()
        .stdout(contains("42"));
    client(&addr, &["ranking", "1", "5"])
        .assert()
        .success()
        .stdout(contains("42"));
    client(&addr, &["user-data", &id, "ScoreData"])
        .assert()
        .success()
        .stdout(contains("Score:42"));
    client(&addr, &["close", &id]).assert().success();

    // no session is active, so the server stops once the grace period is over
    assert!(wait_for_exit(&mut server, Duration::from_secs(10)));

    let files: Vec<_> = WalkDir::new(temp_dir.path())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 2);
    assert!(files.contains(&"DemoData.csv".to_string()));
    assert!(files.contains(&"ScoreData.csv".to_string()));
}

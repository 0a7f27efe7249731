// Runs the tether-hello binary against a live echo peer
use std::net::TcpListener;
use std::process::Command;

use clap::Parser;
use tether_client::{exchange, HelloArgs};
use tether_echo::EchoServer;

fn spawn_echo() -> String {
    let server = EchoServer::bind(&"127.0.0.1:0".parse().unwrap()).unwrap();
    let (endpoint, _accept) = server.spawn(1).unwrap();
    endpoint.to_string()
}

fn hello() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tether-hello"));
    cmd.env_remove("TETHER_ENDPOINT").env_remove("TETHER_LOG");
    cmd
}

#[test]
fn prints_echoed_reply_and_succeeds() {
    let endpoint = spawn_echo();
    let output = hello()
        .args(["--endpoint", &endpoint, "--io-timeout-ms", "10000"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    // Single receive may be short; the echo of "hello" arrives as a prefix at worst
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.trim_end_matches('\n');
    assert!(!line.is_empty() && "hello".starts_with(line), "stdout: {:?}", stdout);
}

#[test]
fn terminator_is_stripped_from_output() {
    let endpoint = spawn_echo();
    let output = hello()
        .args(["--endpoint", &endpoint, "--terminator", "-m", "bye"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!output.stdout.contains(&0));
}

#[test]
fn exits_non_zero_when_connect_fails() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let output = hello()
        .args(["--endpoint", &addr.to_string(), "--connect-timeout-ms", "2000"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not connect"));
}

#[test]
fn library_exchange_returns_reply_bytes() {
    let endpoint = spawn_echo();
    let args = HelloArgs::try_parse_from(["tether-hello", "--endpoint", &endpoint, "--max-len", "5"])
        .unwrap();
    let reply = exchange(&args, args.config().unwrap()).unwrap();
    assert!(!reply.is_empty() && reply.len() <= 5);
    assert!(b"hello".starts_with(&reply));
}

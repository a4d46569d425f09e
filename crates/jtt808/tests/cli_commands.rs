#![cfg(feature = "cli")]

use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const HEARTBEAT_FRAME: &str = "7e000200000191610170010005867e";

fn jtt808() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_jtt808"));
    command.arg("--log-level").arg("error");
    command
}

fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind should work");
    let addr = listener.local_addr().expect("local addr");
    addr.to_string()
}

fn wait_for_listener(addr: &str, timeout: Duration) {
    let start = Instant::now();
    loop {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("server did not start listening on {addr}");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn start_server(addr: &str) -> Server {
    let child = jtt808()
        .arg("--format")
        .arg("pretty")
        .arg("serve")
        .arg(addr)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve should start");
    let server = Server(child);
    wait_for_listener(addr, Duration::from_secs(5));
    server
}

fn send(addr: &str, extra: &[&str]) -> Output {
    jtt808()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(addr)
        .args(extra)
        .output()
        .expect("send should run")
}

#[test]
fn decode_prints_location_report_as_json() {
    let output = jtt808()
        .arg("--format")
        .arg("json")
        .arg("decode")
        .arg(concat!(
            "7e02000149019161017001000000000000000040000158708c06c94a6e00000000000016101710275654470a",
            "ec26cad75fdec1dc9c9fcdf89cbb9c216ade77b2b8c83a354e4ab8b5388345ac2af4b31cfa6883aafcb3a429",
            "40641e5db1b0411d0abae2aef8dfa8f07d0140adec26ca1986e6adef7be60a0601cc000024900e6100000000",
            "ffaa00000000000001cc000024900e6d00000000ffae00000000000001cc00002490128600000000ffa30000",
            "0000000001cc000024900e6b00000000ffa100000000000001cc000024900ffd00000000ff9b000000000000",
            "01cc00002490114500000000ff9a000000000000fe65e602000162f2000c000151800100000000000000f300",
            "0102f400010ef5000100f900040000063520000a898602b513165013127007002e563a392e302e3030305432",
            "323b4353513a31342c302c312c312c302c322c302c302c313031383130303935312c303a7e",
        ))
        .output()
        .expect("decode should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("stdout is json");
    assert_eq!(json["message_name"], "LOCATION_REPORT");
    assert_eq!(json["message"]["header"]["phone"], 19_161_017_001u64);
    assert_eq!(json["message"]["body"]["kind"], "location_report");
    assert_eq!(
        json["message"]["body"]["data"]["basic"]["timestamp"],
        "2016-10-17T10:27:56+08:00"
    );
}

#[test]
fn decode_failure_returns_60() {
    let output = jtt808()
        .arg("decode")
        .arg(HEARTBEAT_FRAME)
        .output()
        .expect("decode should run");

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not supported"));
}

#[test]
fn decode_rejects_bad_hex_with_usage() {
    let output = jtt808()
        .arg("decode")
        .arg("7e0g")
        .output()
        .expect("decode should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let output = jtt808().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("jtt808 "));
}

#[test]
fn server_acknowledges_location_report() {
    let addr = free_addr();
    let _server = start_server(&addr);

    let output = send(&addr, &["--count", "2", "--interval", "10ms"]);
    assert!(
        output.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let acks: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is json"))
        .collect();
    assert_eq!(acks.len(), 2);
    for (serial, ack) in acks.iter().enumerate() {
        assert_eq!(ack["message_name"], "SERVER_RESPONSE");
        assert_eq!(ack["message"]["header"]["serial_num"], serial as u64);
        assert_eq!(ack["message"]["body"]["data"]["message_id"], 0x0200);
        assert_eq!(ack["message"]["body"]["data"]["result"], 0);
    }
}

#[test]
fn server_acknowledges_unsupported_message_with_failure() {
    let addr = free_addr();
    let _server = start_server(&addr);

    let output = send(&addr, &["--hex", HEARTBEAT_FRAME]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let ack: serde_json::Value = serde_json::from_str(stdout.trim()).expect("stdout is json");
    assert_eq!(ack["message"]["body"]["data"]["message_id"], 0x0002);
    assert_eq!(ack["message"]["body"]["data"]["serial_num"], 5);
    assert_eq!(ack["message"]["body"]["data"]["result"], 1);
}

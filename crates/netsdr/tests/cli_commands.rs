#![cfg(feature = "cli")]

use std::net::{SocketAddr, UdpSocket};
use std::process::Command;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use netsdr::codec::{
    decode_slice, encode_control_item, encode_data_item_with_sequence, ControlItemCode, Frame,
    MessageType,
};

fn netsdr() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_netsdr"));
    command.env_remove("NETSDR_LOG").env_remove("NETSDR_CONFIG");
    command.arg("--log-level").arg("error");
    command
}

fn fake_receiver() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("fake receiver should bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
    let addr = socket.local_addr().expect("fake receiver address");
    (socket, addr)
}

fn recv_request(socket: &UdpSocket) -> (Frame, SocketAddr) {
    let mut buf = [0u8; 2048];
    let (n, from) = socket
        .recv_from(&mut buf)
        .expect("client should send a request");
    let frame = decode_slice(&buf[..n]).expect("request should decode");
    (frame, from)
}

fn ack(socket: &UdpSocket, to: SocketAddr, frame: &Frame) {
    let reply = encode_control_item(MessageType::Ack, frame.item_code, &frame.body)
        .expect("ack should encode");
    socket.send_to(&reply, to).expect("ack should send");
}

/// Acknowledge `n` requests, echoing their bodies.
fn acking_receiver(socket: UdpSocket, n: usize) -> JoinHandle<Vec<Frame>> {
    thread::spawn(move || {
        (0..n)
            .map(|_| {
                let (frame, from) = recv_request(&socket);
                ack(&socket, from, &frame);
                frame
            })
            .collect()
    })
}

#[test]
fn version_prints_package_version() {
    let output = netsdr().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("netsdr {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_lists_provenance() {
    let output = netsdr()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: netsdr"));
    assert!(stdout.contains("default_ports: control=50000, data=60000"));
    assert!(!stdout.contains("build_profile: unknown"));
}

#[test]
fn send_prints_acknowledged_body() {
    let (socket, addr) = fake_receiver();
    let receiver = acking_receiver(socket, 1);

    let output = netsdr()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(addr.to_string())
        .arg("--item")
        .arg("receiver-state")
        .arg("--data")
        .arg("80020101")
        .output()
        .expect("send should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"item\":\"ReceiverState\""));
    assert!(stdout.contains("\"item_code\":24"));
    assert!(stdout.contains("\"body\":\"80020101\""));

    let requests = receiver.join().expect("receiver thread should finish");
    assert_eq!(requests[0].msg_type, MessageType::SetControlItem);
    assert_eq!(requests[0].item_code, ControlItemCode::ReceiverState);
}

#[test]
fn tune_sends_five_byte_frequency() {
    let (socket, addr) = fake_receiver();
    let receiver = acking_receiver(socket, 1);

    let output = netsdr()
        .arg("--format")
        .arg("pretty")
        .arg("tune")
        .arg(addr.to_string())
        .arg("--hz")
        .arg("14010000")
        .arg("--channel")
        .arg("1")
        .output()
        .expect("tune should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("item=ReceiverFrequency"));

    let requests = receiver.join().expect("receiver thread should finish");
    assert_eq!(requests[0].item_code, ControlItemCode::ReceiverFrequency);
    assert_eq!(requests[0].body.as_ref(), &[0x01, 0x90, 0xC6, 0xD5, 0x00, 0x00]);
}

#[test]
fn unanswered_send_returns_124() {
    let (socket, addr) = fake_receiver();

    let output = netsdr()
        .arg("send")
        .arg(addr.to_string())
        .arg("--item")
        .arg("0x18")
        .arg("--timeout")
        .arg("200ms")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(124));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no response for ReceiverState"));
    drop(socket);
}

#[test]
fn unknown_item_is_usage_error() {
    let output = netsdr()
        .arg("send")
        .arg("127.0.0.1:50000")
        .arg("--item")
        .arg("bogus")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn invalid_config_file_is_usage_error() {
    let dir = std::env::temp_dir().join(format!("netsdr-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let path = dir.join("session.json");
    std::fs::write(&path, r#"{ "sample_bits": [12, 16, 16, 16] }"#).expect("config should write");

    let output = netsdr()
        .arg("--config")
        .arg(&path)
        .arg("send")
        .arg("127.0.0.1:50000")
        .arg("--item")
        .arg("rf-filter")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stream_prints_notifications_and_stops() {
    let (socket, addr) = fake_receiver();
    let receiver = thread::spawn(move || {
        let (start, client) = recv_request(&socket);
        ack(&socket, client, &start);

        for (sequence, body) in [(1u16, &[1u8, 0, 2, 0][..]), (3, &[3, 0][..])] {
            let frame = encode_data_item_with_sequence(MessageType::DataItem0, sequence, body)
                .expect("data should encode");
            socket.send_to(&frame, client).expect("data should send");
        }

        let (stop, client) = recv_request(&socket);
        ack(&socket, client, &stop);
        (start, stop)
    });

    let output = netsdr()
        .arg("--format")
        .arg("json")
        .arg("stream")
        .arg(addr.to_string())
        .arg("--count")
        .arg("2")
        .arg("--capture")
        .arg("fifo16")
        .output()
        .expect("stream should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"sequence\":1"));
    assert!(lines[0].contains("\"samples\":2"));
    assert!(lines[1].contains("\"sequence\":3"));
    assert!(lines[1].contains("\"gap_expected\":2"));

    let (start, stop) = receiver.join().expect("receiver thread should finish");
    assert_eq!(start.body.as_ref(), &[0x80, 0x02, 0x01, 0x01]);
    assert_eq!(stop.body.as_ref(), &[0x00, 0x01, 0x00, 0x00]);
}

//! Simulated receiver: acknowledges every control item and, on a start
//! command, streams a burst of 16-bit I/Q frames on DataItem0.
//!
//! Run with:
//!   cargo run --example sim-receiver -- 127.0.0.1:50000
//!
//! In another terminal:
//!   cargo run --features cli -- stream 127.0.0.1:50000 --count 20 --format pretty

use std::net::UdpSocket;

use netsdr::codec::{
    decode_slice, encode_control_item, encode_data_item_with_sequence, ControlItemCode,
    MessageType,
};

const FRAMES_PER_START: u16 = 64;
const SAMPLES_PER_FRAME: u16 = 240;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:50000".to_string());
    let socket = UdpSocket::bind(&addr)?;
    eprintln!("Listening on {}", socket.local_addr()?);

    let mut sequence: u16 = 0;
    let mut buf = [0u8; 2048];
    loop {
        let (n, client) = socket.recv_from(&mut buf)?;
        let frame = match decode_slice(&buf[..n]) {
            Ok(frame) => frame,
            Err(e) => {
                eprintln!("Ignoring {n} bytes from {client}: {e}");
                continue;
            }
        };
        eprintln!(
            "{} {} ({} bytes) from {client}",
            frame.msg_type,
            frame.item_code,
            frame.body.len()
        );

        let ack = encode_control_item(MessageType::Ack, frame.item_code, &frame.body)?;
        socket.send_to(&ack, client)?;

        let starting = frame.item_code == ControlItemCode::ReceiverState
            && frame.body.get(1) == Some(&0x02);
        if !starting {
            continue;
        }

        for _ in 0..FRAMES_PER_START {
            let body: Vec<u8> = (0..SAMPLES_PER_FRAME)
                .flat_map(|i| i.wrapping_mul(sequence.wrapping_add(1)).to_le_bytes())
                .collect();
            let data = encode_data_item_with_sequence(MessageType::DataItem0, sequence, &body)?;
            socket.send_to(&data, client)?;
            sequence = sequence.wrapping_add(1);
        }
    }
}

#![allow(dead_code)]

use std::time::Duration;

use bytes::Bytes;
use netsdr_codec::{
    decode, encode_control_item, encode_data_item_with_sequence, ControlItemCode, Frame,
    MessageType,
};
use netsdr_session::{spawn, Connection, SessionConfig};
use netsdr_transport::{FrameSink, FrameSource, MemoryTransport};

/// Receiver side of an in-memory session.
pub struct FakeReceiver {
    transport: MemoryTransport,
}

impl FakeReceiver {
    /// Next frame the client sent, decoded.
    pub async fn next_request(&mut self) -> Frame {
        let buf = self
            .transport
            .recv_frame()
            .await
            .expect("client should send a frame");
        decode(buf).expect("client frame should decode")
    }

    pub async fn ack(&mut self, item_code: ControlItemCode, body: &[u8]) {
        self.reply(MessageType::Ack, item_code, body).await;
    }

    pub async fn reply(&mut self, msg_type: MessageType, item_code: ControlItemCode, body: &[u8]) {
        let frame = encode_control_item(msg_type, item_code, body).expect("reply should encode");
        self.send_raw(frame).await;
    }

    pub async fn data(&mut self, stream: MessageType, sequence: u16, body: &[u8]) {
        let frame =
            encode_data_item_with_sequence(stream, sequence, body).expect("data should encode");
        self.send_raw(frame).await;
    }

    pub async fn send_raw(&mut self, frame: Bytes) {
        self.transport
            .send_frame(frame)
            .await
            .expect("client end should be open");
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig::default().with_command_timeout(Duration::from_millis(200))
}

/// Start a session over an in-memory pipe.
pub fn connect_fake(config: &SessionConfig) -> (Connection, FakeReceiver) {
    let (client, device) = MemoryTransport::pair(64);
    let conn = spawn(client, config).expect("session should start");
    (conn, FakeReceiver { transport: device })
}

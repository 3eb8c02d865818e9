//! Single-flight command correlation.

use std::time::Duration;

use bytes::Bytes;
use netsdr_codec::{encode_control_item, ControlItemCode, Frame, MessageType};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

/// Where the command pipeline stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse {
        item_code: ControlItemCode,
        msg_type: MessageType,
        deadline: Instant,
    },
}

/// What happened to an inbound frame offered to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameDisposition {
    /// The pending command completed with this body.
    Resolved(Bytes),
    /// A control frame for a different item; the wait goes on.
    Mismatched,
    /// A control frame while nothing was pending.
    Unsolicited,
    /// A data-item frame; never a response.
    NotControl,
}

/// Request/response state machine for control items.
///
/// At most one command is in flight. The session never performs I/O: it
/// hands back encoded frames and consumes decoded ones, the dispatcher moves
/// bytes and time.
#[derive(Debug)]
pub struct CommandSession {
    state: SessionState,
    timeout: Duration,
}

impl CommandSession {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deadline of the pending command, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SessionState::Idle => None,
            SessionState::AwaitingResponse { deadline, .. } => Some(deadline),
        }
    }

    /// Item code of the pending command, if any.
    pub fn pending_item(&self) -> Option<ControlItemCode> {
        match self.state {
            SessionState::Idle => None,
            SessionState::AwaitingResponse { item_code, .. } => Some(item_code),
        }
    }

    /// Encode a `SetControlItem` frame and start waiting for its response.
    ///
    /// Fails with `SessionBusy` unless idle, and with `Encode` when the frame
    /// is too large; the state is unchanged in both cases.
    pub fn begin(&mut self, item_code: ControlItemCode, payload: &[u8], now: Instant) -> Result<Bytes> {
        if let Some(pending) = self.pending_item() {
            return Err(SessionError::SessionBusy { pending });
        }

        let frame = encode_control_item(MessageType::SetControlItem, item_code, payload)?;
        self.state = SessionState::AwaitingResponse {
            item_code,
            msg_type: MessageType::SetControlItem,
            deadline: now + self.timeout,
        };
        debug!(%item_code, len = frame.len(), "command started");
        Ok(frame)
    }

    /// Offer an inbound frame. Only a control frame carrying the pending item
    /// code resolves the command; the deadline is never extended.
    pub fn on_frame(&mut self, frame: &Frame) -> FrameDisposition {
        if frame.msg_type.is_data_item() {
            return FrameDisposition::NotControl;
        }

        match self.state {
            SessionState::Idle => {
                debug!(
                    msg_type = %frame.msg_type,
                    item_code = %frame.item_code,
                    "discarding unsolicited control frame"
                );
                FrameDisposition::Unsolicited
            }
            SessionState::AwaitingResponse { item_code, .. } if item_code == frame.item_code => {
                self.state = SessionState::Idle;
                debug!(%item_code, msg_type = %frame.msg_type, "command resolved");
                FrameDisposition::Resolved(frame.body.clone())
            }
            SessionState::AwaitingResponse { item_code, .. } => {
                warn!(
                    expected = %item_code,
                    received = %frame.item_code,
                    msg_type = %frame.msg_type,
                    "discarding control frame for another item"
                );
                FrameDisposition::Mismatched
            }
        }
    }

    /// Give up on the pending command if its deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Option<ControlItemCode> {
        match self.state {
            SessionState::AwaitingResponse {
                item_code,
                deadline,
                ..
            } if now >= deadline => {
                self.state = SessionState::Idle;
                debug!(%item_code, "command timed out");
                Some(item_code)
            }
            _ => None,
        }
    }

    /// Drop the pending command (cancellation, connection loss).
    pub fn abandon(&mut self) -> Option<ControlItemCode> {
        let pending = self.pending_item();
        self.state = SessionState::Idle;
        pending
    }
}

#[cfg(test)]
mod tests {
    use netsdr_codec::{decode, encode_control_item, encode_data_item_with_sequence};

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(500);

    fn reply(msg_type: MessageType, item_code: ControlItemCode, body: &[u8]) -> Frame {
        decode(encode_control_item(msg_type, item_code, body).unwrap()).unwrap()
    }

    #[test]
    fn begin_encodes_set_control_item() {
        let mut session = CommandSession::new(TIMEOUT);
        let now = Instant::now();
        let wire = session
            .begin(ControlItemCode::ReceiverState, &[0x80, 0x02, 0x01, 0x01], now)
            .unwrap();

        let frame = decode(wire).unwrap();
        assert_eq!(frame.msg_type, MessageType::SetControlItem);
        assert_eq!(frame.item_code, ControlItemCode::ReceiverState);
        assert_eq!(frame.body.as_ref(), &[0x80, 0x02, 0x01, 0x01]);

        assert_eq!(
            session.state(),
            SessionState::AwaitingResponse {
                item_code: ControlItemCode::ReceiverState,
                msg_type: MessageType::SetControlItem,
                deadline: now + TIMEOUT,
            }
        );
    }

    #[test]
    fn matching_ack_resolves() {
        let mut session = CommandSession::new(TIMEOUT);
        session
            .begin(ControlItemCode::ReceiverState, b"", Instant::now())
            .unwrap();

        let disposition =
            session.on_frame(&reply(MessageType::Ack, ControlItemCode::ReceiverState, b"ok"));
        assert_eq!(disposition, FrameDisposition::Resolved(Bytes::from_static(b"ok")));
        assert!(session.is_idle());
    }

    #[test]
    fn current_control_item_also_resolves() {
        let mut session = CommandSession::new(TIMEOUT);
        session
            .begin(ControlItemCode::RFFilter, &[0x0B], Instant::now())
            .unwrap();

        let disposition = session.on_frame(&reply(
            MessageType::CurrentControlItem,
            ControlItemCode::RFFilter,
            &[0x0B],
        ));
        assert!(matches!(disposition, FrameDisposition::Resolved(_)));
    }

    #[test]
    fn busy_while_awaiting() {
        let mut session = CommandSession::new(TIMEOUT);
        session
            .begin(ControlItemCode::ReceiverState, b"", Instant::now())
            .unwrap();

        let err = session
            .begin(ControlItemCode::RFFilter, b"", Instant::now())
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::SessionBusy {
                pending: ControlItemCode::ReceiverState
            }
        ));
        assert_eq!(session.pending_item(), Some(ControlItemCode::ReceiverState));
    }

    #[test]
    fn oversized_command_leaves_session_idle() {
        let mut session = CommandSession::new(TIMEOUT);
        let err = session
            .begin(ControlItemCode::RFFilter, &vec![0u8; 8200], Instant::now())
            .unwrap_err();
        assert!(matches!(err, SessionError::Encode(_)));
        assert!(session.is_idle());
    }

    #[test]
    fn mismatched_item_keeps_waiting_and_deadline() {
        let mut session = CommandSession::new(TIMEOUT);
        let now = Instant::now();
        session.begin(ControlItemCode::ReceiverState, b"", now).unwrap();

        let disposition = session.on_frame(&reply(MessageType::Ack, ControlItemCode::RFFilter, b""));
        assert_eq!(disposition, FrameDisposition::Mismatched);
        assert_eq!(session.deadline(), Some(now + TIMEOUT));
    }

    #[test]
    fn data_frames_never_match() {
        let mut session = CommandSession::new(TIMEOUT);
        session
            .begin(ControlItemCode::None, b"", Instant::now())
            .unwrap();

        let data = decode(encode_data_item_with_sequence(MessageType::DataItem0, 1, &[0, 0]).unwrap())
            .unwrap();
        assert_eq!(data.item_code, ControlItemCode::None);
        assert_eq!(session.on_frame(&data), FrameDisposition::NotControl);
        assert!(!session.is_idle());
    }

    #[test]
    fn idle_session_discards_replies() {
        let mut session = CommandSession::new(TIMEOUT);
        let disposition =
            session.on_frame(&reply(MessageType::Ack, ControlItemCode::ReceiverState, b""));
        assert_eq!(disposition, FrameDisposition::Unsolicited);
    }

    #[test]
    fn expire_only_after_deadline() {
        let mut session = CommandSession::new(TIMEOUT);
        let now = Instant::now();
        session.begin(ControlItemCode::ReceiverState, b"", now).unwrap();

        assert_eq!(session.expire(now + TIMEOUT / 2), None);
        assert!(!session.is_idle());

        assert_eq!(
            session.expire(now + TIMEOUT),
            Some(ControlItemCode::ReceiverState)
        );
        assert!(session.is_idle());

        session
            .begin(ControlItemCode::ReceiverState, b"", now + TIMEOUT)
            .unwrap();
    }

    #[test]
    fn abandon_returns_to_idle() {
        let mut session = CommandSession::new(TIMEOUT);
        assert_eq!(session.abandon(), None);

        session
            .begin(ControlItemCode::ReceiverFrequency, b"", Instant::now())
            .unwrap();
        assert_eq!(session.abandon(), Some(ControlItemCode::ReceiverFrequency));
        assert!(session.is_idle());

        let late = reply(MessageType::Ack, ControlItemCode::ReceiverFrequency, b"");
        assert_eq!(session.on_frame(&late), FrameDisposition::Unsolicited);
    }
}

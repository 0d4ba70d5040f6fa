// ============================================
// File: crates/ipstego-transport/src/queue/netlink.rs
// ============================================
//! # NFQUEUE Netlink Codec
//!
//! ## Creation Reason
//! The queue talks to the kernel over `NETLINK_NETFILTER`. Building and
//! parsing those messages is pure byte work, kept apart from the socket so
//! it can be tested on any platform.
//!
//! ## Message Layout
//! ```text
//! ┌────────────────┬──────────────┬─────────────────────────────┐
//! │ nlmsghdr (16B) │ nfgenmsg (4B)│ attributes (TLV, 4B aligned)│
//! └────────────────┴──────────────┴─────────────────────────────┘
//! nlmsghdr: len u32 | type u16 | flags u16 | seq u32 | pid u32   (host order)
//! nfgenmsg: family u8 | version u8 | res_id be16 (queue number)
//! nlattr:   len u16 | type u16 | value | padding                 (host order)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Netlink headers are host byte order, NFQUEUE payload structs are
//!   big-endian. Mixing them up binds the wrong queue silently.
//! - `nfqnl_msg_config_params` is packed: 5 bytes, not 8
//!
//! ## Last Modified
//! v0.1.0 - Initial netlink codec

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::InterceptedPacket;

// ============================================
// Constants
// ============================================

/// Netlink message header length.
const NLMSG_HDRLEN: usize = 16;

/// `struct nfgenmsg` length.
const NFGENMSG_LEN: usize = 4;

/// Netlink attribute header length.
const NLA_HDRLEN: usize = 4;

/// Strips the nested/byte-order flags from an attribute type.
const NLA_TYPE_MASK: u16 = 0x3FFF;

const NLMSG_NOOP: u16 = 1;
const NLMSG_ERROR: u16 = 2;
const NLMSG_DONE: u16 = 3;
const NLMSG_OVERRUN: u16 = 4;

const NLM_F_REQUEST: u16 = 0x1;
const NLM_F_ACK: u16 = 0x4;

const NFNL_SUBSYS_QUEUE: u16 = 3;
const NFNETLINK_V0: u8 = 0;

const NFQNL_MSG_PACKET: u16 = 0;
const NFQNL_MSG_VERDICT: u16 = 1;
const NFQNL_MSG_CONFIG: u16 = 2;

const NFQA_PACKET_HDR: u16 = 1;
const NFQA_VERDICT_HDR: u16 = 2;
const NFQA_PAYLOAD: u16 = 10;

const NFQA_CFG_CMD: u16 = 1;
const NFQA_CFG_PARAMS: u16 = 2;
const NFQA_CFG_QUEUE_MAXLEN: u16 = 3;

const NFQNL_CFG_CMD_BIND: u8 = 1;
const NFQNL_CFG_CMD_UNBIND: u8 = 2;

const NFQNL_COPY_PACKET: u8 = 2;

const NF_ACCEPT: u32 = 1;

const AF_UNSPEC: u8 = 0;
const AF_INET: u16 = 2;

/// Largest packet the kernel will copy to us.
pub const MAX_COPY_RANGE: u32 = 0xFFFF;

/// Receive buffer large enough for one full-size packet message.
pub const RECV_BUFFER_SIZE: usize = MAX_COPY_RANGE as usize + 4096;

const fn align4(len: usize) -> usize {
    (len + 3) & !3
}

const fn nfnl_type(msg: u16) -> u16 {
    (NFNL_SUBSYS_QUEUE << 8) | msg
}

// ============================================
// Message Builder
// ============================================

/// Queue configuration commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Start delivering packets for this queue to us.
    Bind,
    /// Stop delivering packets.
    Unbind,
}

impl ConfigCommand {
    const fn code(self) -> u8 {
        match self {
            Self::Bind => NFQNL_CFG_CMD_BIND,
            Self::Unbind => NFQNL_CFG_CMD_UNBIND,
        }
    }
}

struct MessageBuilder {
    buf: BytesMut,
}

impl MessageBuilder {
    fn new(msg: u16, flags: u16, seq: u32, queue: u16) -> Self {
        let mut buf = BytesMut::with_capacity(128);
        buf.put_u32_ne(0); // patched in finish()
        buf.put_u16_ne(nfnl_type(msg));
        buf.put_u16_ne(NLM_F_REQUEST | flags);
        buf.put_u32_ne(seq);
        buf.put_u32_ne(0);

        buf.put_u8(AF_UNSPEC);
        buf.put_u8(NFNETLINK_V0);
        buf.put_u16(queue);
        Self { buf }
    }

    fn attr(mut self, attr_type: u16, value: &[u8]) -> Self {
        let len = NLA_HDRLEN + value.len();
        // Attribute payloads here are bounded by MAX_COPY_RANGE plus headers.
        #[allow(clippy::cast_possible_truncation)]
        self.buf.put_u16_ne(len as u16);
        self.buf.put_u16_ne(attr_type);
        self.buf.put_slice(value);
        self.buf.put_bytes(0, align4(len) - len);
        self
    }

    fn finish(mut self) -> Bytes {
        #[allow(clippy::cast_possible_truncation)]
        let len = self.buf.len() as u32;
        self.buf[..4].copy_from_slice(&len.to_ne_bytes());
        self.buf.freeze()
    }
}

/// Builds a bind/unbind request for `queue`.
#[must_use]
pub fn config_command(seq: u32, queue: u16, command: ConfigCommand) -> Bytes {
    let mut cmd = [0u8; 4];
    cmd[0] = command.code();
    cmd[2..4].copy_from_slice(&AF_INET.to_be_bytes());
    MessageBuilder::new(NFQNL_MSG_CONFIG, NLM_F_ACK, seq, queue)
        .attr(NFQA_CFG_CMD, &cmd)
        .finish()
}

/// Builds a request switching `queue` to full packet copy mode.
#[must_use]
pub fn config_params(seq: u32, queue: u16, copy_range: u32) -> Bytes {
    let mut params = [0u8; 5];
    params[..4].copy_from_slice(&copy_range.to_be_bytes());
    params[4] = NFQNL_COPY_PACKET;
    MessageBuilder::new(NFQNL_MSG_CONFIG, NLM_F_ACK, seq, queue)
        .attr(NFQA_CFG_PARAMS, &params)
        .finish()
}

/// Builds a request limiting how many packets the kernel holds for `queue`.
#[must_use]
pub fn config_max_len(seq: u32, queue: u16, max_len: u32) -> Bytes {
    MessageBuilder::new(NFQNL_MSG_CONFIG, NLM_F_ACK, seq, queue)
        .attr(NFQA_CFG_QUEUE_MAXLEN, &max_len.to_be_bytes())
        .finish()
}

/// Builds an accept verdict, optionally replacing the packet bytes.
#[must_use]
pub fn verdict_accept(seq: u32, queue: u16, packet_id: u32, payload: Option<&[u8]>) -> Bytes {
    let mut header = [0u8; 8];
    header[..4].copy_from_slice(&NF_ACCEPT.to_be_bytes());
    header[4..].copy_from_slice(&packet_id.to_be_bytes());
    let builder = MessageBuilder::new(NFQNL_MSG_VERDICT, 0, seq, queue).attr(NFQA_VERDICT_HDR, &header);
    match payload {
        Some(data) => builder.attr(NFQA_PAYLOAD, data).finish(),
        None => builder.finish(),
    }
}

// ============================================
// Message Parser
// ============================================

/// A message received from the kernel.
#[derive(Debug, PartialEq, Eq)]
pub enum Message {
    /// An intercepted packet.
    Packet(InterceptedPacket),
    /// Positive acknowledgement of request `seq`.
    Ack {
        /// Sequence number of the acknowledged request
        seq: u32,
    },
    /// Request `seq` failed with `errno`.
    Error {
        /// Sequence number of the failed request
        seq: u32,
        /// Positive errno value
        errno: i32,
    },
    /// The kernel dropped messages because our socket buffer was full.
    Overrun,
}

fn read_u16_ne(buf: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_ne_bytes(buf.get(at..at + 2)?.try_into().ok()?))
}

fn read_u32_ne(buf: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_ne_bytes(buf.get(at..at + 4)?.try_into().ok()?))
}

/// Splits a datagram into netlink messages.
///
/// # Errors
/// `Malformed` if a header length is inconsistent with the datagram.
pub fn parse(datagram: &[u8]) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset + NLMSG_HDRLEN <= datagram.len() {
        let rest = &datagram[offset..];
        let len = read_u32_ne(rest, 0).unwrap_or(0) as usize;
        if len < NLMSG_HDRLEN || len > rest.len() {
            return Err(TransportError::malformed(format!(
                "netlink length {len} with {} bytes left",
                rest.len()
            )));
        }
        let msg_type = read_u16_ne(rest, 4).unwrap_or(0);
        let seq = read_u32_ne(rest, 8).unwrap_or(0);
        let body = &rest[NLMSG_HDRLEN..len];

        match msg_type {
            NLMSG_ERROR => {
                let code = body
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .map(i32::from_ne_bytes)
                    .ok_or_else(|| TransportError::malformed("truncated netlink error"))?;
                if code == 0 {
                    messages.push(Message::Ack { seq });
                } else {
                    messages.push(Message::Error { seq, errno: -code });
                }
            }
            NLMSG_OVERRUN => messages.push(Message::Overrun),
            NLMSG_NOOP | NLMSG_DONE => {}
            t if t == nfnl_type(NFQNL_MSG_PACKET) => {
                messages.push(Message::Packet(parse_packet(body)?));
            }
            _ => {}
        }

        offset += align4(len);
    }

    Ok(messages)
}

fn parse_packet(body: &[u8]) -> Result<InterceptedPacket> {
    let mut id = None;
    let mut payload = None;
    let mut offset = NFGENMSG_LEN;

    while offset + NLA_HDRLEN <= body.len() {
        let len = usize::from(read_u16_ne(body, offset).unwrap_or(0));
        let attr_type = read_u16_ne(body, offset + 2).unwrap_or(0) & NLA_TYPE_MASK;
        if len < NLA_HDRLEN || offset + len > body.len() {
            return Err(TransportError::malformed(format!("attribute length {len}")));
        }
        let value = &body[offset + NLA_HDRLEN..offset + len];

        match attr_type {
            NFQA_PACKET_HDR => {
                id = value
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .map(u32::from_be_bytes);
            }
            NFQA_PAYLOAD => payload = Some(value.to_vec()),
            _ => {}
        }

        offset += align4(len);
    }

    let id = id.ok_or_else(|| TransportError::malformed("packet without NFQA_PACKET_HDR"))?;
    Ok(InterceptedPacket::new(id, payload.unwrap_or_default()))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_message(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut hdr = [0u8; 7];
        hdr[..4].copy_from_slice(&id.to_be_bytes());
        hdr[4..6].copy_from_slice(&0x0800u16.to_be_bytes());
        hdr[6] = 1;
        MessageBuilder::new(NFQNL_MSG_PACKET, 0, 0, 10)
            .attr(NFQA_PACKET_HDR, &hdr)
            .attr(NFQA_PAYLOAD, payload)
            .finish()
            .to_vec()
    }

    fn error_message(seq: u32, code: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u32_ne(36);
        buf.put_u16_ne(NLMSG_ERROR);
        buf.put_u16_ne(0);
        buf.put_u32_ne(seq);
        buf.put_u32_ne(0);
        buf.put_i32_ne(code);
        buf.put_bytes(0, 16);
        buf.to_vec()
    }

    #[test]
    fn test_config_command_layout() {
        let msg = config_command(7, 10, ConfigCommand::Bind);
        assert_eq!(msg.len(), NLMSG_HDRLEN + NFGENMSG_LEN + 8);
        assert_eq!(read_u32_ne(&msg, 0), Some(msg.len() as u32));
        assert_eq!(read_u16_ne(&msg, 4), Some(0x0302));
        assert_eq!(read_u16_ne(&msg, 6), Some(NLM_F_REQUEST | NLM_F_ACK));
        assert_eq!(read_u32_ne(&msg, 8), Some(7));
        // res_id is the queue number, big-endian
        assert_eq!(&msg[18..20], &[0, 10]);
        // attribute: len 8, type CMD, {BIND, pad, AF_INET be16}
        assert_eq!(read_u16_ne(&msg, 20), Some(8));
        assert_eq!(read_u16_ne(&msg, 22), Some(NFQA_CFG_CMD));
        assert_eq!(&msg[24..28], &[1, 0, 0, 2]);
    }

    #[test]
    fn test_params_are_packed_and_padded() {
        let msg = config_params(1, 20, MAX_COPY_RANGE);
        // 4 header + 5 value, padded to 12
        assert_eq!(msg.len(), NLMSG_HDRLEN + NFGENMSG_LEN + 12);
        assert_eq!(read_u16_ne(&msg, 20), Some(9));
        assert_eq!(&msg[24..29], &[0, 0, 0xFF, 0xFF, NFQNL_COPY_PACKET]);
    }

    #[test]
    fn test_verdict_layout() {
        let msg = verdict_accept(3, 20, 0xDEAD_BEEF, Some(&[1, 2, 3]));
        assert_eq!(read_u16_ne(&msg, 4), Some(0x0301));
        assert_eq!(read_u16_ne(&msg, 22), Some(NFQA_VERDICT_HDR));
        assert_eq!(&msg[24..28], &[0, 0, 0, 1]);
        assert_eq!(&msg[28..32], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(read_u16_ne(&msg, 32), Some(7));
        assert_eq!(read_u16_ne(&msg, 34), Some(NFQA_PAYLOAD));
        assert_eq!(&msg[36..39], &[1, 2, 3]);
        assert_eq!(msg.len(), 40);

        let plain = verdict_accept(3, 20, 1, None);
        assert_eq!(plain.len(), NLMSG_HDRLEN + NFGENMSG_LEN + 12);
    }

    #[test]
    fn test_parse_packets_and_acks() {
        let mut datagram = packet_message(42, &[0x45, 0x00, 0x00]);
        datagram.extend(error_message(9, 0));
        datagram.extend(error_message(10, -1));

        let messages = parse(&datagram).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[0],
            Message::Packet(InterceptedPacket::new(42, vec![0x45, 0x00, 0x00]))
        );
        assert_eq!(messages[1], Message::Ack { seq: 9 });
        assert_eq!(messages[2], Message::Error { seq: 10, errno: 1 });
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        let mut datagram = packet_message(1, &[0x45]);
        datagram[0] = 0xFF;
        datagram[1] = 0xFF;
        assert!(parse(&datagram).is_err());
    }

    #[test]
    fn test_parse_packet_without_header() {
        let msg = MessageBuilder::new(NFQNL_MSG_PACKET, 0, 0, 10)
            .attr(NFQA_PAYLOAD, &[1])
            .finish();
        assert!(parse(&msg).is_err());
    }
}

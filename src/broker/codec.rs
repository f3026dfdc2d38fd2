use tokio::io::{AsyncRead, AsyncReadExt};

use super::QoS;
use crate::error::ClientError;

const MQTT_PROTOCOL_NAME: &str = "MQTT";
const MQTT_PROTOCOL_LEVEL_3_1_1: u8 = 4;

pub(crate) const CONNECT: u8 = 0x10;
pub(crate) const CONNACK: u8 = 0x20;
pub(crate) const PUBLISH: u8 = 0x30;
pub(crate) const PUBACK: u8 = 0x40;
pub(crate) const PUBREC: u8 = 0x50;
pub(crate) const PUBREL: u8 = 0x60;
pub(crate) const PUBCOMP: u8 = 0x70;
pub(crate) const SUBSCRIBE: u8 = 0x80;
pub(crate) const SUBACK: u8 = 0x90;
pub(crate) const PINGREQ: u8 = 0xC0;
pub(crate) const PINGRESP: u8 = 0xD0;
pub(crate) const DISCONNECT: u8 = 0xE0;

const CLEAN_SESSION_FLAG: u8 = 0x02;
const PASSWORD_FLAG: u8 = 0x40;
const USERNAME_FLAG: u8 = 0x80;
const RETAIN_FLAG: u8 = 0x01;
/// PUBREL and SUBSCRIBE carry mandatory reserved flag bits.
const RESERVED_FLAGS: u8 = 0x02;
const MAX_REMAINING_LENGTH: usize = 268_435_455;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Packet {
    Connect {
        client_id: String,
        username: Option<String>,
        password: Option<String>,
        keep_alive_secs: u16,
    },
    ConnAck {
        session_present: bool,
        code: u8,
    },
    Publish {
        topic: String,
        qos: QoS,
        retain: bool,
        packet_id: Option<u16>,
        payload: Vec<u8>,
    },
    PubAck(u16),
    PubRec(u16),
    PubRel(u16),
    PubComp(u16),
    Subscribe {
        packet_id: u16,
        filters: Vec<(String, QoS)>,
    },
    SubAck {
        packet_id: u16,
        return_codes: Vec<u8>,
    },
    PingReq,
    PingResp,
    Disconnect,
}

pub(crate) fn build_connect_packet(
    client_id: &str,
    username: &str,
    password: &str,
    clean_session: bool,
    keep_alive_secs: u16,
) -> Vec<u8> {
    let mut flags = 0_u8;
    if clean_session {
        flags |= CLEAN_SESSION_FLAG;
    }
    if !username.is_empty() {
        flags |= USERNAME_FLAG;
    }
    if !password.is_empty() {
        flags |= PASSWORD_FLAG;
    }

    let mut body = Vec::with_capacity(
        16_usize
            .saturating_add(client_id.len())
            .saturating_add(username.len())
            .saturating_add(password.len()),
    );
    push_utf8(&mut body, MQTT_PROTOCOL_NAME);
    body.push(MQTT_PROTOCOL_LEVEL_3_1_1);
    body.push(flags);
    body.extend_from_slice(&keep_alive_secs.to_be_bytes());
    push_utf8(&mut body, client_id);
    if !username.is_empty() {
        push_utf8(&mut body, username);
    }
    if !password.is_empty() {
        push_utf8(&mut body, password);
    }
    frame(CONNECT, &body)
}

pub(crate) fn build_publish_packet(
    topic: &str,
    qos: QoS,
    retain: bool,
    packet_id: Option<u16>,
    payload: &[u8],
) -> Vec<u8> {
    let mut header = PUBLISH | (qos.as_u8() << 1);
    if retain {
        header |= RETAIN_FLAG;
    }
    let mut body = Vec::with_capacity(
        4_usize
            .saturating_add(topic.len())
            .saturating_add(payload.len()),
    );
    push_utf8(&mut body, topic);
    if let Some(id) = packet_id
        && !matches!(qos, QoS::AtMostOnce)
    {
        body.extend_from_slice(&id.to_be_bytes());
    }
    body.extend_from_slice(payload);
    frame(header, &body)
}

pub(crate) fn build_ack_packet(packet_type: u8, packet_id: u16) -> Vec<u8> {
    let header = if packet_type == PUBREL {
        PUBREL | RESERVED_FLAGS
    } else {
        packet_type
    };
    frame(header, &packet_id.to_be_bytes())
}

pub(crate) fn build_subscribe_packet(packet_id: u16, topic: &str, qos: QoS) -> Vec<u8> {
    let mut body = Vec::with_capacity(5_usize.saturating_add(topic.len()));
    body.extend_from_slice(&packet_id.to_be_bytes());
    push_utf8(&mut body, topic);
    body.push(qos.as_u8());
    frame(SUBSCRIBE | RESERVED_FLAGS, &body)
}

#[cfg(test)]
pub(crate) fn build_connack_packet(code: u8) -> Vec<u8> {
    frame(CONNACK, &[0x00, code])
}

#[cfg(test)]
pub(crate) fn build_suback_packet(packet_id: u16, return_codes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2_usize.saturating_add(return_codes.len()));
    body.extend_from_slice(&packet_id.to_be_bytes());
    body.extend_from_slice(return_codes);
    frame(SUBACK, &body)
}

pub(crate) fn build_empty_packet(packet_type: u8) -> Vec<u8> {
    frame(packet_type, &[])
}

fn frame(header: u8, body: &[u8]) -> Vec<u8> {
    let capacity = 5_usize.saturating_add(body.len());
    let mut packet = Vec::with_capacity(capacity);
    packet.push(header);
    encode_remaining_length(&mut packet, body.len());
    packet.extend_from_slice(body);
    packet
}

fn push_utf8(buffer: &mut Vec<u8>, value: &str) {
    let max_len = usize::from(u16::MAX);
    let len = value.len().min(max_len);
    let len_u16 = u16::try_from(len).unwrap_or(u16::MAX);
    buffer.extend_from_slice(&len_u16.to_be_bytes());
    if let Some(slice) = value.as_bytes().get(..len) {
        buffer.extend_from_slice(slice);
    }
}

pub(crate) fn encode_remaining_length(out: &mut Vec<u8>, mut len: usize) {
    loop {
        let mut byte = u8::try_from(len % 128).unwrap_or(127);
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
}

/// Reads one packet. Returns `Ok(None)` on a clean end of stream.
pub(crate) async fn read_packet<R>(reader: &mut R) -> Result<Option<Packet>, ClientError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0_u8; 1];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let [header] = header;

    let mut remaining_len = 0_usize;
    let mut shift = 0_u32;
    loop {
        let mut byte = [0_u8; 1];
        reader.read_exact(&mut byte).await?;
        let [byte] = byte;
        let digit = usize::from(byte & 0x7F)
            .checked_shl(shift)
            .ok_or_else(|| ClientError::protocol("remaining length overflow"))?;
        remaining_len = remaining_len.saturating_add(digit);
        if byte & 0x80 == 0 {
            break;
        }
        shift = shift.saturating_add(7);
        if shift > 21 {
            return Err(ClientError::protocol("remaining length exceeds four bytes"));
        }
    }
    if remaining_len > MAX_REMAINING_LENGTH {
        return Err(ClientError::protocol("remaining length too large"));
    }

    let mut body = vec![0_u8; remaining_len];
    reader.read_exact(&mut body).await?;
    decode_packet(header, &body).map(Some)
}

pub(crate) fn decode_packet(header: u8, body: &[u8]) -> Result<Packet, ClientError> {
    let packet_type = header & 0xF0;
    let mut cursor = Cursor::new(body);
    let packet = match packet_type {
        CONNECT => {
            let protocol = cursor.utf8()?;
            if protocol != MQTT_PROTOCOL_NAME {
                return Err(ClientError::protocol(format!(
                    "unsupported protocol name '{protocol}'"
                )));
            }
            let _level = cursor.u8()?;
            let flags = cursor.u8()?;
            let keep_alive_secs = cursor.u16()?;
            let client_id = cursor.utf8()?;
            let username = if flags & USERNAME_FLAG != 0 {
                Some(cursor.utf8()?)
            } else {
                None
            };
            let password = if flags & PASSWORD_FLAG != 0 {
                Some(cursor.utf8()?)
            } else {
                None
            };
            Packet::Connect {
                client_id,
                username,
                password,
                keep_alive_secs,
            }
        }
        CONNACK => {
            let ack_flags = cursor.u8()?;
            let code = cursor.u8()?;
            Packet::ConnAck {
                session_present: ack_flags & 0x01 != 0,
                code,
            }
        }
        PUBLISH => {
            let qos = QoS::from_u8((header >> 1) & 0x03)
                .ok_or_else(|| ClientError::protocol("invalid PUBLISH QoS"))?;
            let topic = cursor.utf8()?;
            let packet_id = if matches!(qos, QoS::AtMostOnce) {
                None
            } else {
                Some(cursor.u16()?)
            };
            Packet::Publish {
                topic,
                qos,
                retain: header & RETAIN_FLAG != 0,
                packet_id,
                payload: cursor.rest().to_vec(),
            }
        }
        PUBACK => Packet::PubAck(cursor.u16()?),
        PUBREC => Packet::PubRec(cursor.u16()?),
        PUBREL => Packet::PubRel(cursor.u16()?),
        PUBCOMP => Packet::PubComp(cursor.u16()?),
        SUBSCRIBE => {
            let packet_id = cursor.u16()?;
            let mut filters = Vec::new();
            while !cursor.is_empty() {
                let filter = cursor.utf8()?;
                let qos = QoS::from_u8(cursor.u8()? & 0x03)
                    .ok_or_else(|| ClientError::protocol("invalid SUBSCRIBE QoS"))?;
                filters.push((filter, qos));
            }
            Packet::Subscribe { packet_id, filters }
        }
        SUBACK => Packet::SubAck {
            packet_id: cursor.u16()?,
            return_codes: cursor.rest().to_vec(),
        },
        PINGREQ => Packet::PingReq,
        PINGRESP => Packet::PingResp,
        DISCONNECT => Packet::Disconnect,
        other => {
            return Err(ClientError::protocol(format!(
                "unexpected packet type 0x{other:02x}"
            )));
        }
    };
    Ok(packet)
}

struct Cursor<'buf> {
    data: &'buf [u8],
}

impl<'buf> Cursor<'buf> {
    const fn new(data: &'buf [u8]) -> Self {
        Self { data }
    }

    const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn take(&mut self, len: usize) -> Result<&'buf [u8], ClientError> {
        if len > self.data.len() {
            return Err(ClientError::protocol("truncated packet"));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, ClientError> {
        match self.take(1)? {
            [value] => Ok(*value),
            _ => Err(ClientError::protocol("truncated packet")),
        }
    }

    fn u16(&mut self) -> Result<u16, ClientError> {
        match self.take(2)? {
            [high, low] => Ok(u16::from_be_bytes([*high, *low])),
            _ => Err(ClientError::protocol("truncated packet")),
        }
    }

    fn utf8(&mut self) -> Result<String, ClientError> {
        let len = usize::from(self.u16()?);
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn rest(&mut self) -> &'buf [u8] {
        std::mem::take(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_packet_carries_credentials_only_when_set() -> Result<(), ClientError> {
        let anonymous = build_connect_packet("mqtt-load-generator-0", "", "", true, 60);
        let with_auth = build_connect_packet("mqtt-load-generator-0", "user", "secret", true, 60);

        for (packet, expect_user, expect_pass) in [
            (anonymous, None, None),
            (with_auth, Some("user"), Some("secret")),
        ] {
            let (header, body) = split_frame(&packet)?;
            match decode_packet(header, body)? {
                Packet::Connect {
                    client_id,
                    username,
                    password,
                    keep_alive_secs,
                } => {
                    assert_eq!(client_id, "mqtt-load-generator-0");
                    assert_eq!(username.as_deref(), expect_user);
                    assert_eq!(password.as_deref(), expect_pass);
                    assert_eq!(keep_alive_secs, 60);
                }
                other => return Err(ClientError::protocol(format!("unexpected {other:?}"))),
            }
        }
        Ok(())
    }

    #[test]
    fn publish_packet_includes_packet_id_only_above_qos0() -> Result<(), ClientError> {
        let qos0 = build_publish_packet("/load/2", QoS::AtMostOnce, false, Some(9), b"abc");
        let (header, body) = split_frame(&qos0)?;
        assert_eq!(header, PUBLISH);
        assert_eq!(
            decode_packet(header, body)?,
            Packet::Publish {
                topic: "/load/2".to_owned(),
                qos: QoS::AtMostOnce,
                retain: false,
                packet_id: None,
                payload: b"abc".to_vec(),
            }
        );

        let qos2 = build_publish_packet("/load", QoS::ExactlyOnce, true, Some(513), b"");
        let (header, body) = split_frame(&qos2)?;
        assert_eq!(header, PUBLISH | 0x04 | RETAIN_FLAG);
        assert_eq!(
            decode_packet(header, body)?,
            Packet::Publish {
                topic: "/load".to_owned(),
                qos: QoS::ExactlyOnce,
                retain: true,
                packet_id: Some(513),
                payload: Vec::new(),
            }
        );
        Ok(())
    }

    #[test]
    fn remaining_length_uses_continuation_bytes() {
        let mut out = Vec::new();
        encode_remaining_length(&mut out, 321);
        assert_eq!(out, vec![0xC1, 0x02]);

        out.clear();
        encode_remaining_length(&mut out, 127);
        assert_eq!(out, vec![0x7F]);
    }

    #[test]
    fn pubrel_sets_reserved_flags() {
        assert_eq!(build_ack_packet(PUBREL, 7), vec![0x62, 0x02, 0x00, 0x07]);
        assert_eq!(build_ack_packet(PUBACK, 7), vec![0x40, 0x02, 0x00, 0x07]);
    }

    #[test]
    fn truncated_body_is_a_protocol_error() {
        assert!(decode_packet(PUBACK, &[0x01]).is_err());
        assert!(decode_packet(CONNACK, &[]).is_err());
    }

    #[test]
    fn read_packet_handles_large_frames_and_eof() -> Result<(), ClientError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let payload = vec![0xAB_u8; 300];
            let mut wire = build_publish_packet("t", QoS::AtLeastOnce, false, Some(1), &payload);
            wire.extend_from_slice(&build_empty_packet(PINGRESP));
            let mut reader = wire.as_slice();

            match read_packet(&mut reader).await? {
                Some(Packet::Publish {
                    payload: received, ..
                }) => assert_eq!(received, payload),
                other => return Err(ClientError::protocol(format!("unexpected {other:?}"))),
            }
            assert_eq!(read_packet(&mut reader).await?, Some(Packet::PingResp));
            assert_eq!(read_packet(&mut reader).await?, None);
            Ok(())
        })
    }

    fn split_frame(packet: &[u8]) -> Result<(u8, &[u8]), ClientError> {
        let (&header, rest) = packet
            .split_first()
            .ok_or_else(|| ClientError::protocol("empty frame"))?;
        let mut offset = 0_usize;
        for byte in rest {
            offset = offset.saturating_add(1);
            if byte & 0x80 == 0 {
                break;
            }
        }
        let body = rest
            .get(offset..)
            .ok_or_else(|| ClientError::protocol("bad frame"))?;
        Ok((header, body))
    }
}

//! 入站行解码
//!
//! 按 `\n` 切分字节流，去掉可能的 `\r`，再按 UTF-8 有损解码：非 UTF-8 字节
//! （例如 GBK 终端）替换为 U+FFFD，不会中断会话。超长行作为普通事件上报，
//! 而不是解码错误，这样 `FramedRead` 不会因此结束流。

use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// 一行文本，已去掉 `\n` 和可能的 `\r`
    Line(String),
    /// 超过长度上限的一行，内容已丢弃
    Oversized,
}

#[derive(Debug, Clone)]
pub struct InboundCodec {
    chunks: AnyDelimiterCodec,
}

impl InboundCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            chunks: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                max_length,
            ),
        }
    }
}

fn to_line(chunk: Bytes) -> Inbound {
    let line = chunk.strip_suffix(b"\r").unwrap_or(&chunk[..]);
    Inbound::Line(String::from_utf8_lossy(line).into_owned())
}

fn lift(
    result: Result<Option<Bytes>, AnyDelimiterCodecError>,
) -> Result<Option<Inbound>, AnyDelimiterCodecError> {
    match result {
        Ok(chunk) => Ok(chunk.map(to_line)),
        Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => Ok(Some(Inbound::Oversized)),
        Err(err) => Err(err),
    }
}

impl Decoder for InboundCodec {
    type Item = Inbound;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Inbound>, AnyDelimiterCodecError> {
        lift(self.chunks.decode(buf))
    }

    fn decode_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<Inbound>, AnyDelimiterCodecError> {
        lift(self.chunks.decode_eof(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_line_terminators() {
        let mut codec = InboundCodec::new(64);
        let mut buf = BytesMut::from("who\r\nrename|alice\n");

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Inbound::Line("who".to_string()))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Inbound::Line("rename|alice".to_string()))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_oversized_line_is_skipped() {
        let mut codec = InboundCodec::new(8);
        let mut buf = BytesMut::from("this line is far too long\nok\n");

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Inbound::Oversized));
        // 丢弃到下一个换行后恢复正常
        let mut next = None;
        while next.is_none() {
            next = codec.decode(&mut buf).unwrap();
        }
        assert_eq!(next, Some(Inbound::Line("ok".to_string())));
    }

    #[test]
    fn test_last_line_without_newline() {
        let mut codec = InboundCodec::new(64);
        let mut buf = BytesMut::from("bye");

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap(),
            Some(Inbound::Line("bye".to_string()))
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = InboundCodec::new(64);
        let mut buf = BytesMut::from(&[b'h', 0xff, b'i', b'\n', 0xc4, 0xe3, b'\r', b'\n'][..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Inbound::Line("h\u{fffd}i".to_string()))
        );
        // GBK 编码的中文同样保留为一行
        match codec.decode(&mut buf).unwrap() {
            Some(Inbound::Line(line)) => assert!(line.contains('\u{fffd}'), "{line:?}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

//! 协议帧格式定义和编解码
//!
//! 请求帧：`0C | MsgID(4) | Control(1) | Length(2) | Length(2) | Type(2) | Data`
//!
//! 响应帧：`B1CB7400 | Control(1) | MsgID(4) | Unknown(1) | Type(2) | ZipLength(2) | Length(2) | Data`

use crate::protocol::{
    codec::{read_u16_le, read_u32_be, read_u32_le, u16_to_bytes_le, u32_to_bytes_le},
    constants::{Control, MessageType, PREFIX, PREFIX_RESP, REQUEST_HEADER_LEN, RESPONSE_HEADER_LEN},
};
use bytes::{Buf, BytesMut};
use flate2::read::ZlibDecoder;
use log::debug;
use std::io::Read;
use thiserror::Error;

/// 帧错误
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("数据长度不足")]
    Truncated,
    #[error("无效的帧头")]
    InvalidPrefix,
    #[error("长度不匹配")]
    LengthMismatch,
    #[error("未知的消息类型: 0x{0:04X}")]
    UnknownMessageType(u16),
    #[error("解压错误: {0}")]
    Decompression(String),
    #[error("响应帧 msg_id={msg_id} 无法解出: {reason}")]
    Corrupt { msg_id: u32, reason: Box<FrameError> },
}

impl FrameError {
    /// 帧头已解析出的消息ID
    pub fn msg_id(&self) -> Option<u32> {
        match self {
            FrameError::Corrupt { msg_id, .. } => Some(*msg_id),
            _ => None,
        }
    }
}

/// 请求帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub msg_id: u32,
    pub control: Control,
    pub msg_type: MessageType,
    pub data: Vec<u8>,
}

impl RequestFrame {
    pub fn new(msg_id: u32, msg_type: MessageType, data: Vec<u8>) -> Self {
        Self {
            msg_id,
            control: Control::Control01,
            msg_type,
            data,
        }
    }

    /// 编码为字节数组
    ///
    /// 长度字段包含类型字段的2字节，并且固定写两遍。
    pub fn encode(&self) -> Vec<u8> {
        let length = (self.data.len() + 2) as u16;
        let mut result = Vec::with_capacity(REQUEST_HEADER_LEN + self.data.len());

        result.push(PREFIX);
        result.extend_from_slice(&u32_to_bytes_le(self.msg_id));
        result.push(self.control.as_u8());
        result.extend_from_slice(&u16_to_bytes_le(length));
        result.extend_from_slice(&u16_to_bytes_le(length));
        result.extend_from_slice(&u16_to_bytes_le(self.msg_type.as_u16()));
        result.extend_from_slice(&self.data);

        result
    }

    /// 从字节数组解码
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < REQUEST_HEADER_LEN {
            return Err(FrameError::Truncated);
        }
        if bytes[0] != PREFIX {
            return Err(FrameError::InvalidPrefix);
        }

        let (rest, msg_id) = read_u32_le(&bytes[1..]).map_err(|_| FrameError::Truncated)?;
        let (rest, length1) = read_u16_le(&rest[1..]).map_err(|_| FrameError::Truncated)?;
        let (rest, length2) = read_u16_le(rest).map_err(|_| FrameError::Truncated)?;
        let (rest, msg_type_val) = read_u16_le(rest).map_err(|_| FrameError::Truncated)?;

        if length1 != length2 {
            return Err(FrameError::LengthMismatch);
        }

        let data_length = length1.saturating_sub(2) as usize;
        if rest.len() < data_length {
            return Err(FrameError::Truncated);
        }

        let msg_type = MessageType::from_u16(msg_type_val)
            .ok_or(FrameError::UnknownMessageType(msg_type_val))?;

        Ok(Self {
            msg_id,
            control: Control::Control01,
            msg_type,
            data: rest[..data_length].to_vec(),
        })
    }
}

/// 响应帧
///
/// 类型保存原始值，未知类型由上层决定如何处理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub control: u8,
    pub msg_id: u32,
    pub unknown: u8,
    pub msg_type: u16,
    pub zip_length: u16,
    pub length: u16,
    pub data: Vec<u8>,
}

impl ResponseFrame {
    /// 解码一个完整响应帧，压缩数据会被解压
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < RESPONSE_HEADER_LEN {
            return Err(FrameError::Truncated);
        }

        let (_, prefix) = read_u32_be(bytes).map_err(|_| FrameError::Truncated)?;
        if prefix != PREFIX_RESP {
            return Err(FrameError::InvalidPrefix);
        }

        let header = ResponseHeader::parse(&bytes[..RESPONSE_HEADER_LEN])?;
        let end = RESPONSE_HEADER_LEN + header.zip_length as usize;
        if bytes.len() < end {
            return Err(FrameError::Truncated);
        }

        let data = inflate(&bytes[RESPONSE_HEADER_LEN..end], header.zip_length, header.length)?;

        Ok(Self {
            control: header.control,
            msg_id: header.msg_id,
            unknown: header.unknown,
            msg_type: header.msg_type,
            zip_length: header.zip_length,
            length: header.length,
            data,
        })
    }

    /// 编码为未压缩的响应帧（模拟服务端、测试用）
    pub fn encode(msg_id: u32, msg_type: u16, data: &[u8]) -> Vec<u8> {
        let length = data.len() as u16;
        let mut result = Vec::with_capacity(RESPONSE_HEADER_LEN + data.len());
        result.extend_from_slice(&PREFIX_RESP.to_be_bytes());
        result.push(0x0C);
        result.extend_from_slice(&u32_to_bytes_le(msg_id));
        result.push(0x00);
        result.extend_from_slice(&u16_to_bytes_le(msg_type));
        result.extend_from_slice(&u16_to_bytes_le(length));
        result.extend_from_slice(&u16_to_bytes_le(length));
        result.extend_from_slice(data);
        result
    }

    /// 已知的消息类型
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u16(self.msg_type)
    }

    /// 解压后的数据
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// 响应帧头（前缀之后的12字节）
struct ResponseHeader {
    control: u8,
    msg_id: u32,
    unknown: u8,
    msg_type: u16,
    zip_length: u16,
    length: u16,
}

impl ResponseHeader {
    fn parse(header: &[u8]) -> Result<Self, FrameError> {
        let truncated = |_| FrameError::Truncated;
        let control = *header.get(4).ok_or(FrameError::Truncated)?;
        let (rest, msg_id) = read_u32_le(&header[5..]).map_err(truncated)?;
        let unknown = *rest.first().ok_or(FrameError::Truncated)?;
        let (rest, msg_type) = read_u16_le(&rest[1..]).map_err(truncated)?;
        let (rest, zip_length) = read_u16_le(rest).map_err(truncated)?;
        let (_, length) = read_u16_le(rest).map_err(truncated)?;
        Ok(Self {
            control,
            msg_id,
            unknown,
            msg_type,
            zip_length,
            length,
        })
    }
}

/// 压缩长度与原始长度不同则需要 zlib 解压，解压后长度必须一致
fn inflate(body: &[u8], zip_length: u16, length: u16) -> Result<Vec<u8>, FrameError> {
    let data = if zip_length != length {
        let mut decoder = ZlibDecoder::new(body);
        let mut out = Vec::with_capacity(length as usize);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| FrameError::Decompression(e.to_string()))?;
        out
    } else {
        body.to_vec()
    };

    if data.len() != length as usize {
        return Err(FrameError::LengthMismatch);
    }
    Ok(data)
}

/// 响应流分包缓冲区
///
/// 从 TCP 字节流中切出完整响应帧；帧头不对时逐字节丢弃直到找到前缀。
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// 取出下一个完整帧，数据不够时返回 `Ok(None)`
    ///
    /// 帧头完整但数据域解不出时，整帧已从缓冲区移除，错误为带消息ID的 [`FrameError::Corrupt`]。
    pub fn next_frame(&mut self) -> Result<Option<ResponseFrame>, FrameError> {
        let prefix = PREFIX_RESP.to_be_bytes();
        loop {
            if self.buf.len() < RESPONSE_HEADER_LEN {
                return Ok(None);
            }
            if self.buf[..4] == prefix {
                break;
            }
            debug!("丢弃无效字节: {:02X}", self.buf[0]);
            self.buf.advance(1);
        }

        let header = ResponseHeader::parse(&self.buf[..RESPONSE_HEADER_LEN])?;
        let total = RESPONSE_HEADER_LEN + header.zip_length as usize;
        if self.buf.len() < total {
            return Ok(None);
        }

        let frame = self.buf.split_to(total);
        ResponseFrame::decode(&frame).map(Some).map_err(|e| FrameError::Corrupt {
            msg_id: header.msg_id,
            reason: Box::new(e),
        })
    }
}

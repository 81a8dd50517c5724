//! 数据编码/解码工具函数
//!
//! 所有读取函数都做越界检查，数据不足时返回 [`MessageError::Truncated`]，不会 panic。

use crate::protocol::constants::Exchange;
use crate::protocol::types::Price;
use encoding_rs::GBK;
use thiserror::Error;

/// 消息编解码错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("数据长度不足")]
    Truncated,
    #[error("无效的证券代码: {0}")]
    InvalidCode(String),
    #[error("解析错误: {0}")]
    Decode(String),
}

/// 变长整数最多5字节（6 + 7*4 = 34 位）
const VARINT_MAX_LEN: usize = 5;

/// 将 u16 转换为小端序字节数组
pub fn u16_to_bytes_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// 将 u32 转换为小端序字节数组
pub fn u32_to_bytes_le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// 读取小端序 u16，返回 (剩余字节, 值)
pub fn read_u16_le(bytes: &[u8]) -> Result<(&[u8], u16), MessageError> {
    match bytes {
        [a, b, rest @ ..] => Ok((rest, u16::from_le_bytes([*a, *b]))),
        _ => Err(MessageError::Truncated),
    }
}

/// 读取小端序 u32，返回 (剩余字节, 值)
pub fn read_u32_le(bytes: &[u8]) -> Result<(&[u8], u32), MessageError> {
    match bytes {
        [a, b, c, d, rest @ ..] => Ok((rest, u32::from_le_bytes([*a, *b, *c, *d]))),
        _ => Err(MessageError::Truncated),
    }
}

/// 读取大端序 u32，返回 (剩余字节, 值)
pub fn read_u32_be(bytes: &[u8]) -> Result<(&[u8], u32), MessageError> {
    match bytes {
        [a, b, c, d, rest @ ..] => Ok((rest, u32::from_be_bytes([*a, *b, *c, *d]))),
        _ => Err(MessageError::Truncated),
    }
}

/// 解析变长整数，返回 (剩余字节, 值)
///
/// 第一字节：
/// - 0x80：是否有后续字节
/// - 0x40：符号位（1=负）
/// - 低6位：数据
///
/// 后续字节：
/// - 0x80：是否有后续字节
/// - 低7位：数据，依次左移 6、13、20、27 位
pub fn read_varint(bytes: &[u8]) -> Result<(&[u8], i64), MessageError> {
    let mut value: i64 = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if i >= VARINT_MAX_LEN {
            return Err(MessageError::Decode("变长整数超过5字节".to_string()));
        }

        if i == 0 {
            value = (byte & 0x3F) as i64;
        } else {
            value |= ((byte & 0x7F) as i64) << (6 + (i - 1) * 7);
        }

        if byte & 0x80 == 0 {
            if bytes[0] & 0x40 != 0 {
                value = -value;
            }
            return Ok((&bytes[i + 1..], value));
        }
    }

    Err(MessageError::Truncated)
}

/// 解析价格差值（与变长整数同一编码，单字节可表示 -63..63）
///
/// 返回的是差值，累加由调用方负责。
pub fn read_price(bytes: &[u8]) -> Result<(&[u8], Price), MessageError> {
    let (rest, value) = read_varint(bytes)?;
    Ok((rest, Price(value)))
}

/// 编码变长整数
pub fn encode_varint(value: i64) -> Vec<u8> {
    let mut result = Vec::with_capacity(VARINT_MAX_LEN);
    let mut val = value.unsigned_abs();

    let mut first = (val & 0x3F) as u8;
    val >>= 6;
    if value < 0 {
        first |= 0x40;
    }
    if val > 0 {
        first |= 0x80;
    }
    result.push(first);

    while val > 0 {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        result.push(byte);
    }

    result
}

/// 解析成交量/成交额（4字节压缩浮点）
///
/// 最高字节为指数，其余3字节为尾数，最高尾数字节的 0x80 位同时控制低位的倍数。
pub fn decode_volume(word: u32) -> f64 {
    let logpoint = (word >> 24) as i32;
    let hleax = ((word >> 16) & 0xff) as i32;
    let lheax = ((word >> 8) & 0xff) as i32;
    let lleax = (word & 0xff) as i32;

    let base = 2_f64.powi(logpoint * 2 - 0x7f);

    let high = if hleax > 0x80 {
        base * (64.0 + (hleax & 0x7f) as f64) / 64.0
    } else {
        base * hleax as f64 / 128.0
    };

    let scale = if hleax & 0x80 != 0 { 2.0 } else { 1.0 };
    let mid = base * lheax as f64 / 32768.0 * scale;
    let low = base * lleax as f64 / 8388608.0 * scale;

    base + high + mid + low
}

/// 将 GBK 编码的字节数组转换为 UTF-8 字符串
///
/// 无法解码的字节替换为 U+FFFD，末尾的 `\0` 填充会被去掉。
pub fn gbk_to_utf8(bytes: &[u8]) -> String {
    let (cow, _, _) = GBK.decode(bytes);
    cow.trim_end_matches('\0').to_string()
}

/// 将 UTF-8 字符串转换为 GBK 编码的字节数组
pub fn utf8_to_gbk(s: &str) -> Vec<u8> {
    let (cow, _, _) = GBK.encode(s);
    cow.to_vec()
}

/// 按序读取字节的游标
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// 已消费的字节数
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn advance_to(&mut self, rest: &'a [u8]) {
        self.pos = self.buf.len() - rest.len();
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], MessageError> {
        if self.remaining() < n {
            return Err(MessageError::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), MessageError> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, MessageError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16_le(&mut self) -> Result<u16, MessageError> {
        let (rest, value) = read_u16_le(self.rest())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn i16_le(&mut self) -> Result<i16, MessageError> {
        self.u16_le().map(|v| v as i16)
    }

    pub fn u32_le(&mut self) -> Result<u32, MessageError> {
        let (rest, value) = read_u32_le(self.rest())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn f32_le(&mut self) -> Result<f32, MessageError> {
        self.u32_le().map(f32::from_bits)
    }

    /// 4字节压缩浮点
    pub fn volume(&mut self) -> Result<f64, MessageError> {
        self.u32_le().map(decode_volume)
    }

    pub fn varint(&mut self) -> Result<i64, MessageError> {
        let (rest, value) = read_varint(self.rest())?;
        self.advance_to(rest);
        Ok(value)
    }

    pub fn price(&mut self) -> Result<Price, MessageError> {
        let (rest, value) = read_price(self.rest())?;
        self.advance_to(rest);
        Ok(value)
    }
}

// ==================== 证券代码 ====================

/// 解析文本代码（如 `sz000001`）为 (交易所, 6位数字代码)
///
/// 前缀不区分大小写；去掉前缀后必须恰好是6位 ASCII 数字。
pub fn decode_code(code: &str) -> Result<(Exchange, String), MessageError> {
    let lower = code.trim().to_ascii_lowercase();
    let invalid = || MessageError::InvalidCode(code.to_string());

    let prefix = lower.get(..2).ok_or_else(invalid)?;
    let exchange = Exchange::from_prefix(prefix).ok_or_else(invalid)?;

    let number = &lower[2..];
    if number.len() != 6 || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    Ok((exchange, number.to_string()))
}

/// 由线上的 交易所字节 + 6字节代码 还原文本代码
pub fn encode_code(exchange: u8, number: &[u8]) -> Result<String, MessageError> {
    let invalid = || MessageError::InvalidCode(format!("{}:{}", exchange, String::from_utf8_lossy(number)));
    let exchange = Exchange::from_u8(exchange).ok_or_else(invalid)?;
    if number.len() != 6 || !number.iter().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    // 已校验为 ASCII 数字
    let digits: String = number.iter().map(|&b| b as char).collect();
    Ok(format!("{}{}", exchange.as_str(), digits))
}

/// 添加交易所前缀（已有前缀则只转小写）
pub fn add_prefix(code: &str) -> String {
    let code = code.trim().to_ascii_lowercase();
    if code.starts_with("sh") || code.starts_with("sz") || code.starts_with("bj") {
        return code;
    }
    if code.starts_with('6') || code.starts_with('9') {
        format!("sh{}", code)
    } else if code.starts_with('4') || code.starts_with('8') {
        format!("bj{}", code)
    } else {
        format!("sz{}", code)
    }
}

/// 规范化代码：补前缀、转小写并校验
pub fn normalize_code(code: &str) -> Result<String, MessageError> {
    let (exchange, number) = decode_code(&add_prefix(code))?;
    Ok(format!("{}{}", exchange.as_str(), number))
}

fn split_prefixed(code: &str) -> Option<(String, String)> {
    let code = add_prefix(code);
    if code.len() != 8 || !code.is_ascii() {
        return None;
    }
    let (prefix, number) = code.split_at(2);
    Some((prefix.to_string(), number.to_string()))
}

/// 判断是否为股票代码
pub fn is_stock(code: &str) -> bool {
    match split_prefixed(code) {
        Some((prefix, num)) => match prefix.as_str() {
            "sh" => num.starts_with('6'),
            "sz" => num.starts_with('0') || num.starts_with('3'),
            "bj" => num.starts_with('4') || num.starts_with('8'),
            _ => false,
        },
        None => false,
    }
}

/// 判断是否为ETF
pub fn is_etf(code: &str) -> bool {
    match split_prefixed(code) {
        Some((prefix, num)) => match prefix.as_str() {
            "sh" => num.starts_with("51") || num.starts_with("56") || num.starts_with("58"),
            "sz" => num.starts_with("15") || num.starts_with("16"),
            _ => false,
        },
        None => false,
    }
}

/// 判断是否为指数
pub fn is_index(code: &str) -> bool {
    match split_prefixed(code) {
        Some((prefix, num)) => match prefix.as_str() {
            "sh" => num.starts_with("000") || num.starts_with("880"),
            "sz" => num.starts_with("399"),
            "bj" => num.starts_with("899"),
            _ => false,
        },
        None => false,
    }
}

/// 成交价格的除数：基金报价多一位小数
pub fn price_divisor(code: &str) -> i64 {
    if is_etf(code) {
        10
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0x00], 0)]
    #[case(&[0x01], 1)]
    #[case(&[0x41], -1)]
    #[case(&[0x3F], 63)]
    #[case(&[0x7F], -63)]
    #[case(&[0xB2, 0x12], 1202)]
    #[case(&[0x80, 0x05], 320)]
    fn varint_values(#[case] bytes: &[u8], #[case] expected: i64) {
        let (rest, value) = read_varint(bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(value, expected);
    }

    #[test]
    fn varint_stops_at_clear_continuation_bit() {
        let (rest, value) = read_varint(&[0x4C, 0x56, 0x10]).unwrap();
        assert_eq!(value, -12);
        assert_eq!(rest, &[0x56, 0x10]);
    }

    #[test]
    fn varint_truncated() {
        assert_eq!(read_varint(&[]), Err(MessageError::Truncated));
        assert_eq!(read_varint(&[0x80, 0x80]), Err(MessageError::Truncated));
    }

    #[test]
    fn varint_too_long() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(read_varint(&bytes), Err(MessageError::Decode(_))));
    }

    #[rstest]
    #[case(0)]
    #[case(63)]
    #[case(-64)]
    #[case(1202)]
    #[case(-987_654)]
    #[case(123_456_789)]
    fn varint_encode_matches_decode(#[case] value: i64) {
        let bytes = encode_varint(value);
        let (rest, decoded) = read_varint(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, value);
    }

    #[test]
    fn volume_word() {
        // 指数 0x40 -> 2^1
        assert_eq!(decode_volume(0x4000_0000), 2.0);
        // 指数 0x41 -> 8，高位尾数 0x40 -> 8*64/128
        assert_eq!(decode_volume(0x4140_0000), 12.0);
        // 高位尾数带 0x80 位
        assert_eq!(decode_volume(0x4181_0000), 8.0 + 8.0 * 65.0 / 64.0);
    }

    #[test]
    fn reader_bounds() {
        let mut r = Reader::new(&[0x01, 0x02, 0x03]);
        assert_eq!(r.u16_le().unwrap(), 0x0201);
        assert_eq!(r.position(), 2);
        assert_eq!(r.u16_le(), Err(MessageError::Truncated));
        assert_eq!(r.u8().unwrap(), 0x03);
        assert_eq!(r.remaining(), 0);
        assert_eq!(r.varint(), Err(MessageError::Truncated));
    }

    #[test]
    fn gbk_text() {
        let bytes = utf8_to_gbk("平安银行");
        assert_eq!(bytes.len(), 8);
        assert_eq!(gbk_to_utf8(&bytes), "平安银行");
        let mut padded = bytes.clone();
        padded.extend_from_slice(&[0, 0]);
        assert_eq!(gbk_to_utf8(&padded), "平安银行");
        // 非法序列不报错
        assert!(!gbk_to_utf8(&[0xFF, 0xFF]).is_empty());
    }

    #[rstest]
    fn code_round_trip(
        #[values("sh", "sz", "bj")] prefix: &str,
        #[values("000001", "600008", "399001", "830799")] number: &str,
    ) {
        let code = format!("{}{}", prefix, number);
        let (exchange, digits) = decode_code(&code).unwrap();
        assert_eq!(encode_code(exchange.as_u8(), digits.as_bytes()).unwrap(), code);
    }

    #[rstest]
    #[case("sz00001")]
    #[case("sz0000011")]
    #[case("xx000001")]
    #[case("sz00000a")]
    #[case("s")]
    #[case("")]
    fn invalid_codes(#[case] code: &str) {
        assert!(matches!(decode_code(code), Err(MessageError::InvalidCode(_))));
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_code("SZ000001").unwrap(), "sz000001");
        assert_eq!(normalize_code("600000").unwrap(), "sh600000");
        assert_eq!(normalize_code("830799").unwrap(), "bj830799");
        assert!(normalize_code("60000").is_err());
    }

    #[test]
    fn classify() {
        assert!(is_stock("sz000001"));
        assert!(is_index("sh000001"));
        assert!(is_index("399001"));
        assert!(is_etf("sh510300"));
        assert!(!is_etf("sz000001"));
        assert_eq!(price_divisor("sh510300"), 10);
        assert_eq!(price_divisor("sz000001"), 1);
    }
}

//! 测试数据文件

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 抓包数据文件结构
#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct TestData {
    /// 接口名称
    pub name: String,
    /// 类型名称
    #[serde(rename = "type")]
    pub type_name: String,
    /// 类型值（十六进制）
    pub type_value: String,
    pub description: String,
    /// 请求帧的十六进制字符串
    pub request: String,
    #[serde(default)]
    pub request_description: Option<String>,
    /// 请求数据域（不含帧头）
    #[serde(default)]
    pub request_data: Option<String>,
    /// 响应帧的十六进制字符串（完整帧）
    pub response: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub notes: Option<String>,
}

#[allow(dead_code)]
impl TestData {
    pub fn load(name: &str) -> TestData {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(format!("{}.json", name));
        let content = fs::read_to_string(&path).unwrap_or_else(|e| panic!("读取 {:?} 失败: {}", path, e));
        serde_json::from_str(&content).unwrap()
    }

    pub fn request_bytes(&self) -> Vec<u8> {
        hex::decode(self.request.replace(' ', "")).unwrap()
    }

    pub fn request_data_bytes(&self) -> Option<Vec<u8>> {
        self.request_data.as_ref().map(|s| hex::decode(s.replace(' ', "")).unwrap())
    }

    pub fn response_bytes(&self) -> Vec<u8> {
        hex::decode(self.response.replace(' ', "")).unwrap()
    }
}

//! 按消息ID等待响应的请求表

use crate::protocol::{dispatch, Expect, Message, MessageError, ResponseFrame};
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

/// 投递给等待方的解码结果
pub type Delivery = Result<Message, MessageError>;

struct Pending {
    expect: Expect,
    tx: oneshot::Sender<Delivery>,
}

/// 等待中的请求
///
/// 请求发送前登记，读取任务收到响应后按消息ID取出并解码；超时的请求由等待方移除，
/// 之后到达的响应找不到登记项，直接丢弃。
#[derive(Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<u32, Pending>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, Pending>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 登记请求，返回接收解码结果的通道
    pub fn register(&self, msg_id: u32, expect: Expect) -> oneshot::Receiver<Delivery> {
        let (tx, rx) = oneshot::channel();
        if self.lock().insert(msg_id, Pending { expect, tx }).is_some() {
            debug!("消息ID {} 重复登记，旧的请求被覆盖", msg_id);
        }
        rx
    }

    /// 用响应完成对应的请求；没有登记项时返回 false，响应被丢弃
    pub fn complete(&self, frame: &ResponseFrame) -> bool {
        let Some(pending) = self.lock().remove(&frame.msg_id) else {
            debug!("丢弃无人等待的响应: msg_id={} type=0x{:04X}", frame.msg_id, frame.msg_type);
            return false;
        };

        let delivery = dispatch(frame, &pending.expect);
        if pending.tx.send(delivery).is_err() {
            debug!("等待方已放弃: msg_id={}", frame.msg_id);
        }
        true
    }

    /// 响应帧无法解出时，把错误交给等待方；没有登记项时返回 false
    pub fn fail(&self, msg_id: u32, error: MessageError) -> bool {
        let Some(pending) = self.lock().remove(&msg_id) else {
            debug!("丢弃无人等待的错误帧: msg_id={}", msg_id);
            return false;
        };
        if pending.tx.send(Err(error)).is_err() {
            debug!("等待方已放弃: msg_id={}", msg_id);
        }
        true
    }

    /// 移除登记项（超时或放弃等待）
    pub fn remove(&self, msg_id: u32) -> bool {
        self.lock().remove(&msg_id).is_some()
    }

    /// 丢弃全部登记项，等待方会收到通道关闭
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

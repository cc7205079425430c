//! Mock 串口链路
//!
//! 用于无硬件环境的测试：按脚本返回数据、超时或 I/O 错误，
//! 并可对写入的命令帧自动应答。

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{IngestionError, Result};
use crate::transport::{LinkOpener, Transport};

/// 单次读取的脚本步骤
#[derive(Debug, Clone)]
enum ReadStep {
    Data(Vec<u8>),
    Timeout,
    Fail(io::ErrorKind),
}

#[derive(Debug)]
struct MockInner {
    script: VecDeque<ReadStep>,
    /// 应答字节，优先于脚本被读出
    pending_reply: VecDeque<u8>,
    auto_replies: Vec<(Vec<u8>, Vec<u8>)>,
    written: Vec<u8>,
    fail_writes: bool,
    idle: Duration,
    /// 单次读取的超时上限，默认等于 `idle`
    read_timeout: Duration,
    open_count: usize,
    closed: bool,
}

/// Mock 串口
///
/// 克隆共享同一状态：测试保留一个句柄注入数据、检查写入，
/// 另一个（或 [`MockTransport::opener`] 打开的链路）交给被测代码。
#[derive(Debug, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    /// 创建新的 Mock 串口
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                script: VecDeque::new(),
                pending_reply: VecDeque::new(),
                auto_replies: Vec::new(),
                written: Vec::new(),
                fail_writes: false,
                idle: Duration::from_millis(2),
                read_timeout: Duration::from_millis(2),
                open_count: 0,
                closed: false,
            })),
        }
    }

    /// 脚本耗尽或超时步骤时，单次读取的阻塞时长
    pub fn with_idle(self, idle: Duration) -> Self {
        {
            let mut inner = self.inner.lock();
            inner.idle = idle;
            inner.read_timeout = idle;
        }
        self
    }

    /// 追加一次读取返回的数据（超过读缓冲的部分留给下一次读取）
    pub fn push_data(&self, data: &[u8]) {
        self.inner
            .lock()
            .script
            .push_back(ReadStep::Data(data.to_vec()));
    }

    /// 追加一次无数据的超时读取
    pub fn push_timeout(&self) {
        self.inner.lock().script.push_back(ReadStep::Timeout);
    }

    /// 追加一次失败读取
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.inner.lock().script.push_back(ReadStep::Fail(kind));
    }

    /// 写入内容等于 `command` 时，将 `reply` 排入读取队列
    pub fn reply_to(&self, command: &[u8], reply: &[u8]) {
        self.inner
            .lock()
            .auto_replies
            .push((command.to_vec(), reply.to_vec()));
    }

    /// 让后续写入失败
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// 所有已写入的字节
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().written.clone()
    }

    /// 尚未读取的脚本步骤数
    pub fn remaining_steps(&self) -> usize {
        self.inner.lock().script.len()
    }

    /// 链路被打开的次数
    pub fn open_count(&self) -> usize {
        self.inner.lock().open_count
    }

    /// 通过 opener 打开的链路是否已被释放
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// 打开共享本状态的链路
    pub fn opener(&self) -> MockOpener {
        MockOpener {
            transport: Some(self.clone()),
            endpoint: "mock".to_string(),
        }
    }

    /// 总是打开失败的 opener
    pub fn unreachable(endpoint: &str) -> MockOpener {
        MockOpener {
            transport: None,
            endpoint: endpoint.to_string(),
        }
    }

    fn read_scripted(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();

        if !inner.pending_reply.is_empty() {
            let n = inner.pending_reply.len().min(buffer.len());
            for (slot, byte) in buffer.iter_mut().zip(inner.pending_reply.drain(..n)) {
                *slot = byte;
            }
            return Ok(n);
        }

        match inner.script.pop_front() {
            Some(ReadStep::Data(data)) => {
                let n = data.len().min(buffer.len());
                buffer[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    inner.script.push_front(ReadStep::Data(data[n..].to_vec()));
                }
                Ok(n)
            }
            Some(ReadStep::Fail(kind)) => Err(io::Error::new(kind, "mock read failure")),
            Some(ReadStep::Timeout) | None => {
                let idle = inner.idle.min(inner.read_timeout);
                drop(inner);
                std::thread::sleep(idle);
                Ok(0)
            }
        }
    }

    fn write_scripted(&self, data: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }

        inner.written.extend_from_slice(data);
        let reply = inner
            .auto_replies
            .iter()
            .find(|(command, _)| command == data)
            .map(|(_, reply)| reply.clone());
        if let Some(reply) = reply {
            inner.pending_reply.extend(reply);
        }
        Ok(data.len())
    }

    fn current_read_timeout(&self) -> Duration {
        self.inner.lock().read_timeout
    }

    fn change_read_timeout(&self, timeout: Duration) {
        self.inner.lock().read_timeout = timeout;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.read_scripted(buffer)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.write_scripted(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read_timeout(&self) -> Option<Duration> {
        Some(self.current_read_timeout())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.change_read_timeout(timeout);
        Ok(())
    }
}

/// 被 opener 打开的链路，释放时标记为关闭
struct MockLink {
    transport: MockTransport,
}

impl Transport for MockLink {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.transport.read_scripted(buffer)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.transport.write_scripted(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read_timeout(&self) -> Option<Duration> {
        Some(self.transport.current_read_timeout())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.transport.change_read_timeout(timeout);
        Ok(())
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.transport.inner.lock().closed = true;
    }
}

/// [`MockTransport`] 的 opener
#[derive(Debug, Clone)]
pub struct MockOpener {
    transport: Option<MockTransport>,
    endpoint: String,
}

impl LinkOpener for MockOpener {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    fn open(&self) -> Result<Box<dyn Transport>> {
        let transport = self
            .transport
            .clone()
            .ok_or_else(|| IngestionError::link_open(&self.endpoint, "no such device"))?;

        {
            let mut inner = transport.inner.lock();
            inner.open_count += 1;
            inner.closed = false;
        }
        Ok(Box::new(MockLink { transport }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reads() {
        let mock = MockTransport::new().with_idle(Duration::from_millis(1));
        mock.push_data(&[1, 2, 3, 4, 5]);
        mock.push_timeout();
        mock.push_error(io::ErrorKind::BrokenPipe);

        let mut link = mock.clone();
        let mut buf = [0u8; 3];
        assert_eq!(link.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(link.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(link.read(&mut buf).unwrap(), 0);
        assert_eq!(
            link.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert_eq!(link.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_auto_reply_is_read_first() {
        let mock = MockTransport::new();
        mock.push_data(&[0xAA]);
        mock.reply_to(b"ping", b"pong");

        let mut link = mock.clone();
        link.write_all(b"ping").unwrap();
        assert_eq!(mock.written(), b"ping");

        let mut buf = [0u8; 8];
        let n = link.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"pong");
        assert_eq!(link.read(&mut buf).unwrap(), 1);
    }

    #[test]
    fn test_read_timeout_bounds_idle_read() {
        let mock = MockTransport::new().with_idle(Duration::from_secs(5));
        let mut link = mock.clone();
        assert_eq!(link.read_timeout(), Some(Duration::from_secs(5)));

        link.set_read_timeout(Duration::from_millis(1)).unwrap();
        let started = std::time::Instant::now();
        assert_eq!(link.read(&mut [0u8; 4]).unwrap(), 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_failed_writes() {
        let mock = MockTransport::new();
        mock.fail_writes(true);
        let mut link = mock.clone();
        assert!(link.write_all(b"x").is_err());
        assert!(mock.written().is_empty());
    }

    #[test]
    fn test_opener_tracks_close() {
        let mock = MockTransport::new();
        let link = mock.opener().open().unwrap();
        assert_eq!(mock.open_count(), 1);
        assert!(!mock.is_closed());
        drop(link);
        assert!(mock.is_closed());

        assert!(MockTransport::unreachable("/dev/none").open().is_err());
    }
}

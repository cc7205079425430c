//! LinkState 发布
//!
//! 单写者（Link Reader）、多读者。基于 `tokio::sync::watch`，读者既可以同步读取，
//! 也可以异步等待状态变化。

use std::time::Duration;

use contracts::LinkState;
use metrics::gauge;
use tokio::sync::watch;
use tracing::info;

/// 创建一对状态写端 / 读端，初始为 Disconnected
pub fn link_state() -> (LinkStateWriter, LinkStateHandle) {
    let (tx, rx) = watch::channel(LinkState::Disconnected);
    (LinkStateWriter { tx }, LinkStateHandle { rx })
}

/// 状态写端（不可克隆，只属于 Link Reader）
#[derive(Debug)]
pub struct LinkStateWriter {
    tx: watch::Sender<LinkState>,
}

impl LinkStateWriter {
    /// 更新状态，返回之前的状态
    pub fn set(&self, state: LinkState) -> LinkState {
        let previous = self.tx.send_replace(state);
        if previous != state {
            info!(from = ?previous, to = ?state, "link state changed");
        }
        gauge!("radar_link_connected").set(if state.is_connected() { 1.0 } else { 0.0 });
        previous
    }

    /// 当前状态
    pub fn get(&self) -> LinkState {
        *self.tx.borrow()
    }

    /// 新建读端
    pub fn subscribe(&self) -> LinkStateHandle {
        LinkStateHandle {
            rx: self.tx.subscribe(),
        }
    }
}

/// 状态读端
#[derive(Debug, Clone)]
pub struct LinkStateHandle {
    rx: watch::Receiver<LinkState>,
}

impl LinkStateHandle {
    /// 当前状态
    #[inline]
    pub fn get(&self) -> LinkState {
        *self.rx.borrow()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get().is_connected()
    }

    /// 等待状态变为 `target`
    ///
    /// 超时或写端已释放且状态不符时返回 `false`。
    pub async fn wait_for(&self, target: LinkState, timeout: Duration) -> bool {
        let mut rx = self.rx.clone();
        tokio::time::timeout(timeout, rx.wait_for(|s| *s == target))
            .await
            .is_ok_and(|reached| reached.is_ok())
    }
}

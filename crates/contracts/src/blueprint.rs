//! RadarBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：串口链路、队列策略、控制通道、输出路由。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RadarBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 串口链路设置
    #[serde(default)]
    #[validate(nested)]
    pub link: LinkConfig,

    /// 队列与分帧设置
    #[serde(default)]
    #[validate(nested)]
    pub pipeline: PipelineConfig,

    /// 控制通道设置
    #[serde(default)]
    #[validate(nested)]
    pub control: ControlConfig,

    /// 输出路由配置
    #[serde(default = "default_sinks")]
    #[validate(nested)]
    pub sinks: Vec<SinkConfig>,
}

impl Default for RadarBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            link: LinkConfig::default(),
            pipeline: PipelineConfig::default(),
            control: ControlConfig::default(),
            sinks: default_sinks(),
        }
    }
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![SinkConfig {
        name: "reports".to_string(),
        sink_type: SinkType::Broadcast,
        queue_capacity: default_queue_capacity(),
        overflow: SinkOverflow::default(),
    }]
}

/// 串口链路配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LinkConfig {
    /// 串口设备路径 (e.g., "/dev/ttyAMA0")
    #[serde(default = "default_link_path")]
    #[validate(length(min = 1))]
    pub path: String,

    /// 波特率
    #[serde(default = "default_baud_rate")]
    #[validate(range(min = 1200, max = 4_000_000))]
    pub baud_rate: u32,

    /// 单次读取超时 (毫秒)
    #[serde(default = "default_read_timeout_ms")]
    #[validate(range(min = 1, max = 10_000))]
    pub read_timeout_ms: u64,

    /// 单次读取的最大字节数
    #[serde(default = "default_read_chunk")]
    #[validate(range(min = 1, max = 4096))]
    pub read_chunk: usize,
}

impl LinkConfig {
    /// 单次读取超时
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            path: default_link_path(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            read_chunk: default_read_chunk(),
        }
    }
}

fn default_link_path() -> String {
    "/dev/ttyAMA0".to_string()
}

fn default_baud_rate() -> u32 {
    256_000
}

fn default_read_timeout_ms() -> u64 {
    50
}

fn default_read_chunk() -> usize {
    64
}

/// 队列与分帧配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Link Reader -> Dispatcher 队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// 队列满时的丢弃策略
    #[serde(default)]
    pub drop_policy: DropPolicy,

    /// 未见帧尾时累积字节的上限
    #[serde(default = "default_max_frame_len")]
    #[validate(range(min = 30, max = 65_536))]
    pub max_frame_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            drop_policy: DropPolicy::default(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

fn default_max_frame_len() -> usize {
    256
}

/// 丢包策略 (背压满时)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最旧的包
    #[default]
    DropOldest,
    /// 丢弃最新的包
    DropNewest,
    /// 阻塞生产者直到有空位
    Block,
}

/// 控制通道配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ControlConfig {
    /// 等待传感器应答的超时 (毫秒)
    #[serde(default = "default_ack_timeout_ms")]
    #[validate(range(min = 1, max = 60_000))]
    pub ack_timeout_ms: u64,

    /// 发送命令前进入配置模式，发送后退出
    #[serde(default = "default_true")]
    pub use_config_mode: bool,

    /// 启动后设置的跟踪模式 (None = 不修改)
    #[serde(default)]
    pub tracking_on_start: Option<bool>,
}

impl ControlConfig {
    /// 应答超时
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout_ms(),
            use_config_mode: true,
            tracking_on_start: None,
        }
    }
}

fn default_ack_timeout_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SinkConfig {
    /// Sink 名称
    #[validate(length(min = 1))]
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// 队列满时的处理方式
    #[serde(default)]
    pub overflow: SinkOverflow,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 订阅总线 (对外报告流)
    Broadcast,
}

/// Sink 队列满时的处理方式
///
/// 默认 `Block`：分发循环等待该 sink，积压回传到帧队列，
/// 由 `pipeline.drop_policy` 统一丢弃。`DropNewest` 在该 sink 处丢弃并计数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkOverflow {
    /// 等待 sink 腾出空位，不丢报告
    #[default]
    Block,
    /// 丢弃新报告，不拖慢其他 sink
    DropNewest,
}

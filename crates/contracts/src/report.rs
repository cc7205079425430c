//! RawFrame / RadarReport - Ingestion 与 Dispatcher 之间的数据结构
//!
//! 原始帧与解码后的目标报告。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 每帧固定的目标槽位数
pub const MAX_TARGETS: usize = 3;

/// 原始候选帧
///
/// Link Reader 按帧尾切分得到的字节序列，可能是畸形帧（截断、缺帧头、夹杂垃圾字节）。
/// 只被 Dispatcher 消费一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// 字节内容 (零拷贝)
    bytes: Bytes,
}

impl RawFrame {
    /// 创建原始帧
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// 帧字节
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 帧长度
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&'static [u8]> for RawFrame {
    fn from(bytes: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(bytes))
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// 单个目标测量值
///
/// `x == 0 && y == 0` 表示该槽位没有目标（传感器约定，不是错误）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetMeasurement {
    /// 槽位编号 (1..=3)
    #[serde(rename = "id")]
    pub slot: u8,

    /// 横向坐标 (mm)
    pub x: i16,

    /// 纵向坐标 (mm)
    pub y: i16,

    /// 速度 (cm/s)，远离为正
    pub speed: i16,

    /// 距离分辨率 (mm)
    #[serde(rename = "distance_res")]
    pub distance_resolution: u16,
}

impl TargetMeasurement {
    /// 空槽位
    pub const fn empty(slot: u8) -> Self {
        Self {
            slot,
            x: 0,
            y: 0,
            speed: 0,
            distance_resolution: 0,
        }
    }

    /// 槽位上是否有目标
    #[inline]
    pub fn is_present(&self) -> bool {
        self.x != 0 || self.y != 0
    }
}

/// 解码后的目标报告
///
/// 每成功解码一个 RawFrame 产生一个，发布后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarReport {
    /// 存在的目标 (0..=3 个，按槽位升序)
    pub targets: Vec<TargetMeasurement>,

    /// 采集时的连接状态
    pub connected: bool,

    /// 采集时间 (unix 秒)
    pub timestamp: f64,

    /// 发布序号 (仅用于诊断，不进入对外 JSON)
    #[serde(skip)]
    pub sequence: u64,
}

impl RadarReport {
    /// 目标数量
    #[inline]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// 存在目标的槽位编号
    pub fn slot_ids(&self) -> Vec<u8> {
        self.targets.iter().map(|t| t.slot).collect()
    }

    /// 按槽位查找目标
    pub fn target(&self, slot: u8) -> Option<&TargetMeasurement> {
        self.targets.iter().find(|t| t.slot == slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_convention() {
        assert!(!TargetMeasurement::empty(2).is_present());

        let t = TargetMeasurement {
            slot: 1,
            x: 0,
            y: 15,
            speed: 0,
            distance_resolution: 0,
        };
        assert!(t.is_present());
    }

    #[test]
    fn test_report_json_shape() {
        let report = RadarReport {
            targets: vec![TargetMeasurement {
                slot: 1,
                x: 100,
                y: 200,
                speed: -5,
                distance_resolution: 3,
            }],
            connected: true,
            timestamp: 1.5,
            sequence: 42,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "targets": [{"id": 1, "x": 100, "y": 200, "speed": -5, "distance_res": 3}],
                "connected": true,
                "timestamp": 1.5
            })
        );
    }

    #[test]
    fn test_raw_frame_from_static() {
        let frame = RawFrame::from(&b"\xAA\xFF\x03\x00"[..]);
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.as_bytes()[0], 0xAA);
    }
}

//! Radar link 指标收集模块
//!
//! 指标名称注册与描述，以及基于 RadarReport 的进程内统计（用于运行结束时的摘要）。
//!
//! 各 crate 在事件发生处直接通过 `metrics` facade 记录：
//!
//! | 指标 | 类型 | 标签 |
//! |------|------|------|
//! | `radar_link_frames_received_total` | counter | |
//! | `radar_link_frames_dropped_total` | counter | `reason` |
//! | `radar_link_reports_published_total` | counter | |
//! | `radar_link_targets_per_report` | histogram | |
//! | `radar_link_connected` | gauge | |
//! | `radar_link_tracking_commands_total` | counter | `status` |

use contracts::{RadarReport, MAX_TARGETS};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// 注册所有指标的描述（Prometheus HELP）
pub fn describe_metrics() {
    describe_counter!(
        "radar_link_frames_received_total",
        "Candidate frames cut from the serial stream"
    );
    describe_counter!(
        "radar_link_frames_dropped_total",
        "Candidate frames discarded before producing a report"
    );
    describe_counter!(
        "radar_link_reports_published_total",
        "Reports handed to the sinks"
    );
    describe_histogram!(
        "radar_link_targets_per_report",
        Unit::Count,
        "Occupied target slots per report"
    );
    describe_gauge!("radar_link_connected", "1 while the serial link is open");
    describe_counter!(
        "radar_link_tracking_commands_total",
        "Tracking mode commands by outcome"
    );
    describe_histogram!(
        "radar_link_report_latency_ms",
        Unit::Milliseconds,
        "Delay between report capture and subscriber receipt"
    );
}

/// 记录订阅端收到报告的延迟
pub fn record_report_latency_ms(latency_ms: f64) {
    histogram!("radar_link_report_latency_ms").record(latency_ms);
}

/// 记录 sink 累计写入结果
pub fn record_sink_totals(sink_name: &str, written: u64, failed: u64, dropped: u64) {
    let sink = sink_name.to_string();
    counter!("radar_link_sink_writes_total", "sink" => sink.clone(), "status" => "success")
        .absolute(written);
    counter!("radar_link_sink_writes_total", "sink" => sink.clone(), "status" => "failure")
        .absolute(failed);
    counter!("radar_link_sink_dropped_total", "sink" => sink).absolute(dropped);
}

/// 记录队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("radar_link_queue_depth").set(depth as f64);
}

/// 报告指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ReportMetricsAggregator {
    /// 报告总数
    pub total_reports: u64,

    /// 没有目标的报告数
    pub empty_reports: u64,

    /// 链路断开时产生的报告数
    pub disconnected_reports: u64,

    /// 各槽位出现目标的次数
    pub slot_occupancy: [u64; MAX_TARGETS],

    /// 每帧目标数统计
    pub target_stats: RunningStats,

    /// 目标距离统计 (mm)
    pub range_stats: RunningStats,

    /// 目标速度统计 (cm/s)
    pub speed_stats: RunningStats,

    /// 相邻报告间隔统计 (ms)
    pub interval_stats: RunningStats,

    last_timestamp: Option<f64>,
}

impl ReportMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, report: &RadarReport) {
        self.total_reports += 1;
        if report.targets.is_empty() {
            self.empty_reports += 1;
        }
        if !report.connected {
            self.disconnected_reports += 1;
        }

        self.target_stats.push(report.target_count() as f64);
        for target in &report.targets {
            let index = usize::from(target.slot).wrapping_sub(1);
            if let Some(count) = self.slot_occupancy.get_mut(index) {
                *count += 1;
            }
            self.range_stats
                .push(f64::from(target.x).hypot(f64::from(target.y)));
            self.speed_stats.push(f64::from(target.speed));
        }

        if let Some(last) = self.last_timestamp {
            self.interval_stats.push((report.timestamp - last) * 1000.0);
        }
        self.last_timestamp = Some(report.timestamp);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_reports: self.total_reports,
            empty_reports: self.empty_reports,
            disconnected_reports: self.disconnected_reports,
            empty_rate: if self.total_reports > 0 {
                self.empty_reports as f64 / self.total_reports as f64 * 100.0
            } else {
                0.0
            },
            report_rate_hz: if self.interval_stats.mean() > 0.0 {
                1000.0 / self.interval_stats.mean()
            } else {
                0.0
            },
            slot_occupancy: self.slot_occupancy,
            targets_per_report: StatsSummary::from(&self.target_stats),
            range_mm: StatsSummary::from(&self.range_stats),
            speed_cm_s: StatsSummary::from(&self.speed_stats),
            interval_ms: StatsSummary::from(&self.interval_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_reports: u64,
    pub empty_reports: u64,
    pub disconnected_reports: u64,
    pub empty_rate: f64,
    pub report_rate_hz: f64,
    pub slot_occupancy: [u64; MAX_TARGETS],
    pub targets_per_report: StatsSummary,
    pub range_mm: StatsSummary,
    pub speed_cm_s: StatsSummary,
    pub interval_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Radar Report Summary ===")?;
        writeln!(f, "Total reports: {}", self.total_reports)?;
        writeln!(
            f,
            "Empty reports: {} ({:.2}%)",
            self.empty_reports, self.empty_rate
        )?;
        writeln!(f, "Reports while disconnected: {}", self.disconnected_reports)?;
        writeln!(f, "Report rate: {:.1} Hz", self.report_rate_hz)?;
        writeln!(f, "Targets per report: {}", self.targets_per_report)?;
        writeln!(f, "Target range (mm): {}", self.range_mm)?;
        writeln!(f, "Target speed (cm/s): {}", self.speed_cm_s)?;
        writeln!(f, "Report interval (ms): {}", self.interval_ms)?;

        writeln!(f, "Slot occupancy:")?;
        for (i, count) in self.slot_occupancy.iter().enumerate() {
            writeln!(f, "  slot {}: {}", i + 1, count)?;
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

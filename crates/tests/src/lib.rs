//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（报告 JSON 形状、配置默认值）
//! - 模拟 e2e 测试（MockTransport -> Link Reader -> Dispatcher -> 订阅者，无需串口硬件）
//! - 控制通道与读线程共享链路的场景

#[cfg(test)]
mod contract_tests {
    use contracts::{RadarBlueprint, RadarReport, TargetMeasurement};

    #[test]
    fn test_report_wire_shape() {
        let report = RadarReport {
            targets: vec![TargetMeasurement {
                slot: 3,
                x: -50,
                y: 10,
                speed: 2,
                distance_resolution: 1,
            }],
            connected: false,
            timestamp: 1_700_000_000.25,
            sequence: 9,
        };

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"targets":[{"id":3,"x":-50,"y":10,"speed":2,"distance_res":1}],"connected":false,"timestamp":1700000000.25}"#
        );
    }

    #[test]
    fn test_default_config_loads_from_empty_toml() {
        let blueprint =
            config_loader::ConfigLoader::load_from_str("", config_loader::ConfigFormat::Toml)
                .unwrap();
        let defaults = RadarBlueprint::default();
        assert_eq!(blueprint.link.path, defaults.link.path);
        assert_eq!(blueprint.link.baud_rate, 256_000);
        assert_eq!(blueprint.sinks.len(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{
        LinkState, RadarBlueprint, RadarReport, SinkConfig, SinkOverflow, SinkType,
        TargetMeasurement,
    };
    use control::{ControlChannel, ControlError, ControlSettings};
    use dispatcher::{create_dispatcher, DispatchSnapshot};
    use ingestion::{
        frame_queue, BackpressureConfig, IngestionMetrics, LinkOpener, LinkReader,
        MockTransport, ReaderExit, ReaderSettings,
    };
    use observability::ReportMetricsAggregator;
    use protocol::{encode, encode_tracking_command, REPORT_HEADER, REPORT_TAIL};
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tokio::task::JoinHandle;

    const MULTI_ACK: [u8; 14] = [
        0xFD, 0xFC, 0xFB, 0xFA, 0x04, 0x00, 0x90, 0x01, 0x00, 0x00, 0x04, 0x03, 0x02, 0x01,
    ];

    fn target(slot: u8, x: i16, y: i16, speed: i16, distance_resolution: u16) -> TargetMeasurement {
        TargetMeasurement {
            slot,
            x,
            y,
            speed,
            distance_resolution,
        }
    }

    fn scenario_frame() -> Vec<u8> {
        encode(&[
            target(1, 100, 200, -5, 3),
            target(2, 0, 0, 0, 0),
            target(3, -50, 10, 2, 1),
        ])
        .to_vec()
    }

    /// Reader + dispatcher wired the way the CLI wires them
    struct Harness {
        reader: LinkReader,
        dispatcher: JoinHandle<DispatchSnapshot>,
        reports: broadcast::Receiver<RadarReport>,
    }

    fn start<O: LinkOpener>(opener: O, blueprint: &RadarBlueprint) -> Harness {
        let metrics = Arc::new(IngestionMetrics::new());
        let (tx, rx) = frame_queue(
            &BackpressureConfig::from(&blueprint.pipeline),
            metrics.clone(),
        );
        let reader = LinkReader::spawn(
            opener,
            ReaderSettings::from_config(&blueprint.link, &blueprint.pipeline),
            tx,
            metrics,
        )
        .unwrap();

        let sinks = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 16,
                overflow: SinkOverflow::Block,
            },
            SinkConfig {
                name: "bus".to_string(),
                sink_type: SinkType::Broadcast,
                queue_capacity: 16,
                overflow: SinkOverflow::Block,
            },
        ];
        let dispatcher = create_dispatcher(sinks, rx, reader.state()).unwrap();
        let reports = dispatcher.bus().subscribe();

        Harness {
            reader,
            dispatcher: dispatcher.spawn(),
            reports,
        }
    }

    /// Every report published until the bus closes
    async fn collect_all(mut reports: broadcast::Receiver<RadarReport>) -> Vec<RadarReport> {
        let mut collected = Vec::new();
        let drain = async {
            while let Ok(report) = reports.recv().await {
                collected.push(report);
            }
        };
        tokio::time::timeout(Duration::from_secs(5), drain)
            .await
            .expect("report bus did not close");
        collected
    }

    /// End-to-end: scripted link -> reader -> dispatcher -> subscriber
    ///
    /// The stream ends with a read failure, which closes the queue and lets
    /// the dispatcher drain.
    #[tokio::test]
    async fn test_scenario_report_keeps_slot_gap() {
        let mock = MockTransport::new();
        mock.push_data(&scenario_frame());
        mock.push_error(std::io::ErrorKind::BrokenPipe);

        let harness = start(mock.opener(), &RadarBlueprint::default());
        let reports = collect_all(harness.reports).await;

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.slot_ids(), vec![1, 3]);
        assert_eq!(report.targets[0], target(1, 100, 200, -5, 3));
        assert_eq!(report.targets[1], target(3, -50, 10, 2, 1));
        assert!(report.connected);
        assert!(report.timestamp > 0.0);

        let snapshot = harness.dispatcher.await.unwrap();
        assert_eq!(snapshot.reports_published, 1);
        assert!(matches!(harness.reader.join(), ReaderExit::ReadFailed(_)));
    }

    #[tokio::test]
    async fn test_malformed_then_valid_yields_one_report() {
        let mut truncated = REPORT_HEADER.to_vec();
        truncated.extend_from_slice(&[0x01; 8]);
        truncated.extend_from_slice(&REPORT_TAIL);

        let mock = MockTransport::new();
        mock.push_data(&truncated);
        mock.push_data(&[0x13, 0x37]);
        mock.push_data(&scenario_frame());
        mock.push_error(std::io::ErrorKind::TimedOut);

        let harness = start(mock.opener(), &RadarBlueprint::default());
        let reports = collect_all(harness.reports).await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].slot_ids(), vec![1, 3]);

        let snapshot = harness.dispatcher.await.unwrap();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.frames_rejected, 1);
    }

    #[tokio::test]
    async fn test_frame_trickled_byte_by_byte() {
        let mock = MockTransport::new();
        for byte in scenario_frame() {
            mock.push_data(&[byte]);
        }
        mock.push_data(&scenario_frame());
        mock.push_error(std::io::ErrorKind::BrokenPipe);

        let harness = start(mock.opener(), &RadarBlueprint::default());
        let reports = collect_all(harness.reports).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].targets, reports[1].targets);
        assert!(reports[0].sequence < reports[1].sequence);
    }

    #[tokio::test]
    async fn test_reports_feed_aggregator() {
        let empty = encode(&[
            TargetMeasurement::empty(1),
            TargetMeasurement::empty(2),
            TargetMeasurement::empty(3),
        ]);

        let mock = MockTransport::new();
        mock.push_data(&scenario_frame());
        mock.push_data(&empty);
        mock.push_error(std::io::ErrorKind::BrokenPipe);

        let harness = start(mock.opener(), &RadarBlueprint::default());
        let reports = collect_all(harness.reports).await;

        let mut aggregator = ReportMetricsAggregator::new();
        for report in &reports {
            aggregator.update(report);
        }
        let summary = aggregator.summary();
        assert_eq!(summary.total_reports, 2);
        assert_eq!(summary.empty_reports, 1);
        assert_eq!(summary.slot_occupancy, [1, 0, 1]);
    }

    #[tokio::test]
    async fn test_read_error_disconnects_link() {
        let mock = MockTransport::new();
        mock.push_timeout();
        mock.push_error(std::io::ErrorKind::BrokenPipe);

        let harness = start(mock.opener(), &RadarBlueprint::default());
        let state = harness.reader.state();

        assert!(
            state
                .wait_for(LinkState::Disconnected, Duration::from_secs(2))
                .await
        );
        let exit = harness.reader.join();
        assert!(exit.is_fault());
        assert!(matches!(exit, ReaderExit::ReadFailed(_)));
        assert_eq!(state.get(), LinkState::Disconnected);
        assert!(mock.is_closed());
    }

    #[tokio::test]
    async fn test_open_failure_rejects_control() {
        let blueprint = RadarBlueprint::default();
        let harness = start(MockTransport::unreachable("/dev/ttyMissing"), &blueprint);
        let state = harness.reader.state();
        let control = ControlChannel::new(
            harness.reader.link(),
            state.clone(),
            ControlSettings::from(&blueprint.control),
        );

        assert!(matches!(harness.reader.join(), ReaderExit::OpenFailed(_)));
        assert_eq!(state.get(), LinkState::Disconnected);
        assert!(!control.status().connected);
        assert!(matches!(
            control.set_tracking_async(true).await,
            Err(ControlError::LinkNotConnected)
        ));

        let reports = collect_all(harness.reports).await;
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_set_tracking_twice_while_reading() {
        let mock = MockTransport::new();
        mock.reply_to(&encode_tracking_command(true), &MULTI_ACK);
        mock.push_data(&scenario_frame());

        let mut blueprint = RadarBlueprint::default();
        blueprint.control.use_config_mode = false;

        let mut harness = start(mock.opener(), &blueprint);
        let state = harness.reader.state();
        assert!(
            state
                .wait_for(LinkState::Connected, Duration::from_secs(2))
                .await
        );

        let control = ControlChannel::new(
            harness.reader.link(),
            state,
            ControlSettings::from(&blueprint.control),
        );
        assert!(control.set_tracking_async(true).await.unwrap());
        assert!(control.set_tracking_async(true).await.unwrap());

        let mut expected = encode_tracking_command(true);
        expected.extend(encode_tracking_command(true));
        assert_eq!(mock.written(), expected);

        // Reporting keeps flowing around the command exchanges
        let report = tokio::time::timeout(Duration::from_secs(2), harness.reports.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.slot_ids(), vec![1, 3]);

        assert!(matches!(harness.reader.shutdown(), ReaderExit::Stopped));
        harness.dispatcher.await.unwrap();
    }

    /// A command exchange that swallows the head of a frame must not let the
    /// reader stitch the frame before it onto the rest of that one
    #[tokio::test]
    async fn test_no_report_from_frames_split_by_exchange() {
        let first = scenario_frame();
        let second = encode(&[
            target(1, 7, -9, 500, 33),
            target(2, 11, 12, 13, 14),
            target(3, 21, 22, 23, 24),
        ]);

        let mut reply = MULTI_ACK.to_vec();
        reply.extend_from_slice(&second[..5]);

        let mock = MockTransport::new();
        mock.reply_to(&encode_tracking_command(true), &reply);
        mock.push_data(&first[..17]);

        let mut blueprint = RadarBlueprint::default();
        blueprint.control.use_config_mode = false;

        let harness = start(mock.opener(), &blueprint);
        let state = harness.reader.state();
        assert!(
            state
                .wait_for(LinkState::Connected, Duration::from_secs(2))
                .await
        );
        while mock.remaining_steps() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let control = ControlChannel::new(
            harness.reader.link(),
            state,
            ControlSettings::from(&blueprint.control),
        );
        assert!(control.set_tracking_async(true).await.unwrap());

        mock.push_data(&second[5..]);
        mock.push_data(&scenario_frame());
        mock.push_error(std::io::ErrorKind::BrokenPipe);

        let reports = collect_all(harness.reports).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].targets[0], target(1, 100, 200, -5, 3));
        assert_eq!(reports[0].targets[1], target(3, -50, 10, 2, 1));
    }

    #[tokio::test]
    async fn test_config_file_drives_pipeline() {
        let content = r#"
[link]
path = "/dev/ttyMock"
read_chunk = 7

[pipeline]
queue_capacity = 4
drop_policy = "block"
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(content, config_loader::ConfigFormat::Toml)
                .unwrap();

        let mock = MockTransport::new();
        mock.push_data(&scenario_frame());
        mock.push_data(&scenario_frame());
        mock.push_error(std::io::ErrorKind::BrokenPipe);

        let harness = start(mock.opener(), &blueprint);
        let reports = collect_all(harness.reports).await;
        assert_eq!(reports.len(), 2);
    }
}

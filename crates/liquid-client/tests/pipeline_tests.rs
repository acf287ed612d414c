//! 测量 -> 体积 -> 发布 全链路测试
//!
//! 传感器使用 `EchoSimulator`（模拟时钟），发布端使用 `MockPublishClient`。

use liquid_client::mock::MockPublishClient;
use liquid_client::{
    CycleOutcome, FailurePolicy, LoopConfig, MeasurementLoop, PublishClient, StatusPublisher,
};
use liquid_driver::{RangeSensor, SensorConfig};
use liquid_hal::mock::{EchoProfile, EchoSimulator};
use liquid_tools::{ContainerGeometry, PartialStatus, PayloadLayout, StatusSnapshot};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn reference_tank() -> ContainerGeometry {
    ContainerGeometry::rectangular(50.0, 50.0, 100.0).unwrap()
}

/// 30cm 距离对应的回波宽度（取整到 1μs）
fn echo_for_30cm() -> Duration {
    Duration::from_micros(1749)
}

#[test]
fn test_reference_tank_end_to_end() {
    let sim = EchoSimulator::pulse(echo_for_30cm());
    let sensor =
        RangeSensor::new(sim.trigger(), sim.echo(), sim.clock(), SensorConfig::default()).unwrap();

    let client = MockPublishClient::new();
    let geometry = reference_tank();
    let publisher = StatusPublisher::shared(
        client.clone(),
        "water/tank",
        StatusSnapshot::initial(&geometry),
        PayloadLayout::Full,
    );
    let mut mloop = MeasurementLoop::new(sensor, publisher, geometry, LoopConfig::default());

    assert_eq!(mloop.step(), CycleOutcome::Published);

    let message = client.last_message().unwrap();
    assert_eq!(message.topic, "water/tank");
    assert!(message.retain);

    let payload: serde_json::Value = serde_json::from_str(&message.payload).unwrap();
    assert_eq!(payload["current_distance"], "30.0");
    assert_eq!(payload["current_level"], "70.0");
    assert_eq!(payload["max_level"], "100.0");
    assert_eq!(payload["current_volume"], "175.0");
    assert_eq!(payload["max_volume"], "250.0");

    // 同一读数再次测量：不重复发布
    assert_eq!(mloop.step(), CycleOutcome::Unchanged);
    assert_eq!(client.publish_count(), 1);
}

/// 传感器配置中的偏移在发布前扣除
#[test]
fn test_sensor_offset_is_applied() {
    let sim = EchoSimulator::pulse(echo_for_30cm());
    let sensor = RangeSensor::new(
        sim.trigger(),
        sim.echo(),
        sim.clock(),
        SensorConfig {
            offset_cm: 10.0,
            ..Default::default()
        },
    )
    .unwrap();

    let client = MockPublishClient::new();
    let geometry = reference_tank();
    let publisher = StatusPublisher::shared(
        client.clone(),
        "water/tank",
        StatusSnapshot::initial(&geometry),
        PayloadLayout::Full,
    );
    let mut mloop = MeasurementLoop::new(sensor, publisher, geometry, LoopConfig::default());

    assert_eq!(mloop.step(), CycleOutcome::Published);

    let payload: serde_json::Value =
        serde_json::from_str(&client.last_message().unwrap().payload).unwrap();
    assert_eq!(payload["current_distance"], "20.0");
    assert_eq!(payload["current_level"], "80.0");
    assert_eq!(payload["current_volume"], "200.0");
}

#[test]
fn test_reconnect_republishes_unchanged_state() {
    let sim = EchoSimulator::pulse(echo_for_30cm());
    let sensor =
        RangeSensor::new(sim.trigger(), sim.echo(), sim.clock(), SensorConfig::default()).unwrap();
    let client = MockPublishClient::new();
    let geometry = reference_tank();
    let publisher = StatusPublisher::shared(
        client.clone(),
        "water/tank",
        StatusSnapshot::initial(&geometry),
        PayloadLayout::Full,
    );
    let mut mloop = MeasurementLoop::new(sensor, publisher, geometry, LoopConfig::default());

    // 首次连接：发布启动快照（哨兵值）
    client.connect().unwrap();
    assert_eq!(client.publish_count(), 1);
    assert!(client.last_message().unwrap().payload.contains(r#""current_distance":"-1.0""#));

    mloop.step();
    let before = client.last_message().unwrap();
    assert_eq!(client.publish_count(), 2);

    // 重连：状态未变化，仍然重发
    client.simulate_connect();
    assert_eq!(client.publish_count(), 3);
    assert_eq!(client.last_message().unwrap(), before);
}

#[test]
fn test_sensor_fault_keeps_retained_state() {
    let sim = EchoSimulator::pulse(echo_for_30cm());
    let sensor = RangeSensor::new(
        sim.trigger(),
        sim.echo(),
        sim.clock(),
        SensorConfig {
            max_wait: Duration::from_millis(5),
            ..Default::default()
        },
    )
    .unwrap();
    let client = MockPublishClient::new();
    let geometry = reference_tank();
    let publisher = StatusPublisher::shared(
        client.clone(),
        "water/tank",
        StatusSnapshot::initial(&geometry),
        PayloadLayout::Full,
    );
    let mut mloop = MeasurementLoop::new(sensor, publisher, geometry, LoopConfig::default());

    assert_eq!(mloop.step(), CycleOutcome::Published);
    sim.set_profile(EchoProfile::NeverRises);
    assert_eq!(mloop.step(), CycleOutcome::Failed);
    assert_eq!(client.publish_count(), 1);
    assert_eq!(mloop.stats().failures, 1);

    // 释放线路：trigger 保持低电平
    let _lines = mloop.into_source().release();
    assert!(!sim.trigger_level());
}

#[test]
fn test_sentinel_policy_with_distance_layout() {
    let sim = EchoSimulator::new(EchoProfile::NeverRises, Duration::from_micros(1));
    let sensor = RangeSensor::new(
        sim.trigger(),
        sim.echo(),
        sim.clock(),
        SensorConfig {
            max_wait: Duration::from_millis(1),
            ..Default::default()
        },
    )
    .unwrap();
    let client = MockPublishClient::new();
    let geometry = reference_tank();
    // 启动快照先放入一个有效距离，才能观察到哨兵值的变化
    let publisher = StatusPublisher::shared(
        client.clone(),
        "water/tank",
        StatusSnapshot::from_distance(30.0, &geometry),
        PayloadLayout::Distance,
    );
    let config = LoopConfig {
        failure_policy: FailurePolicy::Sentinel,
        ..Default::default()
    };
    let mut mloop = MeasurementLoop::new(sensor, publisher, geometry, config);

    assert_eq!(mloop.step(), CycleOutcome::Failed);
    assert_eq!(
        client.last_message().unwrap().payload,
        r#"{"distance":"-1.0"}"#
    );
}

/// 重连回调与测量循环并发访问同一快照
#[test]
fn test_concurrent_reconnect_and_updates() {
    let client = MockPublishClient::new();
    let geometry = reference_tank();
    let publisher = StatusPublisher::shared(
        client.clone(),
        "water/tank",
        StatusSnapshot::initial(&geometry),
        PayloadLayout::Full,
    );

    let reconnects = {
        let client = client.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                client.simulate_connect();
            }
        })
    };

    let updater = {
        let publisher = Arc::clone(&publisher);
        thread::spawn(move || {
            for i in 0..200 {
                let snapshot = StatusSnapshot::from_distance(f64::from(i % 90), &geometry);
                publisher.update(PartialStatus::full(&snapshot)).unwrap();
            }
        })
    };

    reconnects.join().unwrap();
    updater.join().unwrap();

    // 每条消息都是完整、可解析的载荷
    for message in client.published() {
        let payload: serde_json::Value = serde_json::from_str(&message.payload).unwrap();
        assert_eq!(payload.as_object().unwrap().len(), 5);
    }

    // 最后一次重发与当前快照一致
    publisher.republish_unconditionally().unwrap();
    let expected = publisher.last_status().render(PayloadLayout::Full).unwrap();
    assert_eq!(client.last_message().unwrap().payload, expected);
}

//! # 状态快照
//!
//! 对外发布的完整状态及其增量覆盖。
//!
//! 数值在内部保持未取整的 `f64`，只在序列化边界格式化为一位小数，
//! 差异比较基于渲染后的载荷字节，因此取整后相同的读数不会触发重复发布。

use crate::geometry::{ContainerGeometry, volume_liters};
use serde::{Deserialize, Serialize};

/// 一位小数，与区域设置无关
pub fn format_one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}

/// 载荷布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadLayout {
    /// 五个字段（距离、液位、最大液位、体积、最大体积）
    #[default]
    Full,
    /// 精简布局，仅 `distance`
    Distance,
}

/// 完整状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    /// 当前距离（cm，已扣除偏移）
    pub current_distance: f64,
    /// 当前液位（cm）
    pub current_level: f64,
    /// 最大液位（cm，即容器高度）
    pub max_level: f64,
    /// 当前体积（L）
    pub current_volume: f64,
    /// 最大体积（L）
    pub max_volume: f64,
}

/// 启动时尚未测量的字段取值
pub const SENTINEL: f64 = -1.0;

impl StatusSnapshot {
    /// 启动快照：测量字段为哨兵值，容器字段来自几何参数
    pub fn initial(geometry: &ContainerGeometry) -> Self {
        Self {
            current_distance: SENTINEL,
            current_level: SENTINEL,
            max_level: geometry.height_cm(),
            current_volume: SENTINEL,
            max_volume: geometry.max_volume_liters(),
        }
    }

    /// 由一次成功测量构造（各字段互相一致）
    ///
    /// `distance_cm` 为已扣除偏移的距离；液位 = 容器高度 - 距离。
    pub fn from_distance(distance_cm: f64, geometry: &ContainerGeometry) -> Self {
        let level = geometry.height_cm() - distance_cm;
        Self {
            current_distance: distance_cm,
            current_level: level,
            max_level: geometry.height_cm(),
            current_volume: volume_liters(level, geometry),
            max_volume: geometry.max_volume_liters(),
        }
    }

    /// 逐字段覆盖：`delta` 中为 `Some` 的字段替换，其余保留
    pub fn overlay(&self, delta: &PartialStatus) -> Self {
        Self {
            current_distance: delta.current_distance.unwrap_or(self.current_distance),
            current_level: delta.current_level.unwrap_or(self.current_level),
            max_level: delta.max_level.unwrap_or(self.max_level),
            current_volume: delta.current_volume.unwrap_or(self.current_volume),
            max_volume: delta.max_volume.unwrap_or(self.max_volume),
        }
    }

    /// 渲染为规范 JSON（字段顺序固定）
    pub fn render(&self, layout: PayloadLayout) -> Result<String, serde_json::Error> {
        match layout {
            PayloadLayout::Full => serde_json::to_string(&FullPayload {
                current_distance: format_one_decimal(self.current_distance),
                current_level: format_one_decimal(self.current_level),
                max_level: format_one_decimal(self.max_level),
                current_volume: format_one_decimal(self.current_volume),
                max_volume: format_one_decimal(self.max_volume),
            }),
            PayloadLayout::Distance => serde_json::to_string(&DistancePayload {
                distance: format_one_decimal(self.current_distance),
            }),
        }
    }
}

// serde 按声明顺序输出字段
#[derive(Serialize)]
struct FullPayload {
    current_distance: String,
    current_level: String,
    max_level: String,
    current_volume: String,
    max_volume: String,
}

#[derive(Serialize)]
struct DistancePayload {
    distance: String,
}

/// 部分状态（增量）
///
/// 只包含本次要（重新）声明的字段，其余字段继承上一快照。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialStatus {
    pub current_distance: Option<f64>,
    pub current_level: Option<f64>,
    pub max_level: Option<f64>,
    pub current_volume: Option<f64>,
    pub max_volume: Option<f64>,
}

impl PartialStatus {
    /// 空增量（不改变任何字段）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 全字段增量（完整覆盖）
    pub fn full(snapshot: &StatusSnapshot) -> Self {
        Self {
            current_distance: Some(snapshot.current_distance),
            current_level: Some(snapshot.current_level),
            max_level: Some(snapshot.max_level),
            current_volume: Some(snapshot.current_volume),
            max_volume: Some(snapshot.max_volume),
        }
    }

    /// 测量失败：测量字段置为哨兵值，容器字段不变
    pub fn failed() -> Self {
        Self {
            current_distance: Some(SENTINEL),
            current_level: Some(SENTINEL),
            current_volume: Some(SENTINEL),
            ..Self::default()
        }
    }

    pub fn with_distance(mut self, distance_cm: f64) -> Self {
        self.current_distance = Some(distance_cm);
        self
    }

    pub fn with_level(mut self, level_cm: f64) -> Self {
        self.current_level = Some(level_cm);
        self
    }

    pub fn with_volume(mut self, volume_liters: f64) -> Self {
        self.current_volume = Some(volume_liters);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<StatusSnapshot> for PartialStatus {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self::full(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank() -> ContainerGeometry {
        ContainerGeometry::rectangular(50.0, 50.0, 100.0).unwrap()
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = StatusSnapshot::initial(&tank());
        assert_eq!(snapshot.current_distance, -1.0);
        assert_eq!(snapshot.current_level, -1.0);
        assert_eq!(snapshot.current_volume, -1.0);
        assert_eq!(snapshot.max_level, 100.0);
        assert!((snapshot.max_volume - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_distance_is_consistent() {
        let snapshot = StatusSnapshot::from_distance(30.0, &tank());
        assert_eq!(snapshot.current_level, 70.0);
        assert!((snapshot.current_volume - 175.0).abs() < 1e-9);
        assert_eq!(
            snapshot.current_level,
            snapshot.max_level - snapshot.current_distance
        );
    }

    #[test]
    fn test_render_full_layout() {
        let snapshot = StatusSnapshot::from_distance(30.0, &tank());
        assert_eq!(
            snapshot.render(PayloadLayout::Full).unwrap(),
            r#"{"current_distance":"30.0","current_level":"70.0","max_level":"100.0","current_volume":"175.0","max_volume":"250.0"}"#
        );
    }

    #[test]
    fn test_render_distance_layout() {
        let snapshot = StatusSnapshot::from_distance(12.345, &tank());
        assert_eq!(
            snapshot.render(PayloadLayout::Distance).unwrap(),
            r#"{"distance":"12.3"}"#
        );
    }

    #[test]
    fn test_format_one_decimal() {
        assert_eq!(format_one_decimal(0.0), "0.0");
        assert_eq!(format_one_decimal(-1.0), "-1.0");
        assert_eq!(format_one_decimal(99.96), "100.0");
        assert_eq!(format_one_decimal(1234.5678), "1234.6");
    }

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let base = StatusSnapshot::initial(&tank());
        let merged = base.overlay(&PartialStatus::empty().with_distance(42.0));

        assert_eq!(merged.current_distance, 42.0);
        assert_eq!(merged.current_level, base.current_level);
        assert_eq!(merged.max_level, base.max_level);
        assert_eq!(merged.current_volume, base.current_volume);
        assert_eq!(merged.max_volume, base.max_volume);
    }

    #[test]
    fn test_overlay_full_replaces_everything() {
        let base = StatusSnapshot::initial(&tank());
        let next = StatusSnapshot::from_distance(10.0, &tank());
        assert_eq!(base.overlay(&PartialStatus::from(next)), next);
    }

    #[test]
    fn test_failed_delta_keeps_container_fields() {
        let base = StatusSnapshot::from_distance(30.0, &tank());
        let failed = base.overlay(&PartialStatus::failed());

        assert_eq!(failed.current_distance, -1.0);
        assert_eq!(failed.current_level, -1.0);
        assert_eq!(failed.current_volume, -1.0);
        assert_eq!(failed.max_level, 100.0);
        assert_eq!(failed.max_volume, base.max_volume);
    }

    #[test]
    fn test_layout_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            layout: PayloadLayout,
        }

        let w: Wrapper = serde_json::from_str(r#"{"layout":"distance"}"#).unwrap();
        assert_eq!(w.layout, PayloadLayout::Distance);
        let w: Wrapper = serde_json::from_str(r#"{"layout":"full"}"#).unwrap();
        assert_eq!(w.layout, PayloadLayout::Full);
        assert!(PartialStatus::empty().is_empty());
    }
}

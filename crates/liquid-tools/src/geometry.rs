//! # 容器几何
//!
//! 液位（cm）到体积（L）的换算。
//!
//! | 形状 | 体积 |
//! |------|------|
//! | 圆柱 | π × (d/2)² × level / 1000 |
//! | 长方体 | length × width × level / 1000 |
//!
//! 换算**不做钳位**：液位超过容器高度（溢出）或为负（液面低于参考面）
//! 时，结果落在 `[0, max_volume]` 之外，作为异常状态如实上报。

use std::f64::consts::PI;
use thiserror::Error;

/// 立方厘米到升
pub const CM3_PER_LITER: f64 = 1000.0;

/// 几何参数错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Container {name} must be a finite value > 0, got {value}")]
    NonPositiveDimension { name: &'static str, value: f64 },
}

/// 容器几何
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainerGeometry {
    Cylindrical { diameter_cm: f64, height_cm: f64 },
    Rectangular {
        length_cm: f64,
        width_cm: f64,
        height_cm: f64,
    },
}

impl ContainerGeometry {
    /// 圆柱容器
    pub fn cylindrical(diameter_cm: f64, height_cm: f64) -> Result<Self, GeometryError> {
        let geometry = ContainerGeometry::Cylindrical {
            diameter_cm,
            height_cm,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// 长方体容器
    pub fn rectangular(
        length_cm: f64,
        width_cm: f64,
        height_cm: f64,
    ) -> Result<Self, GeometryError> {
        let geometry = ContainerGeometry::Rectangular {
            length_cm,
            width_cm,
            height_cm,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// 检查所有尺寸 > 0
    pub fn validate(&self) -> Result<(), GeometryError> {
        let dimensions: Vec<(&'static str, f64)> = match *self {
            ContainerGeometry::Cylindrical {
                diameter_cm,
                height_cm,
            } => vec![("diameter", diameter_cm), ("height", height_cm)],
            ContainerGeometry::Rectangular {
                length_cm,
                width_cm,
                height_cm,
            } => vec![
                ("length", length_cm),
                ("width", width_cm),
                ("height", height_cm),
            ],
        };

        for (name, value) in dimensions {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::NonPositiveDimension { name, value });
            }
        }
        Ok(())
    }

    pub fn height_cm(&self) -> f64 {
        match *self {
            ContainerGeometry::Cylindrical { height_cm, .. } => height_cm,
            ContainerGeometry::Rectangular { height_cm, .. } => height_cm,
        }
    }

    /// 底面积（cm²）
    pub fn base_area_cm2(&self) -> f64 {
        match *self {
            ContainerGeometry::Cylindrical { diameter_cm, .. } => {
                let radius = diameter_cm / 2.0;
                PI * radius * radius
            },
            ContainerGeometry::Rectangular {
                length_cm,
                width_cm,
                ..
            } => length_cm * width_cm,
        }
    }

    /// 满容量（L），即液位等于容器高度时的体积
    pub fn max_volume_liters(&self) -> f64 {
        volume_liters(self.height_cm(), self)
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            ContainerGeometry::Cylindrical { .. } => "cylindrical",
            ContainerGeometry::Rectangular { .. } => "rectangular",
        }
    }
}

/// 液位换算体积（L），纯函数，不钳位
pub fn volume_liters(level_cm: f64, geometry: &ContainerGeometry) -> f64 {
    geometry.base_area_cm2() * level_cm / CM3_PER_LITER
}

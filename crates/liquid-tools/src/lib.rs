//! # Liquid Tools - 共享数据结构和算法
//!
//! **依赖原则**: 不依赖硬件层，全部为纯数据结构与纯函数
//!
//! ## 包含模块
//!
//! - `geometry` - 容器几何与体积换算
//! - `status` - 状态快照、增量覆盖与载荷渲染

pub mod geometry;
pub mod status;

// 重新导出常用类型
pub use geometry::{CM3_PER_LITER, ContainerGeometry, GeometryError, volume_liters};
pub use status::{PartialStatus, PayloadLayout, SENTINEL, StatusSnapshot, format_one_decimal};

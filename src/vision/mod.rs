/// 視野系統模組
///
/// 包含幾何工具、障礙物索引、視錐取樣等非 ECS 部分
pub mod geometry_utils;
pub mod quadtree;
pub mod obstacle;
pub mod field_of_view;


pub use self::{
    geometry_utils::GeometryUtils,
    quadtree::{Bounds, QuadTree},
    obstacle::*,
    field_of_view::*,
};

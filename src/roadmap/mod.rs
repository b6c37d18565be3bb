//! 路线图模块：模板资格筛选、确定性排序、占位符渲染与轨迹组装
pub mod model;
pub mod renderer;
pub mod selector;

// 导出核心接口
pub use self::model::{
    Eligibility, Horizon, Lane, Placeholder, PlaceholderSource, RenderSpec, RenderedRoadmap,
    RoadmapLibrary, RoadmapTemplate, TrajectoryPoint,
};
pub use self::renderer::{humanize, placeholder_keys, IdentityLabels, LabelResolver, RoadmapRenderer};
pub use self::selector::RoadmapSelector;

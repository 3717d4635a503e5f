//! 翻译管道模块
//!
//! 单个文档的处理步骤：解析与选择（collector）、文本过滤（filters）、译文注入（mutator）

pub mod collector;
pub mod filters;
pub mod mutator;

// 重新导出主要类型
pub use collector::{
    select_units, CollectionStats, DocumentTree, TextCollector, TranslatableUnit, UnitStatus,
};
pub use filters::{is_primary_tag, TextFilter};
pub use mutator::inject_translation;

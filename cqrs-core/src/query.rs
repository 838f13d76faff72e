use crate::request::Request;

/// 应用层查询（Query）
///
/// 表达只读意图，不改变状态；事务等写侧行为会跳过查询。
pub trait Query: Request {}

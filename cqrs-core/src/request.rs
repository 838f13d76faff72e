use std::fmt;

/// 可分发请求（Request）
///
/// 命令与查询的共同契约：在类型层面声明“该请求被分发后产出 `Output`”。
/// - 请求是不可变的值对象，按值移交给分发器，之后不再被修改；
/// - `NAME` 为稳定名称，用于日志、追踪与错误信息，避免依赖 `type_name::<T>()`。
pub trait Request: Send + Sync + 'static {
    /// 请求的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 分发成功后返回的结果类型
    type Output: Send + 'static;
}

/// 请求类别：在注册时确定，供行为（如事务）区分读写
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Command,
    Query,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! 类型与包路径标识
//!
//! 组件元数据中的类型身份，由外部扫描器填充，引擎内部不做任何反射

use serde::{Deserialize, Serialize};
use std::fmt;

/// 类型标识
///
/// 以完整模块路径表示一个已声明类型的身份，例如 `billing::api::PaymentGateway`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    path: String,
}

impl TypeKey {
    /// 创建新的类型标识
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// 获取完整路径
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        self.path.rsplit("::").next().unwrap_or(&self.path)
    }

    /// 获取类型所在的包路径
    ///
    /// 无模块前缀的类型归属于根包（空路径）
    pub fn package(&self) -> PackagePath {
        match self.path.rfind("::") {
            Some(idx) => PackagePath::new(&self.path[..idx]),
            None => PackagePath::root(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for TypeKey {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// 包路径
///
/// 包排除标记作用于包路径本身及其所有子包
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackagePath {
    path: String,
}

impl PackagePath {
    /// 创建新的包路径
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// 根包
    pub fn root() -> Self {
        Self {
            path: String::new(),
        }
    }

    /// 获取包路径字符串
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 检查指定类型是否位于本包或其子包中
    pub fn contains_type(&self, type_key: &TypeKey) -> bool {
        self.contains_package(&type_key.package())
    }

    /// 检查指定包是否为本包或其子包
    pub fn contains_package(&self, other: &Self) -> bool {
        other.path == self.path
            || other
                .path
                .strip_prefix(&self.path)
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

impl fmt::Display for PackagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for PackagePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

//! 限定符定义
//!
//! 限定符按名称与属性值精确匹配，不做任何子类型推断

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 限定符
///
/// 由名称和一组有序属性构成的判别标记，用于在同一类型的多个候选组件之间收窄选择
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Qualifier {
    /// 限定符名称
    name: String,
    /// 限定符属性
    attributes: BTreeMap<String, String>,
}

impl Qualifier {
    /// 创建新的限定符
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// 添加属性
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 获取限定符名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 获取限定符属性
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attributes.is_empty() {
            return f.write_str(&self.name);
        }
        let attrs = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.name, attrs)
    }
}

/// 检查候选限定符集合是否满足全部要求的限定符
///
/// 要求集合中的每个限定符都必须在候选集合中以完全相等的形式出现；
/// 空的要求集合匹配任意候选
pub fn matches_all(candidate: &[Qualifier], required: &[Qualifier]) -> bool {
    required.iter().all(|q| candidate.contains(q))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matching_includes_attributes() {
        let tagged = Qualifier::new("region").with_attribute("zone", "cn-north");
        let plain = Qualifier::new("region");

        assert!(matches_all(std::slice::from_ref(&tagged), &[tagged.clone()]));
        assert!(!matches_all(&[plain], &[tagged]));
    }

    #[test]
    fn test_empty_required_set_matches_everything() {
        assert!(matches_all(&[Qualifier::new("primary")], &[]));
        assert!(matches_all(&[], &[]));
    }

    #[test]
    fn test_required_subset_of_candidate() {
        let a = Qualifier::new("primary");
        let b = Qualifier::new("audited");
        assert!(matches_all(&[a.clone(), b.clone()], &[a.clone()]));
        assert!(!matches_all(&[a.clone()], &[a, b]));
    }
}

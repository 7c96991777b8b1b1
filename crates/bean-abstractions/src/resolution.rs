//! 类型安全解析抽象接口

use container_common::{ComponentDescriptor, Qualifier, ResolutionError, ResolveResult, TypeKey};
use std::sync::Arc;

/// 解析结果
///
/// 每次解析要么无候选、要么唯一、要么在收窄后仍有歧义；
/// 永远不会静默返回任意选择
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// 没有匹配的候选
    Unsatisfied,
    /// 唯一匹配的候选
    Unique(Arc<ComponentDescriptor>),
    /// 收窄后仍剩余的全部候选，用于诊断
    Ambiguous(Vec<Arc<ComponentDescriptor>>),
}

impl ResolutionOutcome {
    /// 是否解析为唯一候选
    pub fn is_unique(&self) -> bool {
        matches!(self, Self::Unique(_))
    }

    /// 获取唯一候选
    pub fn unique(&self) -> Option<&Arc<ComponentDescriptor>> {
        match self {
            Self::Unique(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// 转换为解析结果，非唯一结果映射为对应的解析错误
    pub fn into_result(
        self,
        required: &TypeKey,
        qualifiers: &[Qualifier],
    ) -> ResolveResult<Arc<ComponentDescriptor>> {
        match self {
            Self::Unique(descriptor) => Ok(descriptor),
            Self::Unsatisfied => Err(ResolutionError::Unsatisfied {
                required_type: required.path().to_string(),
                qualifiers: qualifiers.iter().map(ToString::to_string).collect(),
            }),
            Self::Ambiguous(candidates) => Err(ResolutionError::Ambiguous {
                required_type: required.path().to_string(),
                candidates: candidates
                    .iter()
                    .map(|d| d.id.path().to_string())
                    .collect(),
            }),
        }
    }
}

/// 组件解析器 trait
///
/// 给定相同的注册表内容与相同的请求，解析结果必须完全一致
pub trait BeanResolver: Send + Sync {
    /// 解析要求的类型与限定符
    fn resolve(&self, required: &TypeKey, qualifiers: &[Qualifier]) -> ResolutionOutcome;

    /// 解析全部匹配候选，不做备选与优先级收窄
    fn resolve_all(
        &self,
        required: &TypeKey,
        qualifiers: &[Qualifier],
    ) -> Vec<Arc<ComponentDescriptor>>;
}

//! 类型安全解析器
//!
//! 对注册表候选执行可赋值性与限定符过滤，并按备选优先、
//! 其次声明优先级的策略收窄歧义

use crate::registry::BeanRegistry;
use bean_abstractions::{BeanResolver, ResolutionOutcome};
use container_common::{ComponentDescriptor, Qualifier, TypeKey};
use std::sync::Arc;
use tracing::trace;

/// 类型安全解析器
#[derive(Debug)]
pub struct TypesafeResolver {
    registry: Arc<BeanRegistry>,
}

impl TypesafeResolver {
    /// 创建新的解析器
    pub fn new(registry: Arc<BeanRegistry>) -> Self {
        Self { registry }
    }

    /// 过滤出可赋值且满足全部限定符的候选
    fn filter_candidates(
        &self,
        required: &TypeKey,
        qualifiers: &[Qualifier],
    ) -> Vec<Arc<ComponentDescriptor>> {
        self.registry
            .lookup(required)
            .iter()
            .filter(|d| d.satisfies_qualifiers(qualifiers))
            .cloned()
            .collect()
    }
}

impl BeanResolver for TypesafeResolver {
    fn resolve(&self, required: &TypeKey, qualifiers: &[Qualifier]) -> ResolutionOutcome {
        let mut candidates = self.filter_candidates(required, qualifiers);
        trace!("解析 {}: {} 个候选", required, candidates.len());

        if candidates.is_empty() {
            return ResolutionOutcome::Unsatisfied;
        }
        if candidates.len() == 1 {
            return ResolutionOutcome::Unique(candidates.remove(0));
        }

        // 备选收窄：存在启用的备选组件时，只保留它们
        let alternatives: Vec<_> = candidates
            .iter()
            .filter(|d| d.is_enabled_alternative())
            .cloned()
            .collect();
        if !alternatives.is_empty() {
            candidates = alternatives;
            if candidates.len() == 1 {
                return ResolutionOutcome::Unique(candidates.remove(0));
            }
        }

        // 优先级收窄：未声明优先级视为最低
        let highest = candidates
            .iter()
            .map(|d| d.priority.unwrap_or(i32::MIN))
            .max()
            .unwrap_or(i32::MIN);
        candidates.retain(|d| d.priority.unwrap_or(i32::MIN) == highest);

        if candidates.len() == 1 {
            ResolutionOutcome::Unique(candidates.remove(0))
        } else {
            ResolutionOutcome::Ambiguous(candidates)
        }
    }

    fn resolve_all(
        &self,
        required: &TypeKey,
        qualifiers: &[Qualifier],
    ) -> Vec<Arc<ComponentDescriptor>> {
        self.filter_candidates(required, qualifiers)
    }
}

//! 组件注册表
//!
//! 启动阶段单遍构建的类型到候选组件索引；构建完成后只读，
//! 支持无锁并发读取

use container_common::{ComponentDescriptor, DefinitionError, TypeKey};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 组件注册表
///
/// 每个组件类型映射到按注册顺序排列的候选描述符，顺序稳定以保证
/// 诊断输出可复现
#[derive(Debug, Default)]
pub struct BeanRegistry {
    by_type: HashMap<TypeKey, Vec<Arc<ComponentDescriptor>>>,
    by_id: HashMap<TypeKey, Arc<ComponentDescriptor>>,
    ordered_ids: Vec<TypeKey>,
}

impl BeanRegistry {
    /// 从候选描述符集合构建注册表
    ///
    /// 身份重复是致命的定义错误；重复项保留首个出现的描述符，
    /// 全部错误被收集返回，供启动流程与其余问题聚合后统一报告
    pub fn build(descriptors: Vec<ComponentDescriptor>) -> (Self, Vec<DefinitionError>) {
        let mut registry = Self::default();
        let mut errors = Vec::new();

        for descriptor in descriptors {
            if registry.by_id.contains_key(&descriptor.id) {
                errors.push(DefinitionError::DuplicateComponent {
                    type_key: descriptor.id.path().to_string(),
                });
                continue;
            }

            let descriptor = Arc::new(descriptor);
            debug!("注册组件: {} ({})", descriptor.id, descriptor.scope);

            for bean_type in &descriptor.bean_types {
                registry
                    .by_type
                    .entry(bean_type.clone())
                    .or_default()
                    .push(descriptor.clone());
            }
            registry.ordered_ids.push(descriptor.id.clone());
            registry.by_id.insert(descriptor.id.clone(), descriptor);
        }

        (registry, errors)
    }

    /// 按组件类型查询候选，保持注册顺序
    pub fn lookup(&self, required: &TypeKey) -> &[Arc<ComponentDescriptor>] {
        self.by_type.get(required).map_or(&[], Vec::as_slice)
    }

    /// 按身份查询描述符
    pub fn descriptor(&self, id: &TypeKey) -> Option<&Arc<ComponentDescriptor>> {
        self.by_id.get(id)
    }

    /// 按注册顺序遍历全部描述符
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentDescriptor>> {
        self.ordered_ids.iter().filter_map(|id| self.by_id.get(id))
    }

    /// 注册的组件数量
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

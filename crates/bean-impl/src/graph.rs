//! 依赖图与循环检测
//!
//! 启动期根据注入点解析结果构建组件依赖图；完全由普通作用域组件
//! 构成的循环可以通过代理打破，包含依赖作用域组件的循环在启动时
//! 判定为非法

use crate::registry::BeanRegistry;
use bean_abstractions::{BeanResolver, ResolutionOutcome};
use container_common::{Cardinality, ComponentDescriptor, DefinitionError, ScopeKind, TypeKey};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 组件依赖图
///
/// 节点按注册顺序排列，保证循环诊断输出稳定
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<TypeKey>,
    adjacency: HashMap<TypeKey, Vec<TypeKey>>,
    scopes: HashMap<TypeKey, ScopeKind>,
}

impl DependencyGraph {
    /// 根据注册表与解析器构建依赖图
    ///
    /// 每个注入点按基数校验解析结果；无法满足或存在歧义的强制注入点
    /// 记为定义错误，全部收集后返回
    pub fn build(
        registry: &BeanRegistry,
        resolver: &dyn BeanResolver,
    ) -> (Self, Vec<DefinitionError>) {
        let mut graph = Self::default();
        let mut errors = Vec::new();

        for descriptor in registry.iter() {
            graph.nodes.push(descriptor.id.clone());
            graph.scopes.insert(descriptor.id.clone(), descriptor.scope);
            let edges = graph.adjacency.entry(descriptor.id.clone()).or_default();

            for point in &descriptor.injection_points {
                match point.cardinality {
                    Cardinality::Single | Cardinality::Optional => {
                        match resolver.resolve(&point.required_type, &point.qualifiers) {
                            ResolutionOutcome::Unique(target) => edges.push(target.id.clone()),
                            ResolutionOutcome::Unsatisfied => {
                                if point.cardinality == Cardinality::Single {
                                    errors.push(DefinitionError::UnsatisfiedInjection {
                                        owner: descriptor.id.path().to_string(),
                                        injection_point: point.to_string(),
                                    });
                                }
                            }
                            ResolutionOutcome::Ambiguous(candidates) => {
                                errors.push(DefinitionError::AmbiguousInjection {
                                    owner: descriptor.id.path().to_string(),
                                    injection_point: point.to_string(),
                                    candidates: candidates
                                        .iter()
                                        .map(|d| d.id.path().to_string())
                                        .collect(),
                                });
                            }
                        }
                    }
                    Cardinality::Collection => {
                        for target in resolver.resolve_all(&point.required_type, &point.qualifiers)
                        {
                            edges.push(target.id.clone());
                        }
                    }
                }
            }
        }

        (graph, errors)
    }

    /// 检测全部循环
    ///
    /// 深度优先遍历，按节点注册顺序出发，返回按路径顺序列出成员的循环
    pub fn detect_cycles(&self) -> Vec<Vec<TypeKey>> {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for node in &self.nodes {
            if !visited.contains(node) {
                self.dfs_detect(node, &mut visited, &mut stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn dfs_detect(
        &self,
        node: &TypeKey,
        visited: &mut HashSet<TypeKey>,
        stack: &mut HashSet<TypeKey>,
        path: &mut Vec<TypeKey>,
        cycles: &mut Vec<Vec<TypeKey>>,
    ) {
        visited.insert(node.clone());
        stack.insert(node.clone());
        path.push(node.clone());

        if let Some(edges) = self.adjacency.get(node) {
            for dep in edges {
                if stack.contains(dep) {
                    if let Some(start) = path.iter().position(|n| n == dep) {
                        cycles.push(path[start..].to_vec());
                    }
                } else if !visited.contains(dep) {
                    self.dfs_detect(dep, visited, stack, path, cycles);
                }
            }
        }

        path.pop();
        stack.remove(node);
    }

    /// 校验循环合法性
    ///
    /// 完全由可代理的普通作用域组件构成的循环放行；
    /// 包含依赖作用域组件的循环无法通过代理打破，记为定义错误
    pub fn validate_cycles(&self) -> Vec<DefinitionError> {
        let mut errors = Vec::new();

        for cycle in self.detect_cycles() {
            let proxyable = cycle
                .iter()
                .all(|id| self.scopes.get(id).copied().is_some_and(ScopeKind::is_normal));

            if proxyable {
                debug!(
                    "放行可代理循环: {}",
                    cycle
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" -> ")
                );
                continue;
            }

            let members: Vec<String> = cycle.iter().map(|k| k.path().to_string()).collect();
            let mut rendered = members.join(" -> ");
            rendered.push_str(" -> ");
            rendered.push_str(&members[0]);
            errors.push(DefinitionError::IllegalCycle {
                cycle: rendered,
                members,
            });
        }

        errors
    }

    /// 获取组件的直接依赖
    pub fn dependencies_of(&self, id: &TypeKey) -> &[TypeKey] {
        self.adjacency.get(id).map_or(&[], Vec::as_slice)
    }
}

/// 校验每个注册组件都有生产者
pub fn validate_producers(
    registry: &BeanRegistry,
    has_producer: impl Fn(&TypeKey) -> bool,
) -> Vec<DefinitionError> {
    registry
        .iter()
        .filter(|d| !has_producer(&d.id))
        .map(|d| DefinitionError::MissingProducer {
            type_key: d.id.path().to_string(),
        })
        .collect()
}

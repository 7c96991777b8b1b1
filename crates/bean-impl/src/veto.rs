//! 排除过滤器
//!
//! 在注册之前从候选集中移除被排除的类型；被排除的类型不会触发
//! 任何发现或注册事件，也不会出现在后续的解析诊断中

use container_common::{ComponentDescriptor, PackagePath, VetoOverride};
use tracing::debug;

/// 计算单个描述符的有效排除状态
///
/// 显式的类型级标记总是优先；没有类型级标记时，任一包级标记
/// 覆盖到声明类型所在的包（含子包）即视为排除
pub fn effective_veto(descriptor: &ComponentDescriptor, markers: &[PackagePath]) -> bool {
    match descriptor.veto {
        Some(VetoOverride::Vetoed) => true,
        Some(VetoOverride::NotVetoed) => false,
        None => markers.iter().any(|m| m.contains_package(&descriptor.package)),
    }
}

/// 过滤候选描述符集合
///
/// 返回保留的描述符；被排除的描述符按输入顺序记录在第二个返回值中
pub fn filter_vetoed(
    descriptors: Vec<ComponentDescriptor>,
    markers: &[PackagePath],
) -> (Vec<ComponentDescriptor>, Vec<ComponentDescriptor>) {
    let mut kept = Vec::with_capacity(descriptors.len());
    let mut vetoed = Vec::new();

    for descriptor in descriptors {
        if effective_veto(&descriptor, markers) {
            debug!("排除组件: {}", descriptor.id);
            vetoed.push(descriptor);
        } else {
            kept.push(descriptor);
        }
    }

    (kept, vetoed)
}

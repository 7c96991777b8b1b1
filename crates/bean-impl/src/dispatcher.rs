//! 生命周期事件分发器
//!
//! 每次启动按固定顺序触发一轮阶段事件；任一阶段结束时存在
//! 已收集的问题即中止剩余阶段，聚合后一次性报告

use bean_abstractions::{
    AfterDiscoveryContext, AfterValidationContext, BeforeDiscoveryContext, BootPhase,
    ContainerExtension, ProcessTypeContext, ValidationContext,
};
use container_common::{
    ComponentDescriptor, DefinitionError, DeploymentError, DeploymentProblem, DeploymentResult,
};
use tracing::{debug, info};

/// 生命周期事件分发器
///
/// 启动流程单线程驱动，阶段顺序严格固定：
/// `BeforeDiscovery -> ProcessType -> AfterDiscovery -> Validate -> AfterValidation`
pub struct LifecycleEventDispatcher {
    extensions: Vec<Box<dyn ContainerExtension>>,
    problems: Vec<DeploymentProblem>,
}

impl LifecycleEventDispatcher {
    /// 创建新的分发器
    pub fn new(extensions: Vec<Box<dyn ContainerExtension>>) -> Self {
        Self {
            extensions,
            problems: Vec::new(),
        }
    }

    /// 注入引擎校验产生的定义错误
    pub fn report_definition_errors(&mut self, errors: impl IntoIterator<Item = DefinitionError>) {
        self.problems
            .extend(errors.into_iter().map(DeploymentProblem::Definition));
    }

    /// 依次调用全部扩展，并把各自报告的问题归属到扩展名下
    fn dispatch<F>(&mut self, mut invoke: F)
    where
        F: FnMut(&mut dyn ContainerExtension) -> Vec<String>,
    {
        let Self {
            extensions,
            problems,
        } = self;
        for extension in extensions.iter_mut() {
            let messages = invoke(extension.as_mut());
            let observer = extension.name().to_string();
            for message in messages {
                problems.push(DeploymentProblem::Extension {
                    observer: observer.clone(),
                    message,
                });
            }
        }
    }

    /// 阶段收尾：存在问题则中止启动并聚合报告
    fn ensure_clean(&mut self, phase: BootPhase) -> DeploymentResult<()> {
        if self.problems.is_empty() {
            debug!("阶段完成: {phase}");
            Ok(())
        } else {
            Err(DeploymentError::new(std::mem::take(&mut self.problems)))
        }
    }

    /// 触发发现开始前事件
    pub fn before_discovery(&mut self) -> DeploymentResult<()> {
        let mut ctx = BeforeDiscoveryContext::new();
        self.dispatch(|extension| {
            extension.before_discovery(&mut ctx);
            ctx.take_problems()
        });
        self.ensure_clean(BootPhase::BeforeDiscovery)
    }

    /// 逐个描述符触发处理事件
    ///
    /// 扩展可在处理中修改描述符或将其排除；被排除的描述符不再向后传递
    pub fn process_types(
        &mut self,
        descriptors: Vec<ComponentDescriptor>,
    ) -> DeploymentResult<Vec<ComponentDescriptor>> {
        let mut surviving = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let mut ctx = ProcessTypeContext::new(descriptor);
            self.dispatch(|extension| {
                extension.process_type(&mut ctx);
                ctx.take_problems()
            });

            let (descriptor, vetoed) = ctx.into_parts();
            if vetoed {
                debug!("扩展排除组件: {}", descriptor.id);
            } else {
                surviving.push(descriptor);
            }
        }

        self.ensure_clean(BootPhase::ProcessType)?;
        Ok(surviving)
    }

    /// 触发发现结束事件，返回扩展新增的描述符
    pub fn after_discovery(&mut self) -> DeploymentResult<Vec<ComponentDescriptor>> {
        let mut ctx = AfterDiscoveryContext::new();
        self.dispatch(|extension| {
            extension.after_discovery(&mut ctx);
            ctx.take_problems()
        });

        let additions = ctx.into_additions();
        if !additions.is_empty() {
            info!("扩展新增 {} 个组件描述符", additions.len());
        }
        self.ensure_clean(BootPhase::AfterDiscovery)?;
        Ok(additions)
    }

    /// 触发校验事件
    ///
    /// 引擎自身的校验错误已通过 [`Self::report_definition_errors`] 注入，
    /// 与扩展报告的问题聚合后统一判定
    pub fn validate(&mut self) -> DeploymentResult<()> {
        let mut ctx = ValidationContext::new();
        self.dispatch(|extension| {
            extension.validate(&mut ctx);
            ctx.take_problems()
        });
        self.ensure_clean(BootPhase::Validate)
    }

    /// 触发校验结束事件
    pub fn after_validation(&mut self, component_count: usize) {
        let ctx = AfterValidationContext { component_count };
        for extension in &mut self.extensions {
            extension.after_validation(&ctx);
        }
        debug!("阶段完成: {}", BootPhase::AfterValidation);
    }
}

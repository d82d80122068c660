//! # HemoScope工作流模块
//!
//! 单次分析请求的编排：
//! - 状态机：约束分类、建议、报告三个阶段的先后顺序
//! - 路由：仅在检出白血病时咨询临床顾问
//! - 执行轨迹：记录每个节点完成、跳过或降级的情况
//! - 引擎：串联图像分析器、临床顾问和报告生成器

pub mod engine;
pub mod routing;
pub mod state_machine;
pub mod trace;

// 重新导出主要类型
pub use engine::{AnalysisRequest, WorkflowEngine, WorkflowOutcome};
pub use routing::{route, should_consult_advisor, RoutingResult, RoutingTarget};
pub use state_machine::{RunEvent, RunStage, RunStateMachine};
pub use trace::{StepStatus, TraceStep, WorkflowTrace};

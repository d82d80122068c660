//! 执行轨迹

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 节点执行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Fallback, // 远程模型不可用，使用固定内容
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStep {
    pub node: String,
    pub status: StepStatus,
    pub detail: String,
    pub elapsed_ms: u64,
}

/// 一次运行中各节点的记录，按执行顺序排列
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowTrace {
    pub steps: Vec<TraceStep>,
}

impl WorkflowTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        node: &str,
        status: StepStatus,
        detail: impl Into<String>,
        elapsed: Duration,
    ) {
        self.steps.push(TraceStep {
            node: node.to_string(),
            status,
            detail: detail.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    pub fn step(&self, node: &str) -> Option<&TraceStep> {
        self.steps.iter().find(|s| s.node == node)
    }

    pub fn status_of(&self, node: &str) -> Option<StepStatus> {
        self.step(node).map(|s| s.status)
    }

    pub fn total_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.elapsed_ms).sum()
    }

    /// 每个节点一行，用于日志和命令行输出
    pub fn summary(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{} [{:?}] {} ({} ms)", s.node, s.status, s.detail, s.elapsed_ms))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

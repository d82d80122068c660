//! 分析运行状态机
//!
//! 分类 → (临床建议) → 报告，报告完成后不再接受事件

use hemoscope_core::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 运行阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunStage {
    Received,   // 已接收图像
    Classified, // 已分类
    Advised,    // 已生成临床建议
    Reported,   // 已生成报告
}

/// 阶段转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunEvent {
    ImageClassified,
    AdvisoryIssued,
    ReportRendered,
}

/// 运行状态机
#[derive(Debug)]
pub struct RunStateMachine {
    transitions: HashMap<(RunStage, RunEvent), RunStage>,
}

impl RunStateMachine {
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert((RunStage::Received, RunEvent::ImageClassified), RunStage::Classified);
        transitions.insert((RunStage::Classified, RunEvent::AdvisoryIssued), RunStage::Advised);
        transitions.insert((RunStage::Classified, RunEvent::ReportRendered), RunStage::Reported);
        transitions.insert((RunStage::Advised, RunEvent::ReportRendered), RunStage::Reported);

        Self { transitions }
    }

    pub fn can_transition(&self, from: RunStage, event: RunEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: RunStage, event: RunEvent) -> Result<RunStage> {
        self.transitions.get(&(from, event)).copied().ok_or_else(|| {
            ScopeError::Internal(format!(
                "invalid workflow transition: {:?} --{:?}-->",
                from, event
            ))
        })
    }

    pub fn possible_events(&self, current: RunStage) -> Vec<RunEvent> {
        self.transitions
            .keys()
            .filter(|(stage, _)| *stage == current)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

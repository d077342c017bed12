//! 模型提供者
//!
//! 统计评分器的惰性一次性初始化：首次评分时加载或训练，并发的首次调用共享同一次训练结果。
//! 初始化在独立任务中运行，调用方超时或被取消不会中断训练，也不会触发第二次训练。
//! 训练失败时永久回退到规则评分器。

use crate::normalizer::{FeatureBounds, FeatureVector};
use crate::scorer::{RiskScorer, RuleScorer};
use crate::settings::ModelConfig;
use crate::statistical::StatisticalScorer;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, OnceCell};
use tracing::{error, info, warn};
use vitaltwin_core::Result;

/// 当前生效的评分器
#[derive(Debug, Clone)]
pub enum ActiveScorer {
    Statistical(Arc<StatisticalScorer>),
    /// 训练失败后的回退
    RuleFallback(RuleScorer),
}

impl ActiveScorer {
    pub fn as_scorer(&self) -> &dyn RiskScorer {
        match self {
            ActiveScorer::Statistical(scorer) => scorer.as_ref(),
            ActiveScorer::RuleFallback(scorer) => scorer,
        }
    }

    pub fn score(&self, features: &FeatureVector) -> f64 {
        self.as_scorer().score(features)
    }

    pub fn name(&self) -> &'static str {
        self.as_scorer().name()
    }
}

/// 模型状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerStatus {
    /// 尚未初始化
    Cold,
    Statistical,
    RuleFallback,
}

impl ScorerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerStatus::Cold => "cold",
            ScorerStatus::Statistical => "statistical",
            ScorerStatus::RuleFallback => "rule",
        }
    }
}

/// 统计模型提供者
#[derive(Debug)]
pub struct ModelProvider {
    inner: Arc<ProviderState>,
}

#[derive(Debug)]
struct ProviderState {
    bounds: FeatureBounds,
    config: ModelConfig,
    cell: OnceCell<ActiveScorer>,
    started: AtomicBool,
    ready: Notify,
    training_runs: AtomicUsize,
}

impl ModelProvider {
    pub fn new(bounds: FeatureBounds, config: ModelConfig) -> Self {
        Self {
            inner: Arc::new(ProviderState {
                bounds,
                config,
                cell: OnceCell::new(),
                started: AtomicBool::new(false),
                ready: Notify::new(),
                training_runs: AtomicUsize::new(0),
            }),
        }
    }

    /// 获取评分器，首次调用时启动初始化；并发调用方等待同一次初始化
    pub async fn scorer(&self) -> &ActiveScorer {
        loop {
            let notified = self.inner.ready.notified();
            if let Some(scorer) = self.inner.cell.get() {
                return scorer;
            }
            if !self.inner.started.swap(true, Ordering::SeqCst) {
                self.start();
            }
            notified.await;
        }
    }

    fn start(&self) {
        let state = self.inner.clone();
        tokio::spawn(async move {
            let worker = state.clone();
            let active = match tokio::task::spawn_blocking(move || worker.load_or_train()).await {
                Ok(Ok(scorer)) => ActiveScorer::Statistical(Arc::new(scorer)),
                Ok(Err(e)) => {
                    error!("Statistical scorer unavailable, falling back to rule scorer: {}", e);
                    ActiveScorer::RuleFallback(RuleScorer::new())
                }
                Err(e) => {
                    error!("Model initialization task failed, falling back to rule scorer: {}", e);
                    ActiveScorer::RuleFallback(RuleScorer::new())
                }
            };

            if state.cell.set(active).is_err() {
                warn!("Statistical scorer was already initialized");
            }
            state.ready.notify_waiters();
        });
    }

    pub fn status(&self) -> ScorerStatus {
        match self.inner.cell.get() {
            None => ScorerStatus::Cold,
            Some(ActiveScorer::Statistical(_)) => ScorerStatus::Statistical,
            Some(ActiveScorer::RuleFallback(_)) => ScorerStatus::RuleFallback,
        }
    }

    /// 已执行的训练次数
    pub fn training_runs(&self) -> usize {
        self.inner.training_runs.load(Ordering::SeqCst)
    }
}

impl ProviderState {
    /// 阻塞执行：读取模型文件，失败时重新训练并落盘
    fn load_or_train(&self) -> Result<StatisticalScorer> {
        if let Some(path) = &self.config.artifact_path {
            if path.exists() {
                match StatisticalScorer::load(path, &self.bounds, &self.config) {
                    Ok(scorer) => {
                        info!("Loaded statistical scorer from {}", path.display());
                        return Ok(scorer);
                    }
                    Err(e) => {
                        warn!("Ignoring model artifact {}: {}; retraining", path.display(), e);
                    }
                }
            }
        }

        self.training_runs.fetch_add(1, Ordering::SeqCst);
        let scorer = StatisticalScorer::train(&self.bounds, &self.config)?;

        if let Some(path) = &self.config.artifact_path {
            if let Err(e) = scorer.save(path) {
                warn!("Failed to persist statistical scorer to {}: {}", path.display(), e);
            }
        }

        Ok(scorer)
    }
}

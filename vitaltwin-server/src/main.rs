//! VitalTwin风险评估服务主程序

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use vitaltwin_admin::{init_tracing, scoped_tracing, ConfigManager, LoggingConfig, VitalTwinConfig};
use vitaltwin_core::{PredictionId, ReadingPayload};
use vitaltwin_pipeline::{DashboardService, IngestService};
use vitaltwin_scoring::{ActiveScorer, RiskEngine};
use vitaltwin_store::InMemoryStore;

/// VitalTwin命令行参数
#[derive(Parser, Debug)]
#[command(name = "vitaltwin-server")]
#[command(about = "VitalTwin 生命体征风险评估服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 训练（或加载）统计模型并输出训练摘要
    Train,
    /// 从 JSON Lines 文件读取读数并评分
    Score {
        /// 每行一个读数 JSON
        #[arg(short, long)]
        readings: PathBuf,
    },
    /// 标注预测的实际结局
    Annotate {
        /// 预测ID
        #[arg(long)]
        id: String,
        /// 实际是否发生不良事件
        #[arg(long, action = clap::ArgAction::Set)]
        outcome: bool,
    },
    /// 输出看板概览与准确率报告
    Report,
    /// 查询患者的预测历史
    History {
        /// 患者ID
        #[arg(short, long)]
        patient: String,
        /// 最多返回条数
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

struct App {
    config: VitalTwinConfig,
    store: Arc<InMemoryStore>,
    ingest: IngestService,
    dashboard: DashboardService,
}

impl App {
    async fn build(config: VitalTwinConfig) -> Result<Self> {
        let store = match &config.store.snapshot_path {
            Some(path) => Arc::new(
                InMemoryStore::load_snapshot(path)
                    .await
                    .with_context(|| format!("加载存储快照失败: {}", path.display()))?,
            ),
            None => Arc::new(InMemoryStore::new()),
        };

        let engine = Arc::new(RiskEngine::new(config.scoring.clone(), config.model.clone()));
        let ingest = IngestService::new(
            engine.clone(),
            store.clone(),
            store.clone(),
            config.store.pipeline.clone(),
        );
        let dashboard = DashboardService::new(engine, store.clone(), store.clone());

        Ok(Self {
            config,
            store,
            ingest,
            dashboard,
        })
    }

    async fn persist(&self) -> Result<()> {
        if let Some(path) = &self.config.store.snapshot_path {
            self.store
                .save_snapshot(path)
                .await
                .with_context(|| format!("保存存储快照失败: {}", path.display()))?;
            info!("存储快照已保存: {}", path.display());
        }
        Ok(())
    }

    async fn train(&self) -> Result<()> {
        match self.ingest.engine().warm_up().await {
            Some(ActiveScorer::Statistical(scorer)) => {
                println!("{}", serde_json::to_string_pretty(scorer.summary())?);
            }
            Some(ActiveScorer::RuleFallback(_)) => {
                warn!("统计模型不可用，使用规则评分");
            }
            None => info!("当前配置使用规则评分，无需训练"),
        }
        Ok(())
    }

    async fn score(&self, readings: &Path) -> Result<()> {
        // 先完成模型初始化，避免首批读数因训练耗时超时被丢弃
        self.ingest.engine().warm_up().await;

        let file = tokio::fs::File::open(readings)
            .await
            .with_context(|| format!("无法打开读数文件: {}", readings.display()))?;
        let mut lines = BufReader::new(file).lines();

        let mut receipts = Vec::new();
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let payload: ReadingPayload = match serde_json::from_str(&line) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("第 {} 行解析失败: {}", line_no, e);
                    continue;
                }
            };

            match self.ingest.ingest_payload(payload).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => error!("第 {} 行读数被拒绝: {}", line_no, e),
            }
        }

        let accepted = receipts.len();
        let mut scored = 0usize;
        for receipt in receipts {
            if let Some(prediction) = receipt.wait().await {
                scored += 1;
                println!("{}", serde_json::to_string(&prediction)?);
            }
        }

        info!("读数处理完成: 接收 {} 条, 评分 {} 条", accepted, scored);
        self.persist().await
    }

    async fn annotate(&self, id: &str, outcome: bool) -> Result<()> {
        let id = PredictionId::parse(id)?;
        self.ingest.annotate_outcome(id, outcome).await?;
        info!("预测 {} 已标注结局: {}", id, outcome);
        self.persist().await
    }

    async fn report(&self) -> Result<()> {
        let overview = self.dashboard.overview().await?;
        println!("{}", serde_json::to_string_pretty(&overview)?);
        Ok(())
    }

    async fn history(&self, patient: &str, limit: usize) -> Result<()> {
        for prediction in self.ingest.history(patient, limit).await? {
            println!("{}", serde_json::to_string(&prediction)?);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let bootstrap = LoggingConfig {
        level: args.log_level.clone().unwrap_or_else(|| LoggingConfig::default().level),
    };
    let manager = {
        // 配置加载期间的日志使用临时订阅者输出
        let _guard = scoped_tracing(&bootstrap);
        ConfigManager::load(args.config.as_deref()).map_err(|e| {
            error!("配置加载失败: {:#}", e);
            e
        })?
    };

    let mut config = manager.config().clone();
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // 初始化日志
    init_tracing(&config.logging);

    info!("启动VitalTwin风险评估服务...");
    info!("  评分策略: {:?}", config.scoring.strategy);
    info!(
        "  风险阈值: medium={}, high={}",
        config.scoring.thresholds.medium, config.scoring.thresholds.high
    );
    if let Some(path) = &config.store.snapshot_path {
        info!("  存储快照: {}", path.display());
    }

    let app = App::build(config).await?;

    let result = match args.command {
        Command::Train => app.train().await,
        Command::Score { readings } => app.score(&readings).await,
        Command::Annotate { id, outcome } => app.annotate(&id, outcome).await,
        Command::Report => app.report().await,
        Command::History { patient, limit } => app.history(&patient, limit).await,
    };

    if let Err(e) = &result {
        error!("命令执行失败: {:#}", e);
    }
    result
}

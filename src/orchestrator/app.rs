//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：启动日志、校验配置、加载题库、创建评分客户端
//! 2. **读取作文**：从作文目录读取 `task1.txt` / `task2.txt`
//! 3. **运行测试**：委托 `session_runner` 走完整个流程
//! 4. **输出结果**：打印分数和带批注的作文

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::clients::{SubmissionClient, TomlTopicBank};
use crate::config::Config;
use crate::models::{load_essay, AnnotationStats, PlacementResult, TaskKind};
use crate::orchestrator::session_runner::{self, Essays};
use crate::services::{AnnotationOverlayEngine, DraftWriter};
use crate::utils::logging;
use crate::workflow::{ControllerSettings, TestSessionController};

/// 应用主结构
pub struct App {
    config: Config,
    client: Arc<SubmissionClient>,
    topics: Arc<TomlTopicBank>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;
        logging::log_startup(config.session_kind, &config.grading_api_base_url);

        let topics = TomlTopicBank::from_file(Path::new(&config.topic_bank_path))
            .await
            .context("无法加载题库")?;
        let client = SubmissionClient::new(&config).context("无法创建评分客户端")?;

        Ok(Self {
            config,
            client: Arc::new(client),
            topics: Arc::new(topics),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<PlacementResult> {
        let essays = self.load_essays().await?;

        let mut controller = TestSessionController::new(
            ControllerSettings::from_config(&self.config),
            self.client.clone(),
            self.topics.clone(),
            Arc::new(DraftWriter::new(&self.config.draft_folder)),
        );

        let result = session_runner::run_session(&mut controller, &essays)
            .await
            .context("写作测试未完成")?;

        logging::print_result(&result);
        self.print_annotations(&controller);

        Ok(result)
    }

    /// 读取两篇作文
    async fn load_essays(&self) -> Result<Essays> {
        let folder = Path::new(&self.config.essay_folder);
        info!("\n📁 正在读取作文: {}", folder.display());
        Ok(Essays {
            task1: load_essay(&folder.join("task1.txt")).await?,
            task2: load_essay(&folder.join("task2.txt")).await?,
        })
    }

    /// 打印带批注的作文
    fn print_annotations(&self, controller: &TestSessionController) {
        let engine = AnnotationOverlayEngine::new();
        for task in [TaskKind::Task1, TaskKind::Task2] {
            let Some(assessment) = controller.result().and_then(|r| r.assessment(task)) else {
                continue;
            };
            let stats = AnnotationStats::from_annotations(assessment.annotations());
            if stats.total == 0 {
                continue;
            }

            info!("\n📝 {} 批注 {} 条", task, stats.total);
            let segments = controller.segments(task, &engine);
            info!("{}", session_runner::render_segments(&segments));
            for segment in segments.iter().filter(|s| s.is_annotated()) {
                if let Some(annotation) = segment.annotation {
                    info!(
                        "   [{}] {}: {}",
                        annotation.category,
                        logging::truncate_text(segment.text, 30),
                        annotation.message
                    );
                }
            }
        }
    }
}

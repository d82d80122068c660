//! HemoScope服务器主程序

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use hemoscope_admin::{init_tracing, ConfigLoader, ConfigValidator, ScopeConfig, BOOTSTRAP_LEVEL};
use hemoscope_core::{Gender, PatientRecord};
use hemoscope_integration::{
    ClinicalAdvisor, GeminiClient, ImageAnalyzer, OllamaVisionClient, TextGenerator,
};
use hemoscope_report::{AnalysisDetails, ReportGenerator};
use hemoscope_web::{AppState, WebServer};
use hemoscope_workflow::{AnalysisRequest, WorkflowEngine};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// HemoScope命令行参数
#[derive(Parser, Debug)]
#[command(name = "hemoscope-server")]
#[command(about = "HemoScope 血细胞图像筛查服务")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动 Web 服务
    Serve {
        /// 监听端口
        #[arg(short, long)]
        port: Option<u16>,

        /// 监听地址
        #[arg(long)]
        host: Option<String>,
    },
    /// 分析单张图像并写出 HTML 和 PDF 报告
    Analyze {
        /// 血细胞图像路径
        #[arg(long)]
        image: PathBuf,

        /// 患者姓名
        #[arg(long)]
        name: String,

        /// 出生日期 YYYY-MM-DD
        #[arg(long, default_value = "")]
        dob: String,

        /// 性别
        #[arg(long, default_value = "")]
        gender: String,

        /// 提供给临床顾问的额外说明
        #[arg(long)]
        context: Option<String>,

        /// 报告输出目录
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 先安装订阅者，配置加载和校验的日志才能输出
    let log = init_tracing(cli.log_level.as_deref().unwrap_or(BOOTSTRAP_LEVEL))?;

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load()?;

    if cli.log_level.is_none() {
        log.set_level(&config.logging.level)?;
    }

    match cli.command {
        Command::Serve { port, host } => serve(config, port, host).await,
        Command::Analyze {
            image,
            name,
            dob,
            gender,
            context,
            out_dir,
        } => {
            let patient = PatientArgs {
                name: &name,
                dob: &dob,
                gender: &gender,
                context: context.as_deref(),
            };
            analyze(&config, &image, patient, &out_dir).await
        }
    }
}

/// 根据配置装配工作流引擎
fn build_engine(config: &ScopeConfig) -> Result<WorkflowEngine> {
    let vision = OllamaVisionClient::new(config.classifier.endpoint())
        .context("Failed to create classifier client")?;
    let analyzer = ImageAnalyzer::new(Arc::new(vision), config.classifier.calibration);

    let advisor = match config.advisor.endpoint() {
        Some(endpoint) => {
            let client = GeminiClient::new(endpoint, config.advisor.temperature)
                .context("Failed to create advisor client")?;
            info!(model = %config.advisor.model, "Clinical advisor backed by text model");
            ClinicalAdvisor::new(Some(Arc::new(client) as Arc<dyn TextGenerator>))
        }
        None => {
            warn!("GOOGLE_API_KEY not set, clinical advisor will use the static advisory");
            ClinicalAdvisor::offline()
        }
    };

    let details = AnalysisDetails::default().with_serving_model(&config.classifier.model);
    let reporter = ReportGenerator::new(details);

    Ok(WorkflowEngine::new(analyzer, advisor, reporter))
}

async fn serve(mut config: ScopeConfig, port: Option<u16>, host: Option<String>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    ConfigValidator::new().validate(&config)?;

    info!("启动HemoScope服务器...");
    info!("  分类模型: {} @ {}", config.classifier.model, config.classifier.base_url);
    info!("  文本模型: {}", config.advisor.model);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!("Invalid listen address {}:{}", config.server.host, config.server.port)
        })?;

    let engine = Arc::new(build_engine(&config)?);
    let server = WebServer::new(addr, AppState::new(engine), config.server.max_upload_bytes);
    server.run().await.context("Web server failed")?;

    Ok(())
}

/// 命令行给出的患者信息
struct PatientArgs<'a> {
    name: &'a str,
    dob: &'a str,
    gender: &'a str,
    context: Option<&'a str>,
}

async fn analyze(
    config: &ScopeConfig,
    image: &Path,
    patient: PatientArgs<'_>,
    out_dir: &Path,
) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read image {}", image.display()))?;

    let generated_at = Utc::now();
    let record = PatientRecord::register(
        patient.name,
        patient.dob,
        Gender::parse_lenient(patient.gender),
        generated_at,
    )?;
    let mut request = AnalysisRequest::new(record, bytes, generated_at);
    if let Some(context) = patient.context {
        request = request.with_context(context);
    }

    let engine = build_engine(config)?;
    let outcome = engine.run(request).await.context("Analysis failed")?;

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let pdf_path = out_dir.join(&outcome.rendered.pdf_file_name);
    let html_path = pdf_path.with_extension("html");
    tokio::fs::write(&pdf_path, &outcome.rendered.pdf)
        .await
        .with_context(|| format!("Failed to write {}", pdf_path.display()))?;
    tokio::fs::write(&html_path, &outcome.rendered.html)
        .await
        .with_context(|| format!("Failed to write {}", html_path.display()))?;

    let classification = &outcome.report.classification;
    println!(
        "Classification: {} ({:.1}%)",
        classification.label,
        classification.confidence * 100.0
    );
    if let Some(severity) = outcome.report.severity() {
        println!("Severity: {}", severity);
    }
    println!("{}", outcome.trace.summary());
    println!("HTML report: {}", html_path.display());
    println!("PDF report:  {}", pdf_path.display());

    Ok(())
}

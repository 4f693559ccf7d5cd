//! CLI 入口
//!
//! 对保存下来的 HTML 文件做一次整页翻译：解析文档，用无限高视口
//! 跑一遍翻译会话，序列化输出。页面级的增量调度（滚动/变更重扫）
//! 面向嵌入方 API，CLI 只覆盖一次性批量场景。

use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use clap::Parser;

use glossia::config::constants;
use glossia::dom::layout::FlowLayout;
use glossia::error::{Result, TranslationError};
use glossia::{GlossiaConfig, Page, PageTranslator, RenderMode, SessionOptions};

#[derive(Parser, Debug)]
#[command(name = "glossia", version, about = "在保持版式的前提下翻译 HTML 文档")]
struct Cli {
    /// 输入 HTML 文件
    input: PathBuf,

    /// 目标语言
    #[arg(short = 't', long = "to", default_value = constants::DEFAULT_TARGET_LANG)]
    target_lang: String,

    /// 源语言（auto 为自动检测）
    #[arg(long = "from", default_value = "auto")]
    source_lang: String,

    /// 渲染模式: replace 或 compare
    #[arg(long, default_value = "replace")]
    mode: String,

    /// 使用的后端标识（默认取配置中的首个端点）
    #[arg(long)]
    engine: Option<String>,

    /// 覆盖默认后端的 API 地址
    #[arg(long)]
    api_url: Option<String>,

    /// 页面 URL（用于词典域名匹配）
    #[arg(long)]
    page_url: Option<String>,

    /// 配置文件路径（缺省按搜索路径发现）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出文件（缺省写到标准输出）
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 禁用翻译缓存
    #[arg(long)]
    no_cache: bool,

    /// 输出更多日志（可重复）
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("glossia={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    if let Err(e) = runtime.block_on(run(cli)) {
        tracing::error!("{}", e);
        eprintln!("glossia: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => GlossiaConfig::from_file(path)?,
        None => GlossiaConfig::discover(),
    };

    if let Some(api_url) = &cli.api_url {
        match config.engines.first_mut() {
            Some(endpoint) => endpoint.api_url = api_url.clone(),
            None => {
                return Err(TranslationError::Config(
                    "配置中没有任何后端端点".to_string(),
                ))
            }
        }
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    let mode = RenderMode::from_str(&cli.mode).map_err(TranslationError::Config)?;
    let translator = PageTranslator::new(&config)?;
    let engine = cli
        .engine
        .clone()
        .unwrap_or_else(|| translator.default_engine().to_string());

    let html = std::fs::read_to_string(&cli.input)?;
    let viewport: Rc<dyn glossia::dom::layout::Viewport> = FlowLayout::unbounded();
    let page = Page::from_html(&html, viewport, cli.page_url.as_deref())?;

    tracing::info!(
        input = %cli.input.display(),
        target = %cli.target_lang,
        engine = %engine,
        "开始整页翻译"
    );

    let options = SessionOptions::new(&cli.target_lang, mode, engine)
        .with_source(&cli.source_lang);
    let session = translator.start_page_translation(page, options).await;

    let stats = session.stats();
    tracing::info!(
        nodes = stats.nodes_translated,
        batches = stats.batches_dispatched,
        "翻译完成"
    );

    let output_html = session.page().to_html()?;
    match &cli.output {
        Some(path) => std::fs::write(path, output_html)?,
        None => print!("{}", output_html),
    }

    Ok(())
}

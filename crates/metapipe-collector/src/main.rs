//! 수집 파이프라인 CLI.

use clap::{Parser, Subcommand};
use metapipe_collector::modules::{MetadataJob, NewsJob};
use metapipe_collector::{run_job, LoadType, PipelineConfig};
use metapipe_data::{connect_db, GnewsFeed, NseUniverse, YahooMetadataSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "metapipe-collector")]
#[command(about = "Company metadata & news ingestion pipelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 회사 메타데이터 수집 (기본 정보, 재무제표, 시세, 추천)
    Metadata {
        /// 로드 유형
        #[arg(long, value_enum, default_value_t = LoadType::Init)]
        load_type: LoadType,

        /// 특정 티커만 수집 (쉼표로 구분, 예: "INFY.NS,TCS.NS")
        #[arg(long)]
        tickers: Option<String>,

        /// 실패 로그의 티커를 재실행
        #[arg(long)]
        from_failed: bool,
    },

    /// 회사 뉴스 기사 수집 (윈도우 스티칭)
    News {
        /// 로드 유형
        #[arg(long, value_enum, default_value_t = LoadType::Init)]
        load_type: LoadType,

        /// 특정 티커만 수집 (쉼표로 구분)
        #[arg(long)]
        tickers: Option<String>,

        /// 실패 로그의 티커를 재실행
        #[arg(long)]
        from_failed: bool,
    },
}

/// 쉼표 구분 티커 인자 파싱.
fn parse_tickers(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|s| {
        s.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("metapipe={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("MetaPipe Collector 시작");

    let config = PipelineConfig::from_env()?;
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        start_date = %config.start_date,
        "설정 로드 완료"
    );

    let universe = NseUniverse::new();
    let failure_log = config.failure_log_path();

    match cli.command {
        Commands::Metadata {
            load_type,
            tickers,
            from_failed,
        } => {
            let pool = connect_db(&config.metadata_db_path()).await?;
            let job = MetadataJob::new(YahooMetadataSource::new());

            let summary = run_job(
                &pool,
                &job,
                load_type,
                parse_tickers(tickers),
                from_failed,
                &universe,
                &failure_log,
            )
            .await?;
            summary.log_summary("메타데이터 수집");

            pool.close().await;
        }
        Commands::News {
            load_type,
            tickers,
            from_failed,
        } => {
            let pool = connect_db(&config.news_db_path()).await?;
            let feed = GnewsFeed::new(
                config.news.api_key.clone(),
                config.news.max_articles_per_request,
            );
            let job = NewsJob::new(feed, config.start_date, config.news.max_requests);

            let summary = run_job(
                &pool,
                &job,
                load_type,
                parse_tickers(tickers),
                from_failed,
                &universe,
                &failure_log,
            )
            .await?;
            summary.log_summary("뉴스 수집");

            pool.close().await;
        }
    }

    tracing::info!("MetaPipe Collector 종료");
    Ok(())
}

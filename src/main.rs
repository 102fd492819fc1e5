use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use emote_bridge_lib::catalog::{AssetUrlResolver, CatalogClient, CatalogPage, SevenTvCatalog};
use emote_bridge_lib::transfer::ProgressCallback;
use emote_bridge_lib::{
    connect_in_process, BridgeConfig, FolderProject, HttpDownloadProvider, TransferRequest,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "emote-bridge")]
#[command(about = "Browse the emote catalog and import emotes into a project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出全局表情集合
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// 按名称搜索
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// 下载并导入一个表情
    Import {
        id: String,
        name: String,
        #[arg(long)]
        animated: bool,
        /// 项目目录，默认在系统视频目录下
        #[arg(long)]
        project: Option<PathBuf>,
        /// 模拟一个带播放头的活动序列
        #[arg(long)]
        timeline: bool,
        #[arg(long)]
        file_name: Option<String>,
    },
    /// 清空宿主工作目录
    Purge,
}

/// 默认项目目录
fn default_project_dir() -> PathBuf {
    if let Some(video_dir) = dirs::video_dir() {
        video_dir.join("EmoteBridge")
    } else if let Some(home_dir) = dirs::home_dir() {
        home_dir.join("Videos").join("EmoteBridge")
    } else {
        std::env::temp_dir().join("EmoteBridge")
    }
}

fn print_page(page: &CatalogPage, resolver: &AssetUrlResolver) {
    for item in &page.items {
        println!(
            "{:<28} {:<24} {:<8} {}",
            item.id,
            item.name,
            if item.animated { "animated" } else { "static" },
            resolver.preview_url(&item.id, item.animated)
        );
    }
    println!("{} of {} emotes", page.items.len(), page.total_count);
}

async fn run(command: Command, config: BridgeConfig) -> CliResult {
    let resolver = AssetUrlResolver::from_config(&config);

    match command {
        Command::List { page } => {
            let catalog = SevenTvCatalog::new(&config);
            print_page(&catalog.fetch_all(page).await?, &resolver);
        }
        Command::Search { query, page } => {
            let catalog = SevenTvCatalog::new(&config);
            print_page(&catalog.search(&query, page).await?, &resolver);
        }
        Command::Import {
            id,
            name,
            animated,
            project,
            timeline,
            file_name,
        } => {
            let project_dir = project.unwrap_or_else(default_project_dir);
            let mut folder = FolderProject::open(&project_dir);
            if timeline {
                folder = folder.with_active_sequence("Sequence 01", 0.0);
            }

            let provider = Arc::new(HttpDownloadProvider::new(&config));
            let (client, host_thread) = connect_in_process(&config, folder, provider)?;

            let urls = resolver.candidates(&id, animated);
            let mut request = TransferRequest::new(
                urls.first().cloned().unwrap_or_default(),
                name,
                id,
                animated,
            );
            if let Some(file_name) = file_name {
                request = request.with_target_file_name(file_name);
            }

            let on_progress: ProgressCallback = Arc::new(|p| {
                print!("\r{} {:>5.1}%", p.file_name, p.percent);
                let _ = std::io::stdout().flush();
            });
            let result = client
                .transfer_first_available(&request, &urls, Some(on_progress))
                .await;

            // 释放客户端后宿主线程会清理工作目录
            drop(client);
            host_thread.join();

            let result = result?;
            println!();
            println!(
                "Imported {} ({} bytes) into {}{}",
                result.file_name,
                result.bytes,
                project_dir.display(),
                if result.added_to_timeline {
                    ", placed on the timeline"
                } else {
                    ""
                }
            );
        }
        Command::Purge => {
            let config = config.with_purge_on_start(false);
            let provider = Arc::new(HttpDownloadProvider::new(&config));
            let (client, host_thread) = connect_in_process(&config, FolderProject::closed(), provider)?;

            let report = client.purge_all().await?;
            drop(client);
            host_thread.join();

            println!(
                "Removed {} entries from {} ({} failed)",
                report.removed,
                config.work_dir().display(),
                report.failed
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cli.command, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

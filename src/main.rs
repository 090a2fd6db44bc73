use clap::{Parser, Subcommand};
use foldersync::commands;
use foldersync::profile::ProfileStore;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "foldersync")]
#[command(about = "双向文件夹同步工具", version)]
struct Cli {
    /// 数据目录（profile、基线与日志的存放位置）
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 创建同步配置
    NewProfile {
        name: String,
        path_a: String,
        path_b: String,
        /// 扫描时排除的 glob 模式（可多次指定）
        #[arg(long = "exclude")]
        exclude_patterns: Vec<String>,
    },
    /// 列出已有配置
    Profiles,
    /// 对指定配置运行一次同步
    Sync {
        profile: String,
        /// 基线文件格式: json 或 properties
        #[arg(long, default_value = "json")]
        format: String,
        /// 冲突处理模式: ask, newer, a, b, skip
        #[arg(long, default_value = "ask")]
        conflicts: String,
        /// 最大并发动作数
        #[arg(long)]
        jobs: Option<usize>,
        /// 只显示将要执行的动作，不做任何修改
        #[arg(long)]
        dry_run: bool,
    },
    /// 查看配置的同步基线
    Status {
        profile: String,
        /// 基线文件格式: json 或 properties
        #[arg(long, default_value = "json")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let data_dir = foldersync::data_dir(cli.data_dir.clone());
    let _log_guard = foldersync::logging::init(&data_dir.join("logs"), cli.verbose);

    let profiles = ProfileStore::new(&data_dir);

    let result = match cli.command {
        Commands::NewProfile {
            name,
            path_a,
            path_b,
            exclude_patterns,
        } => commands::profile::new_profile(&profiles, name, path_a, path_b, exclude_patterns)
            .map(|_| false),
        Commands::Profiles => commands::profile::list_profiles(&profiles).map(|_| false),
        Commands::Sync {
            profile,
            format,
            conflicts,
            jobs,
            dry_run,
        } => {
            commands::sync::run(
                &profiles,
                &data_dir,
                commands::sync::SyncArgs {
                    profile,
                    format,
                    conflicts,
                    jobs,
                    dry_run,
                },
            )
            .await
        }
        Commands::Status { profile, format } => {
            commands::status::run(&profiles, &data_dir, &profile, &format).map(|_| false)
        }
    };

    match result {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(e) => {
            eprintln!("错误: {:#}", e);
            ExitCode::from(1)
        }
    }
}

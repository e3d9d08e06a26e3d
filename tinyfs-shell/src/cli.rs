use std::path::PathBuf;

use clap::Parser;

/// 把宿主机目录下的文件灌入内存文件系统，再导出校验往返
#[derive(Parser)]
pub struct Cli {
    /// Host directory to import files from
    #[arg(long, short)]
    pub source: PathBuf,

    /// Output directory for the exported copies
    #[arg(long, short = 'O')]
    pub out_dir: PathBuf,
}

//! Command line interface definition

use clap::Parser;
use nasemu_config::{Config, FailurePolicy};
use std::path::PathBuf;

/// nasemu - run the pan-xunlei-com client inside an emulated DSM environment
#[derive(Parser, Debug)]
#[command(name = "nasemu")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run the pan-xunlei-com NAS client inside an emulated DSM environment")]
#[command(long_about = None)]
pub struct Cli {
    /// Dashboard listen address (HOST:PORT or :PORT)
    #[arg(short = 'l', long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Download directory; repeat the flag or separate entries with ':'
    #[arg(short = 'd', long = "dir-download", value_name = "DIR")]
    pub dir_download: Vec<String>,

    /// Directory holding account data
    #[arg(short = 'c', long = "dir-data", value_name = "DIR")]
    pub dir_data: Option<PathBuf>,

    /// User id the vendor client runs as
    #[arg(short = 'u', long)]
    pub uid: Option<u32>,

    /// Group id the vendor client runs as
    #[arg(short = 'g', long)]
    pub gid: Option<u32>,

    /// Disable the vendor client's self update
    #[arg(long)]
    pub prevent_update: bool,

    /// Location of the .spk package (file://, http:// or https://)
    #[arg(long, value_name = "URL")]
    pub spk_url: Option<String>,

    /// Fetch the package even when the installed copy looks complete
    #[arg(long)]
    pub force_download: bool,

    /// What to do when mounting /proc fails (fatal or warn)
    #[arg(long, value_name = "POLICY")]
    pub proc_mount_policy: Option<FailurePolicy>,

    /// Use alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Apply CLI overrides (highest precedence)
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.general.listen.clone_from(listen);
        }
        if !self.dir_download.is_empty() {
            config.paths.download_dirs.clone_from(&self.dir_download);
        }
        if let Some(dir) = &self.dir_data {
            config.paths.data_dir.clone_from(dir);
        }
        if let Some(uid) = self.uid {
            config.identity.uid = uid;
        }
        if let Some(gid) = self.gid {
            config.identity.gid = gid;
        }
        if self.prevent_update {
            config.general.prevent_update = true;
        }
        if let Some(url) = &self.spk_url {
            config.package.url.clone_from(url);
        }
        if self.force_download {
            config.package.force = true;
        }
        if let Some(policy) = self.proc_mount_policy {
            config.isolation.proc_mount_policy = policy;
        }
    }
}

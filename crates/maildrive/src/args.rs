use std::path::PathBuf;

use clap::Parser;
use maildrive::run::{RunSettings, DEFAULT_FOLDER_ID, DEFAULT_STAGING_DIR};
use maildrive::DuplicatePolicy;
use maildrive_google::AuthConfig;

#[derive(Parser, Debug)]
#[command(name = "maildrive", version, about = "Copy Gmail attachments into a Google Drive folder")]
pub struct Args {
    /// OAuth client-secret file (needed only to authorize a new token)
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Token cache file
    #[arg(long, default_value = "token.json")]
    pub token: PathBuf,

    /// Where attachments are written before upload; removed afterwards
    #[arg(long, default_value = DEFAULT_STAGING_DIR)]
    pub staging_dir: PathBuf,

    /// Destination Drive folder id
    #[arg(long, default_value = DEFAULT_FOLDER_ID)]
    pub folder: String,

    /// Upload to the Drive root instead of a folder
    #[arg(long, conflicts_with = "folder")]
    pub no_folder: bool,

    /// Subject keyword; prompts when omitted
    #[arg(long)]
    pub subject: Option<String>,

    /// Do not upload files whose name already exists in the destination
    #[arg(long)]
    pub skip_existing: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            client_secret_path: self.credentials.clone(),
            token_cache_path: self.token.clone(),
            ..AuthConfig::default()
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            staging_dir: self.staging_dir.clone(),
            folder_id: (!self.no_folder).then(|| self.folder.clone()),
            duplicate_policy: if self.skip_existing {
                DuplicatePolicy::SkipExisting
            } else {
                DuplicatePolicy::AlwaysCreate
            },
        }
    }
}

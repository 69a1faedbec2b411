use maildrive_google::{obtain_credentials, AppResult, AuthConfig, DriveApi, GmailApi, MailApi, StorageApi};

/// The two authorized provider clients of one run.
pub struct Session<M, S> {
    mail: M,
    storage: S,
}

impl<M: MailApi, S: StorageApi> Session<M, S> {
    pub fn new(mail: M, storage: S) -> Self {
        Self { mail, storage }
    }

    pub fn mail(&self) -> &M {
        &self.mail
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl Session<GmailApi, DriveApi> {
    /// Load, refresh or acquire the token and build both clients from it.
    pub async fn authenticate(config: &AuthConfig) -> AppResult<Self> {
        let (gmail, drive) = obtain_credentials(config).await?;
        Ok(Self::new(gmail, drive))
    }
}

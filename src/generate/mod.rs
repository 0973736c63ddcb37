use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::SiteError;
use crate::log;
use crate::prompt::{self, GenerationBrief};
use crate::provider::DynProvider;
use crate::repair;
use crate::wire::{GeneratedSite, Instruction};

/// Prompt → completion → repair. Produces a site record ready to store.
pub struct Generator {
    provider: DynProvider,
    artifacts_dir: Option<PathBuf>,
}

impl Generator {
    pub fn new(provider: DynProvider, artifacts_dir: Option<PathBuf>) -> Self {
        Self { provider, artifacts_dir }
    }

    pub async fn generate(&self, brief: &GenerationBrief) -> Result<GeneratedSite, SiteError> {
        let ins = prompt::instruction(brief);
        info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            description_len = brief.description.len(),
            "requesting site generation"
        );

        let raw = self.provider.complete(&ins).await?;
        info!(response_len = raw.len(), "completion received");

        let site = repair::parse_generated(&raw).map(GeneratedSite::from_content);
        let artifact_id = match &site {
            Ok(site) => site.id,
            Err(e) => {
                warn!(error = %e, "model response could not be parsed");
                Uuid::new_v4()
            }
        };
        self.save_artifacts(artifact_id, &ins, &raw);

        let site = site?;
        info!(site = %site.id, pages = ?site.page_keys(), "site generated");
        Ok(site)
    }

    fn save_artifacts(&self, id: Uuid, ins: &Instruction, raw: &str) {
        let Some(root) = &self.artifacts_dir else { return };
        match log::save_generation(root, id, ins, raw) {
            Ok(saved) => info!(dir = %saved.dir.display(), "generation artifacts saved"),
            Err(e) => warn!(error = %e, "could not save generation artifacts"),
        }
    }
}

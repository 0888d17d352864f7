//! Provider registry: the list of configured vector-database providers and
//! the one currently selected.
//!
//! Selection goes through [`ProviderRegistry::select`], which also moves the
//! [`SyncStore`] to the new provider so results and in-flight requests for
//! the previous one are invalidated.

use crate::client::ConsoleApi;
use crate::error::{ApiResult, DispatchError};
use crate::models::RemoteProvider;
use crate::store::SyncStore;

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<RemoteProvider>,
    selected: Option<i64>,
}

impl ProviderRegistry {
    pub fn from_providers(providers: Vec<RemoteProvider>) -> Self {
        Self {
            providers,
            selected: None,
        }
    }

    /// Fetch the provider list from the backend.
    pub async fn load(api: &dyn ConsoleApi) -> ApiResult<Self> {
        let providers = api.list_providers().await?;
        tracing::info!(count = providers.len(), "loaded vector database providers");
        Ok(Self::from_providers(providers))
    }

    /// Re-fetch the list, keeping the selection if the provider still exists.
    pub async fn reload(&mut self, api: &dyn ConsoleApi) -> ApiResult<()> {
        self.providers = api.list_providers().await?;
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                tracing::warn!(provider_id = id, "selected provider no longer exists");
                self.selected = None;
            }
        }
        Ok(())
    }

    pub fn providers(&self) -> &[RemoteProvider] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&RemoteProvider> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn selected(&self) -> Option<&RemoteProvider> {
        self.selected.and_then(|id| self.get(id))
    }

    /// The selected provider, or [`DispatchError::NoProviderSelected`].
    pub fn require_selected(&self) -> Result<&RemoteProvider, DispatchError> {
        self.selected().ok_or(DispatchError::NoProviderSelected)
    }

    pub fn select(
        &mut self,
        id: i64,
        store: &mut SyncStore,
    ) -> Result<&RemoteProvider, DispatchError> {
        if self.get(id).is_none() {
            return Err(DispatchError::UnknownProvider(id));
        }
        self.selected = Some(id);
        store.select(id);
        self.require_selected()
    }

    /// Select `preferred` if given, else the backend's default provider,
    /// else the first one listed.
    pub fn select_default(
        &mut self,
        preferred: Option<i64>,
        store: &mut SyncStore,
    ) -> Result<&RemoteProvider, DispatchError> {
        let id = match preferred {
            Some(id) => id,
            None => self
                .providers
                .iter()
                .find(|p| p.is_default)
                .or_else(|| self.providers.first())
                .map(|p| p.id)
                .ok_or(DispatchError::NoProviderSelected)?,
        };
        self.select(id, store)
    }

    /// Make `id` the backend default, then re-fetch the list so the
    /// `is_default` flags come from the server.
    pub async fn set_default(&mut self, api: &dyn ConsoleApi, id: i64) -> ApiResult<String> {
        let message = api.set_default_provider(id).await?;
        tracing::info!(provider_id = id, "default provider changed");
        self.reload(api).await?;
        Ok(message)
    }
}

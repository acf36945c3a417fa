//! Application root: owns configuration, the API client and durable state,
//! and hands out the components built on them.

use std::sync::Arc;

use crate::api::StorefrontApiClient;
use crate::auth::AuthFlowController;
use crate::cart::{CartStore, StaticCatalog};
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::profile::{
    AddressDirectory, AddressDirectorySource, DirectoryError, JsonFileDirectory, ProfileService,
    StaticDirectory,
};
use crate::session::{FileStorage, KeyValueStorage, SessionStore, StorageError, probe_or_noop};

/// Address directory chosen by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredDirectory {
    File(JsonFileDirectory),
    Static(StaticDirectory),
}

impl AddressDirectorySource for ConfiguredDirectory {
    async fn load(&self) -> Result<AddressDirectory, DirectoryError> {
        match self {
            Self::File(source) => source.load().await,
            Self::Static(source) => source.load().await,
        }
    }
}

/// Application state shared by the presentation layer.
///
/// This struct is cheaply cloneable via `Arc`. The session store inside is
/// shared by every clone; auth flows and carts are created per use.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: StorefrontApiClient,
    storage: Arc<dyn KeyValueStorage>,
    session: SessionStore,
    profile: ProfileService<StorefrontApiClient, ConfiguredDirectory>,
}

impl AppState {
    /// Create state persisted under `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        let storage = Arc::new(FileStorage::new(&config.state_dir));
        Self::with_storage(config, storage)
    }

    /// Create state on an explicit storage backend.
    ///
    /// Storage that fails its probe is replaced by a no-op store, so the
    /// run is memory-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, AppError> {
        let api = StorefrontApiClient::new(config.api_base_url.clone(), config.request_timeout)?;
        let storage = probe_or_noop(storage);
        let session = SessionStore::open(Arc::clone(&storage));

        let directory = config.address_directory_path.as_ref().map_or_else(
            || ConfiguredDirectory::Static(StaticDirectory::default()),
            |path| ConfiguredDirectory::File(JsonFileDirectory::new(path)),
        );
        let profile = ProfileService::new(api.clone(), directory, session.clone());

        tracing::debug!(
            api_base_url = %config.api_base_url,
            durable = storage.is_durable(),
            "Storefront state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                storage,
                session,
                profile,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &StorefrontApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService<StorefrontApiClient, ConfiguredDirectory> {
        &self.inner.profile
    }

    /// A fresh, closed authentication flow bound to this state's session.
    #[must_use]
    pub fn auth_flow(&self) -> AuthFlowController<StorefrontApiClient> {
        AuthFlowController::new(
            self.inner.api.clone(),
            self.inner.session.clone(),
            self.inner.config.reset_completion,
        )
    }

    /// The configured product catalog, or an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured catalog file cannot be loaded.
    pub fn catalog(&self) -> Result<StaticCatalog, AppError> {
        match &self.inner.config.catalog_path {
            Some(path) => Ok(StaticCatalog::from_json_file(path)?),
            None => Ok(StaticCatalog::default()),
        }
    }

    /// The persisted cart, with `catalog`'s add-on offers attached.
    #[must_use]
    pub fn load_cart(&self, catalog: &StaticCatalog) -> CartStore {
        CartStore::load(&self.inner.config.cart, self.inner.storage.as_ref())
            .with_add_ons(catalog.add_ons.clone())
    }

    /// Persist `cart`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written.
    pub fn save_cart(&self, cart: &CartStore) -> Result<(), StorageError> {
        cart.save(self.inner.storage.as_ref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use harbor_core::{CurrencyCode, Price, ProductId};
    use rust_decimal::Decimal;
    use url::Url;

    use super::*;
    use crate::cart::{ProductCatalog, Product};
    use crate::session::MemoryStorage;

    fn config(dir: &std::path::Path) -> StorefrontConfig {
        StorefrontConfig::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            dir.to_path_buf(),
        )
    }

    #[test]
    fn test_cart_persists_across_states() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = StaticCatalog::new(
            vec![Product {
                id: ProductId::new("p1"),
                name: "Mug".to_string(),
                price: Price::new(Decimal::from(150), CurrencyCode::TWD),
                original_price: Price::new(Decimal::from(200), CurrencyCode::TWD),
                image: String::new(),
            }],
            Vec::new(),
        );

        let state = AppState::new(config(dir.path())).unwrap();
        let mut cart = state.load_cart(&catalog);
        cart.add_item(catalog.product(&ProductId::new("p1")).unwrap());
        state.save_cart(&cart).unwrap();

        let restarted = AppState::new(config(dir.path())).unwrap();
        let cart = restarted.load_cart(&catalog);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total(), Price::new(Decimal::from(210), CurrencyCode::TWD));
    }

    #[test]
    fn test_auth_flow_shares_session() {
        let storage = Arc::new(MemoryStorage::new());
        let state = AppState::with_storage(config(&PathBuf::from("/unused")), storage).unwrap();
        let flow = state.auth_flow();
        assert!(!flow.is_open());
        assert!(!flow.session().is_authenticated());
        assert!(!state.session().is_authenticated());
    }

    #[test]
    fn test_missing_catalog_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.catalog_path = Some(dir.path().join("missing.json"));
        let state = AppState::new(config).unwrap();
        assert!(matches!(state.catalog(), Err(AppError::Catalog(_))));
    }

    #[tokio::test]
    async fn test_default_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(config(dir.path())).unwrap();
        assert!(state.profile().directory().await.unwrap().is_empty());
    }
}

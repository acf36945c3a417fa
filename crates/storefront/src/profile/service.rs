use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use harbor_core::{Email, UserId};

use super::ProfileError;
use super::address::{AddressDirectory, AddressDirectorySource, PostalAddress};
use crate::api::{ApiError, ApiResponse, ProfileApi, ProfileData, ProfileUpdate};
use crate::session::{SessionStore, SessionUserUpdate};

const DIRECTORY_CACHE_KEY: &str = "address-directory";
const PROFILE_FAILED: &str = "Could not load your profile.";
const SAVE_FAILED: &str = "Could not save your profile.";

/// The logged-in user's profile with its address split into parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: Option<UserId>,
    pub email: Option<Email>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: PostalAddress,
}

/// Changes to save. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<PostalAddress>,
}

/// Loads and saves the logged-in user's profile.
///
/// Loading is two-phase: the address directory is loaded first (and cached
/// for an hour), and only then is the profile fetched and its address line
/// parsed against it. Clones share the cache.
pub struct ProfileService<P, D> {
    inner: Arc<ProfileServiceInner<P, D>>,
}

impl<P, D> Clone for ProfileService<P, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ProfileServiceInner<P, D> {
    api: P,
    directory_source: D,
    session: SessionStore,
    cache: Cache<String, Arc<AddressDirectory>>,
}

impl<P: ProfileApi, D: AddressDirectorySource> ProfileService<P, D> {
    #[must_use]
    pub fn new(api: P, directory_source: D, session: SessionStore) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Self {
            inner: Arc::new(ProfileServiceInner {
                api,
                directory_source,
                session,
                cache,
            }),
        }
    }

    /// Phase 1: the address directory.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Directory` if the source fails.
    pub async fn directory(&self) -> Result<Arc<AddressDirectory>, ProfileError> {
        self.inner
            .cache
            .try_get_with(DIRECTORY_CACHE_KEY.to_string(), async {
                debug!("Loading address directory");
                self.inner.directory_source.load().await.map(Arc::new)
            })
            .await
            .map_err(ProfileError::Directory)
    }

    /// Drop the cached directory so the next load re-reads the source.
    pub async fn invalidate_directory(&self) {
        self.inner.cache.invalidate(DIRECTORY_CACHE_KEY).await;
    }

    /// Load the directory, then fetch and parse the profile.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session, `Unauthorized` (and the
    /// session is logged out) on 401, `Functional` on `status: false`,
    /// `Transport` or `Directory` otherwise.
    #[instrument(skip_all)]
    pub async fn load_profile(&self) -> Result<Profile, ProfileError> {
        let token = self
            .inner
            .session
            .token()
            .ok_or(ProfileError::NotAuthenticated)?;

        let directory = self.directory().await?;

        let result = self.inner.api.fetch_profile(&token).await;
        let data = self.settle(result, PROFILE_FAILED)?.unwrap_or_default();
        Ok(to_profile(data, &directory))
    }

    /// Save `edit`, then merge the new name into the session.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load_profile`].
    #[instrument(skip_all)]
    pub async fn save_profile(&self, edit: ProfileEdit) -> Result<Profile, ProfileError> {
        let token = self
            .inner
            .session
            .token()
            .ok_or(ProfileError::NotAuthenticated)?;

        let directory = self.directory().await?;

        let update = ProfileUpdate {
            name: edit.name.clone(),
            phone: edit.phone.clone(),
            address: edit.address.as_ref().map(PostalAddress::to_line),
        };
        let result = self.inner.api.update_profile(&token, &update).await;
        let data = self.settle(result, SAVE_FAILED)?;

        if let Some(name) = edit.name {
            self.inner.session.update_user(SessionUserUpdate {
                name: Some(name),
                ..SessionUserUpdate::default()
            });
        }
        tracing::info!("Profile saved");

        match data {
            Some(data) => Ok(to_profile(data, &directory)),
            None => self.load_profile().await,
        }
    }

    fn settle<T>(
        &self,
        result: Result<ApiResponse<T>, ApiError>,
        fallback: &str,
    ) -> Result<Option<T>, ProfileError> {
        match result {
            Err(ApiError::Unauthorized) => {
                tracing::warn!("Profile request unauthorized, logging out");
                self.inner.session.logout();
                Err(ProfileError::Unauthorized)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile request failed");
                Err(ProfileError::Transport(e))
            }
            Ok(response) if !response.status => Err(ProfileError::Functional {
                message: response.message_or(fallback),
            }),
            Ok(response) => Ok(response.data),
        }
    }
}

fn to_profile(data: ProfileData, directory: &AddressDirectory) -> Profile {
    let address = data
        .address
        .as_deref()
        .map(|line| directory.parse(line))
        .unwrap_or_default();
    Profile {
        id: data.id,
        email: data.email,
        name: data.name,
        phone: data.phone,
        address,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::profile::address::DirectoryError;
    use crate::profile::address::tests::directory;
    use crate::session::{MemoryStorage, SessionUser};
    use harbor_core::BearerToken;

    #[derive(Default)]
    struct FakeProfileApi {
        profile: Mutex<Option<Result<ApiResponse<ProfileData>, ApiError>>>,
        saved: Mutex<Vec<ProfileUpdate>>,
    }

    impl FakeProfileApi {
        fn answer(answer: Result<ApiResponse<ProfileData>, ApiError>) -> Self {
            Self {
                profile: Mutex::new(Some(answer)),
                saved: Mutex::default(),
            }
        }
    }

    impl ProfileApi for FakeProfileApi {
        async fn fetch_profile(
            &self,
            token: &BearerToken,
        ) -> Result<ApiResponse<ProfileData>, ApiError> {
            assert_eq!(token.expose(), "tok");
            self.profile
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(ApiResponse::ok(None)))
        }

        async fn update_profile(
            &self,
            _token: &BearerToken,
            update: &ProfileUpdate,
        ) -> Result<ApiResponse<ProfileData>, ApiError> {
            self.saved.lock().unwrap().push(update.clone());
            Ok(ApiResponse::ok(Some(ProfileData {
                name: update.name.clone(),
                address: update.address.clone(),
                ..ProfileData::default()
            })))
        }
    }

    /// Counts loads so caching can be observed.
    #[derive(Default)]
    struct CountingDirectory {
        loads: AtomicUsize,
    }

    impl AddressDirectorySource for CountingDirectory {
        async fn load(&self) -> Result<AddressDirectory, DirectoryError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(directory())
        }
    }

    struct BrokenDirectory;

    impl AddressDirectorySource for BrokenDirectory {
        async fn load(&self) -> Result<AddressDirectory, DirectoryError> {
            Err(DirectoryError::Parse(
                serde_json::from_str::<AddressDirectory>("{").unwrap_err(),
            ))
        }
    }

    fn logged_in_session() -> SessionStore {
        let session = SessionStore::open(Arc::new(MemoryStorage::new()));
        session.login(SessionUser {
            id: UserId::new("1"),
            email: Email::parse("amy@example.com").unwrap(),
            name: Some("Amy".to_string()),
            token: BearerToken::new("tok"),
        });
        session
    }

    fn stored_profile() -> ProfileData {
        ProfileData {
            id: Some(UserId::new("1")),
            email: Some(Email::parse("amy@example.com").unwrap()),
            name: Some("Amy".to_string()),
            phone: Some("0912345678".to_string()),
            address: Some("臺北市中正區重慶南路一段122號".to_string()),
        }
    }

    #[tokio::test]
    async fn test_load_profile_parses_address() {
        let service = ProfileService::new(
            FakeProfileApi::answer(Ok(ApiResponse::ok(Some(stored_profile())))),
            CountingDirectory::default(),
            logged_in_session(),
        );

        let profile = service.load_profile().await.unwrap();
        assert_eq!(profile.address.city.as_deref(), Some("臺北市"));
        assert_eq!(profile.address.district.as_deref(), Some("中正區"));
        assert_eq!(profile.address.detail, "重慶南路一段122號");
        assert_eq!(profile.phone.as_deref(), Some("0912345678"));
    }

    #[tokio::test]
    async fn test_directory_is_cached() {
        let service = ProfileService::new(
            FakeProfileApi::default(),
            CountingDirectory::default(),
            logged_in_session(),
        );
        service.load_profile().await.unwrap();
        service.load_profile().await.unwrap();
        assert_eq!(service.inner.directory_source.loads.load(Ordering::SeqCst), 1);

        service.invalidate_directory().await;
        service.directory().await.unwrap();
        assert_eq!(service.inner.directory_source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_directory_failure_stops_before_fetch() {
        let api = FakeProfileApi::answer(Ok(ApiResponse::ok(Some(stored_profile()))));
        let service = ProfileService::new(api, BrokenDirectory, logged_in_session());
        let err = service.load_profile().await.unwrap_err();
        assert!(matches!(err, ProfileError::Directory(_)));
        assert!(service.inner.api.profile.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_requires_session() {
        let service = ProfileService::new(
            FakeProfileApi::default(),
            CountingDirectory::default(),
            SessionStore::in_memory(),
        );
        assert!(matches!(
            service.load_profile().await,
            Err(ProfileError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_logs_out() {
        let session = logged_in_session();
        let service = ProfileService::new(
            FakeProfileApi::answer(Err(ApiError::Unauthorized)),
            CountingDirectory::default(),
            session.clone(),
        );
        let err = service.load_profile().await.unwrap_err();
        assert!(matches!(err, ProfileError::Unauthorized));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_functional_failure_message() {
        let service = ProfileService::new(
            FakeProfileApi::answer(Ok(ApiResponse::failure("User not found"))),
            CountingDirectory::default(),
            logged_in_session(),
        );
        let err = service.load_profile().await.unwrap_err();
        assert_eq!(err.user_message(), "User not found");
    }

    #[tokio::test]
    async fn test_save_profile_formats_address_and_updates_session() {
        let session = logged_in_session();
        let service = ProfileService::new(
            FakeProfileApi::default(),
            CountingDirectory::default(),
            session.clone(),
        );

        let edit = ProfileEdit {
            name: Some("Amelia".to_string()),
            phone: None,
            address: Some(PostalAddress {
                city: Some("新北市".to_string()),
                district: Some("板橋區".to_string()),
                detail: "文化路一段".to_string(),
            }),
        };
        let profile = service.save_profile(edit).await.unwrap();

        let saved = service.inner.api.saved.lock().unwrap().clone();
        assert_eq!(saved[0].address.as_deref(), Some("新北市板橋區文化路一段"));
        assert_eq!(saved[0].phone, None);
        assert_eq!(profile.address.district.as_deref(), Some("板橋區"));
        assert_eq!(session.user().unwrap().name.as_deref(), Some("Amelia"));
    }
}

//! Application state shared by every view: provider handles, preferences,
//! saved cities, the last search and the view currently on screen.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Config,
    error::{Error, Result, ValidationError},
    model::{PlaceQuery, SavedCity, WeatherView},
    provider::{
        ProviderId, WeatherProvider, geolocator_from_config,
        ipgeolocation::{DEFAULT_CITY, IpGeolocator, ResolvedLocation},
        missing_api_key, weather_provider_from_config,
    },
    registry::{CityRegistry, MAX_CITIES, SyncBus},
    settings::Settings,
    store::{SEARCH_QUERY_KEY, Store},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The newest lookup finished; its view is now current.
    Current(WeatherView),
    /// A newer lookup was started while this one was in flight; its result was dropped.
    Superseded,
}

#[derive(Debug)]
pub struct Dashboard {
    /// Absent until a weather API key is configured; only lookups need it.
    provider: Option<Box<dyn WeatherProvider>>,
    locator: IpGeolocator,
    store: Store,
    settings: Settings,
    registry: CityRegistry,
    generation: AtomicU64,
    current: RwLock<Option<WeatherView>>,
}

impl Dashboard {
    /// Build providers from `config` and open the store it points at.
    ///
    /// A missing weather API key is not an error here: settings and saved
    /// cities stay usable, and lookups fail with the configuration hint.
    pub fn from_config(config: &Config, bus: &SyncBus) -> Result<Self> {
        let provider = match weather_provider_from_config(config) {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::debug!("Weather lookups unavailable: {}", e);
                None
            }
        };
        let locator = geolocator_from_config(config);
        let dir = config
            .storage_dir()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        let store = Store::open(dir)?;
        Ok(Self::build(provider, locator, store, bus))
    }

    pub fn new(
        provider: Box<dyn WeatherProvider>,
        locator: IpGeolocator,
        store: Store,
        bus: &SyncBus,
    ) -> Self {
        Self::build(Some(provider), locator, store, bus)
    }

    fn build(
        provider: Option<Box<dyn WeatherProvider>>,
        locator: IpGeolocator,
        store: Store,
        bus: &SyncBus,
    ) -> Self {
        let settings = Settings::load(&store);
        let registry = CityRegistry::open(store.clone(), bus);
        Self {
            provider,
            locator,
            store,
            settings,
            registry,
            generation: AtomicU64::new(0),
            current: RwLock::new(None),
        }
    }

    fn provider(&self) -> Result<&dyn WeatherProvider> {
        self.provider
            .as_deref()
            .ok_or_else(|| missing_api_key(ProviderId::OpenWeather))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Change preferences and persist them immediately.
    pub fn update_settings(&mut self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        f(&mut self.settings);
        self.settings.save(&self.store)
    }

    pub fn reset_settings(&mut self) -> Result<()> {
        self.update_settings(Settings::reset)
    }

    pub fn registry(&self) -> &CityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CityRegistry {
        &mut self.registry
    }

    pub fn last_query(&self) -> Option<String> {
        match self.store.get::<String>(SEARCH_QUERY_KEY) {
            Ok(query) => query.filter(|q| !q.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Ignoring unreadable last search: {}", e);
                None
            }
        }
    }

    /// What to show on launch: the last search, or the default city.
    pub fn startup_query(&self) -> PlaceQuery {
        PlaceQuery::by_name(self.last_query().unwrap_or_else(|| DEFAULT_CITY.to_string()))
    }

    pub async fn current_view(&self) -> Option<WeatherView> {
        self.current.read().await.clone()
    }

    /// Look up `query` and make it the current view, unless a newer search
    /// started in the meantime. Name searches are remembered for next launch.
    pub async fn search(&self, query: &PlaceQuery) -> Result<SearchOutcome> {
        query.validate()?;
        let provider = self.provider()?;
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let PlaceQuery::ByName(name) = query {
            self.store.set(SEARCH_QUERY_KEY, name.trim())?;
        }

        let result = provider.fetch_conditions(query).await;

        // Compare under the write lock so a newer view cannot land in between.
        let mut current = self.current.write().await;
        if self.generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!("Dropping superseded result for {}", query);
            return Ok(SearchOutcome::Superseded);
        }

        let view = result?;
        *current = Some(view.clone());
        Ok(SearchOutcome::Current(view))
    }

    /// Search wherever the caller appears to be, or the default location.
    pub async fn search_here(&self) -> Result<(ResolvedLocation, SearchOutcome)> {
        let location = self.locator.resolve_location().await;
        let query = PlaceQuery::ByCoordinates(location.coordinates);
        let outcome = self.search(&query).await?;
        Ok((location, outcome))
    }

    /// Fetch `query` and save a snapshot of it. Capacity is checked before
    /// any request is made.
    pub async fn add_city(&mut self, query: &PlaceQuery) -> Result<SavedCity> {
        self.registry.apply_pending();
        if self.registry.is_full() {
            return Err(ValidationError::RegistryFull(MAX_CITIES).into());
        }

        let view = self.provider()?.fetch_conditions(query).await?;
        let city = SavedCity::from_view(&view, Utc::now());

        self.registry.add_city(city.clone())?.into_result(&city.name)?;
        Ok(city)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Coordinates, CurrentConditions, ForecastPoint, Icon},
        units::{ClockFormat, TemperatureUnit, WindSpeedUnit},
    };
    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone};
    use std::{collections::HashMap, time::Duration};

    /// Answers from a fixed table, optionally slowly.
    #[derive(Debug, Default)]
    struct FakeProvider {
        temps: HashMap<String, f64>,
        delays: HashMap<String, Duration>,
    }

    impl FakeProvider {
        fn with(mut self, name: &str, temp: f64) -> Self {
            self.temps.insert(name.to_string(), temp);
            self
        }

        fn slow(mut self, name: &str, delay: Duration) -> Self {
            self.delays.insert(name.to_string(), delay);
            self
        }
    }

    fn view(name: &str, temp: f64) -> WeatherView {
        let offset = FixedOffset::east_opt(0).unwrap();
        let t0 = offset.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        WeatherView {
            current: CurrentConditions {
                city: name.to_string(),
                temp_c: temp,
                temp_min_c: temp - 2.0,
                temp_max_c: temp + 2.0,
                feels_like_c: temp,
                wind_kmh: 10.0,
                sunrise: t0,
                sunset: t0,
                coordinates: Coordinates { lat: 0.0, lon: 0.0 },
                utc_offset_secs: 0,
            },
            hourly: (0..8)
                .map(|i| ForecastPoint {
                    time: t0 + chrono::Duration::hours(3 * i),
                    temp_c: temp,
                    icon: Icon("01d".into()),
                })
                .collect(),
            daily: Vec::new(),
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch_conditions(&self, query: &PlaceQuery) -> Result<WeatherView> {
            let name = match query {
                PlaceQuery::ByName(name) => name.clone(),
                PlaceQuery::ByCoordinates(_) => "Coimbatore".to_string(),
            };
            if let Some(delay) = self.delays.get(&name) {
                tokio::time::sleep(*delay).await;
            }
            match self.temps.get(&name) {
                Some(temp) => Ok(view(&name, *temp)),
                None => Err(Error::Provider(format!("city not found: {name}"))),
            }
        }
    }

    fn dashboard(dir: &tempfile::TempDir, provider: FakeProvider, bus: &SyncBus) -> Dashboard {
        Dashboard::new(
            Box::new(provider),
            IpGeolocator::new(None),
            Store::open(dir.path()).unwrap(),
            bus,
        )
    }

    #[tokio::test]
    async fn search_sets_current_view_and_remembers_query() {
        let dir = tempfile::tempdir().unwrap();
        let dash = dashboard(&dir, FakeProvider::default().with("Paris", 20.0), &SyncBus::new());

        assert_eq!(dash.startup_query(), PlaceQuery::by_name("Coimbatore"));

        let outcome = dash.search(&PlaceQuery::by_name("Paris")).await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Current(ref v) if v.current.city == "Paris"));
        assert_eq!(dash.current_view().await.unwrap().current.temp_c, 20.0);

        let reopened = dashboard(&dir, FakeProvider::default(), &SyncBus::new());
        assert_eq!(reopened.startup_query(), PlaceQuery::by_name("Paris"));
    }

    #[tokio::test]
    async fn failed_search_keeps_last_good_view() {
        let dir = tempfile::tempdir().unwrap();
        let dash = dashboard(&dir, FakeProvider::default().with("Paris", 20.0), &SyncBus::new());

        dash.search(&PlaceQuery::by_name("Paris")).await.unwrap();
        let err = dash.search(&PlaceQuery::by_name("Atlantis")).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(dash.current_view().await.unwrap().current.city, "Paris");
    }

    #[tokio::test]
    async fn stale_response_does_not_overwrite_newer_one() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::default()
            .with("Paris", 20.0)
            .with("Tokyo", 25.0)
            .slow("Paris", Duration::from_millis(200));
        let dash = dashboard(&dir, provider, &SyncBus::new());

        let paris = PlaceQuery::by_name("Paris");
        let tokyo = PlaceQuery::by_name("Tokyo");
        let (old, new) = tokio::join!(dash.search(&paris), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            dash.search(&tokyo).await
        });

        assert_eq!(old.unwrap(), SearchOutcome::Superseded);
        assert!(matches!(new.unwrap(), SearchOutcome::Current(_)));
        assert_eq!(dash.current_view().await.unwrap().current.city, "Tokyo");
    }

    #[tokio::test]
    async fn result_waiting_on_the_view_lock_is_still_dropped_when_superseded() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::default().with("Paris", 20.0).with("Tokyo", 25.0);
        let dash = dashboard(&dir, provider, &SyncBus::new());

        let paris = PlaceQuery::by_name("Paris");
        let tokyo = PlaceQuery::by_name("Tokyo");
        // A reader holds the view while both lookups finish.
        let reader = dash.current.read().await;
        let (old, new, ()) = tokio::join!(
            dash.search(&paris),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                dash.search(&tokyo).await
            },
            async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                drop(reader);
            }
        );

        assert_eq!(old.unwrap(), SearchOutcome::Superseded);
        assert!(matches!(new.unwrap(), SearchOutcome::Current(_)));
        assert_eq!(dash.current_view().await.unwrap().current.city, "Tokyo");
    }

    #[tokio::test]
    async fn search_here_without_geolocation_uses_default_location() {
        let dir = tempfile::tempdir().unwrap();
        let dash = dashboard(&dir, FakeProvider::default().with("Coimbatore", 29.0), &SyncBus::new());

        let (location, outcome) = dash.search_here().await.unwrap();
        assert!(location.is_fallback);
        assert!(matches!(outcome, SearchOutcome::Current(ref v) if v.current.city == "Coimbatore"));
        // Coordinate searches do not replace the remembered name.
        assert!(dash.last_query().is_none());
    }

    #[tokio::test]
    async fn add_city_snapshots_and_refuses_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard(&dir, FakeProvider::default().with("Paris", 20.0), &SyncBus::new());

        let saved = dash.add_city(&PlaceQuery::by_name("Paris")).await.unwrap();
        assert_eq!(saved.name, "Paris");
        assert_eq!(saved.hourly_forecast.len(), 6);
        assert_eq!(saved.timezone, "UTC");

        let err = dash.add_city(&PlaceQuery::by_name("Paris")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DuplicateCity(ref n)) if n == "Paris"
        ));
        assert_eq!(dash.registry().len(), 1);
    }

    #[tokio::test]
    async fn add_city_when_full_fails_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["A", "B", "C", "D", "E"];
        let provider = names
            .iter()
            .fold(FakeProvider::default(), |p, n| p.with(n, 10.0));
        let mut dash = dashboard(&dir, provider, &SyncBus::new());

        for n in names {
            dash.add_city(&PlaceQuery::by_name(n)).await.unwrap();
        }

        // "F" is unknown to the provider, so reaching it would be a provider error.
        let err = dash.add_city(&PlaceQuery::by_name("F")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::RegistryFull(5))));
        assert_eq!(dash.registry().len(), 5);
    }

    #[tokio::test]
    async fn second_dashboard_sees_added_city() {
        let dir = tempfile::tempdir().unwrap();
        let bus = SyncBus::new();
        let mut tab_a = dashboard(&dir, FakeProvider::default().with("Tokyo", 25.0), &bus);
        let mut tab_b = dashboard(&dir, FakeProvider::default(), &bus);

        tab_a.add_city(&PlaceQuery::by_name("Tokyo")).await.unwrap();

        tab_b.registry_mut().apply_pending();
        assert!(tab_b.registry().contains("Tokyo"));
    }

    #[tokio::test]
    async fn add_city_counts_cities_a_peer_already_saved() {
        let dir = tempfile::tempdir().unwrap();
        let bus = SyncBus::new();
        let names = ["A", "B", "C", "D", "E"];
        let provider = names
            .iter()
            .fold(FakeProvider::default(), |p, n| p.with(n, 10.0));
        let mut tab_a = dashboard(&dir, provider, &bus);
        let mut tab_b = dashboard(&dir, FakeProvider::default().with("F", 12.0), &bus);

        for n in names {
            tab_a.add_city(&PlaceQuery::by_name(n)).await.unwrap();
        }

        let err = tab_b.add_city(&PlaceQuery::by_name("F")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::RegistryFull(5))));
        assert_eq!(tab_b.registry().cities(), tab_a.registry().cities());
    }

    #[tokio::test]
    async fn settings_and_cities_work_without_a_weather_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let mut dash = Dashboard::from_config(&config, &SyncBus::new()).unwrap();

        dash.update_settings(|s| s.clock = ClockFormat::TwentyFourHour)
            .unwrap();
        assert!(dash.registry().is_empty());
        dash.registry_mut().delete_all_cities().unwrap();

        let err = dash.search(&PlaceQuery::by_name("Paris")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("weatherdash configure openweather"));
        assert!(dash.last_query().is_none());

        let err = dash.add_city(&PlaceQuery::by_name("Paris")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let reopened = Dashboard::from_config(&config, &SyncBus::new()).unwrap();
        assert_eq!(reopened.settings().clock, ClockFormat::TwentyFourHour);
    }

    #[tokio::test]
    async fn settings_changes_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard(&dir, FakeProvider::default(), &SyncBus::new());

        dash.update_settings(|s| {
            s.temperature_unit = TemperatureUnit::Fahrenheit;
            s.wind_speed_unit = WindSpeedUnit::MetersPerSecond;
        })
        .unwrap();

        let reopened = dashboard(&dir, FakeProvider::default(), &SyncBus::new());
        assert_eq!(reopened.settings().temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(reopened.settings().wind_speed_unit, WindSpeedUnit::MetersPerSecond);

        dash.reset_settings().unwrap();
        let reopened = dashboard(&dir, FakeProvider::default(), &SyncBus::new());
        assert_eq!(*reopened.settings(), Settings::default());
    }

    #[tokio::test]
    async fn paris_in_fahrenheit_renders_68() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard(&dir, FakeProvider::default().with("Paris", 20.0), &SyncBus::new());
        dash.update_settings(|s| s.temperature_unit = TemperatureUnit::Fahrenheit)
            .unwrap();

        let SearchOutcome::Current(view) = dash.search(&PlaceQuery::by_name("Paris")).await.unwrap()
        else {
            panic!("expected a current view");
        };

        let s = dash.settings();
        assert_eq!(s.temperature_unit.format(view.current.temp_c), "68°F");
        assert_eq!(s.wind_speed_unit.format(view.current.wind_kmh), "10 km/h");
    }
}

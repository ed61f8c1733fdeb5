use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub lookups_total: IntCounterVec,
    pub lookup_latency_seconds: HistogramVec,
    pub provider_requests_total: IntCounterVec,
    pub location_updates_total: IntCounterVec,
    pub live_trackers_active: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let lookups_total = IntCounterVec::new(
            Opts::new("lookups_total", "Total tracking lookups by outcome"),
            &["outcome"],
        )
        .expect("valid lookups_total metric");

        let lookup_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "lookup_latency_seconds",
                "Latency of tracking lookups in seconds",
            ),
            &["outcome"],
        )
        .expect("valid lookup_latency_seconds metric");

        let provider_requests_total = IntCounterVec::new(
            Opts::new(
                "provider_requests_total",
                "Geocoding/routing provider calls by outcome",
            ),
            &["provider", "outcome"],
        )
        .expect("valid provider_requests_total metric");

        let location_updates_total = IntCounterVec::new(
            Opts::new(
                "location_updates_total",
                "Courier location samples by outcome",
            ),
            &["outcome"],
        )
        .expect("valid location_updates_total metric");

        let live_trackers_active =
            IntGauge::new("live_trackers_active", "Currently active live trackers")
                .expect("valid live_trackers_active metric");

        registry
            .register(Box::new(lookups_total.clone()))
            .expect("register lookups_total");
        registry
            .register(Box::new(lookup_latency_seconds.clone()))
            .expect("register lookup_latency_seconds");
        registry
            .register(Box::new(provider_requests_total.clone()))
            .expect("register provider_requests_total");
        registry
            .register(Box::new(location_updates_total.clone()))
            .expect("register location_updates_total");
        registry
            .register(Box::new(live_trackers_active.clone()))
            .expect("register live_trackers_active");

        Self {
            registry,
            lookups_total,
            lookup_latency_seconds,
            provider_requests_total,
            location_updates_total,
            live_trackers_active,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

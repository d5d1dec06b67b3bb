use chrono::{TimeZone, Utc};
use spot_deals::aggregator::Aggregator;
use spot_deals::config::AppConfig;
use spot_deals::models::SpotDataset;
use spot_deals::pipeline::{RunOutcome, run_at};
use spot_deals::source::{RegionCatalog, RegionPriceFetcher};
use spot_deals::store::{DatasetStore, JsonFileStore};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIRECTORY: &str = r#"{
    "US East (N. Virginia)": {"name":"US East (N. Virginia)","code":"us-east-1","type":"AWS Region"},
    "EU (Ireland)": {"name":"EU (Ireland)","code":"eu-west-1","type":"AWS Region"},
    "US West (Los Angeles)": {"name":"Los Angeles","code":"us-west-2-lax-1","type":"AWS Local Zone"}
}"#;

const US_EAST: &str = r#"{"Prices":[
    {"InstanceType":"c5.xlarge","VCPUS":4,"Memory":"8 GiB","SpotSavingRate":"60%","SpotPrice":"0.05"},
    {"InstanceType":"t3.xlarge","VCPUS":4,"Memory":"16 GiB","SpotSavingRate":"45%","SpotPrice":"0.01"}
]}"#;

const EU_WEST: &str = r#"{"Prices":[
    {"InstanceType":"c6a.xlarge","VCPUS":4,"Memory":"8 GiB","SpotSavingRate":"70%","SpotPrice":"0.02"}
]}"#;

// 0.0507 / 24 and 0.1123 / 12 have no short decimal form.
const EU_WEST_LONG_RATIOS: &str = r#"{"Prices":[
    {"InstanceType":"c6i.6xlarge","VCPUS":24,"Memory":"48 GiB","SpotSavingRate":"66%","SpotPrice":"0.0507"},
    {"InstanceType":"m6i.3xlarge","VCPUS":12,"Memory":"48 GiB","SpotSavingRate":"58%","SpotPrice":"0.1123"}
]}"#;

const NOTHING_QUALIFIES: &str = r#"{"Prices":[
    {"InstanceType":"c6a.xlarge","VCPUS":4,"Memory":"8 GiB","SpotSavingRate":"20%","SpotPrice":"0.09"}
]}"#;

async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/locations.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DIRECTORY))
        .mount(server)
        .await;
}

async fn mount_region(server: &MockServer, region: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path("/prices"))
        .and(query_param("region", region))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

struct Harness {
    config: AppConfig,
    store: JsonFileStore,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(server: &MockServer) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            regions_url: format!("{}/locations.json", server.uri()),
            pricing_url: format!("{}/prices", server.uri()),
            output_path: dir.path().join("docs").join("spot_data.json"),
            ..AppConfig::default()
        };
        let store = JsonFileStore::new(&config.output_path);
        Self {
            config,
            store,
            _dir: dir,
        }
    }

    async fn run(&self, minute: i64) -> RunOutcome {
        let client = reqwest::Client::new();
        let catalog = RegionCatalog::new(client.clone(), &self.config);
        let aggregator = Aggregator::new(RegionPriceFetcher::new(client, &self.config), &self.config);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::minutes(minute);
        run_at(&catalog, &aggregator, &self.store, now).await.unwrap()
    }

    async fn stored(&self) -> SpotDataset {
        self.store.load().await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn first_run_writes_ranked_dataset() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_region(&server, "us-east-1", 200, US_EAST).await;
    mount_region(&server, "eu-west-1", 200, EU_WEST).await;
    let h = Harness::new(&server);

    assert_eq!(h.run(0).await, RunOutcome::Written);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&h.config.output_path).unwrap()).unwrap();
    assert_eq!(raw["last_updated"], "2024-05-01T12:00:00Z");
    assert_eq!(raw["regions"]["us-east-1"].as_array().unwrap().len(), 1);
    assert!(raw["regions"].get("us-west-2-lax-1").is_none());
    let top = raw["global_top_5"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["region"], "eu-west-1");
    assert_eq!(top[1]["region"], "us-east-1");
    assert_eq!(top[1]["instanceType"], "c5.xlarge");

    let us_east: Vec<&str> = raw["regions"]["us-east-1"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["InstanceType"].as_str().unwrap())
        .collect();
    assert_eq!(us_east, vec!["c5.xlarge"]);
    assert!(top.iter().all(|d| d["instanceType"] != "t3.xlarge"));
}

#[tokio::test]
async fn unchanged_upstream_leaves_file_untouched() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_region(&server, "us-east-1", 200, US_EAST).await;
    mount_region(&server, "eu-west-1", 200, EU_WEST).await;
    let h = Harness::new(&server);

    h.run(0).await;
    let before = std::fs::read(&h.config.output_path).unwrap();
    assert_eq!(h.run(0).await, RunOutcome::Unchanged);
    assert_eq!(std::fs::read(&h.config.output_path).unwrap(), before);
}

#[tokio::test]
async fn long_decimal_prices_do_not_trigger_rewrites() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_region(&server, "us-east-1", 200, US_EAST).await;
    mount_region(&server, "eu-west-1", 200, EU_WEST_LONG_RATIOS).await;
    let h = Harness::new(&server);

    assert_eq!(h.run(0).await, RunOutcome::Written);
    assert_eq!(h.stored().await.global_top_5[0].instance_type, "c6i.6xlarge");
    let before = std::fs::read(&h.config.output_path).unwrap();

    assert_eq!(h.run(0).await, RunOutcome::Unchanged);
    assert_eq!(std::fs::read(&h.config.output_path).unwrap(), before);
}

#[tokio::test]
async fn failed_region_is_carried_and_empty_region_is_cleared() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_region(&server, "us-east-1", 200, US_EAST).await;
    mount_region(&server, "eu-west-1", 200, EU_WEST).await;
    let h = Harness::new(&server);
    h.run(0).await;
    let first = h.stored().await;

    server.reset().await;
    mount_directory(&server).await;
    mount_region(&server, "us-east-1", 502, "bad gateway").await;
    mount_region(&server, "eu-west-1", 200, NOTHING_QUALIFIES).await;

    assert_eq!(h.run(10).await, RunOutcome::Written);
    let second = h.stored().await;
    assert_eq!(second.regions["us-east-1"], first.regions["us-east-1"]);
    assert!(second.regions["eu-west-1"].is_empty());
    assert!(second.global_top_5.is_empty());
}

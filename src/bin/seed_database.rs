//! Plant Sampling Database Seeder
//!
//! Fills a running API with field sites, environmental readings, researchers,
//! plant samples, researcher assignments and growth measurements.
//!
//! Usage:
//!   `cargo run --bin seed_database -- --url http://localhost:3000 --samples 40`

use anyhow::{Context, anyhow};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use clap::{Arg, Command, value_parser};
use console::style;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Duration;

const MAX_CONCURRENT: usize = 8;

const SITES: [(&str, &str, &str, f64, f64); 6] = [
    ("Surrey", "United Kingdom", "forest", 51.4769, -0.2914),
    ("Cairngorms", "United Kingdom", "mountain", 57.0833, -3.6667),
    ("Camargue", "France", "wetland", 43.5333, 4.5000),
    ("Jutland", "Denmark", "coastal", 56.0000, 8.1200),
    ("Puszta", "Hungary", "grassland", 47.5800, 21.0400),
    ("Val d'Orcia", "Italy", "agricultural", 43.0700, 11.6100),
];

const SPECIES: [(&str, &str); 8] = [
    ("Quercus robur", "English Oak"),
    ("Fagus sylvatica", "European Beech"),
    ("Betula pendula", "Silver Birch"),
    ("Pinus sylvestris", "Scots Pine"),
    ("Fraxinus excelsior", "European Ash"),
    ("Salix alba", "White Willow"),
    ("Phragmites australis", "Common Reed"),
    ("Calluna vulgaris", "Heather"),
];

const RESEARCHERS: [(&str, &str); 5] = [
    ("Ada Lindqvist", "Institute of Plant Ecology"),
    ("Tomás Ferreira", "Botanical Survey Office"),
    ("Mei Tanaka", "Institute of Plant Ecology"),
    ("Kwame Mensah", "Soil and Climate Lab"),
    ("Ines Duval", "Botanical Survey Office"),
];

const SOIL_TYPES: [&str; 7] = ["clay", "sandy", "loamy", "silty", "peaty", "chalky", "rocky"];
const ROLES: [&str; 5] = [
    "lead_researcher",
    "assistant_researcher",
    "field_technician",
    "data_analyst",
    "supervisor",
];
const HEALTH: [&str; 5] = ["excellent", "good", "fair", "poor", "critical"];

#[derive(Debug, Default)]
pub struct CreatedObjects {
    pub locations: Vec<Value>,
    pub conditions: Vec<Value>,
    pub researchers: Vec<Value>,
    pub samples: Vec<Value>,
    pub assignments: Vec<Value>,
    pub growth_metrics: Vec<Value>,
}

pub struct DatabaseSeeder {
    base_url: String,
    client: Client,
    sample_count: usize,
    created_objects: CreatedObjects,
}

/// Random coordinate within roughly 1 km of a base coordinate
fn generate_nearby_coordinate(base_lat: f64, base_lon: f64) -> (f64, f64) {
    let mut rng = rand::rng();

    // 1 degree latitude is about 111 km
    let lat_per_km = 0.009;
    let lon_per_km = 0.009 / base_lat.to_radians().cos();

    let angle = rng.random::<f64>() * 2.0 * std::f64::consts::PI;
    let radius = rng.random::<f64>().sqrt();

    let round = |v: f64| (v * 1e6).round() / 1e6;
    (
        round(base_lat + lat_per_km * radius * angle.sin()),
        round(base_lon + lon_per_km * radius * angle.cos()),
    )
}

fn progress_bar(len: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

fn id_of(object: &Value, key: &str) -> anyhow::Result<i64> {
    object[key]
        .as_i64()
        .ok_or_else(|| anyhow!("response has no '{key}': {object}"))
}

async fn post(client: &Client, base_url: &str, endpoint: &str, data: &Value) -> anyhow::Result<Value> {
    let response = client
        .post(format!("{base_url}{endpoint}"))
        .json(data)
        .send()
        .await
        .with_context(|| format!("request to {endpoint} failed"))?;

    let status = response.status();
    if status.is_success() {
        Ok(response.json::<Value>().await?)
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(anyhow!("HTTP {status} {endpoint}: {error_text}"))
    }
}

impl DatabaseSeeder {
    pub fn new(base_url: &str, sample_count: usize) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            sample_count,
            created_objects: CreatedObjects::default(),
        })
    }

    /// Posts every body to `endpoint` with bounded concurrency
    async fn post_parallel(&self, endpoint: &str, bodies: Vec<Value>) -> anyhow::Result<Vec<Value>> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT));
        let pb = progress_bar(bodies.len())?;

        let tasks = bodies.into_iter().map(|body| {
            let semaphore = Arc::clone(&semaphore);
            let client = self.client.clone();
            let base_url = self.base_url.clone();
            let endpoint = endpoint.to_string();
            let pb = pb.clone();
            tokio::spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => post(&client, &base_url, &endpoint, &body).await,
                    Err(e) => Err(anyhow!(e)),
                };
                pb.inc(1);
                result
            })
        });

        let results = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined
                    .map_err(|e| anyhow!("task join error: {e}"))
                    .and_then(std::convert::identity)
            })
            .collect::<anyhow::Result<Vec<_>>>();
        pb.finish_and_clear();
        results
    }

    pub async fn test_connection(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await
            .context("API is not reachable")?;
        if !response.status().is_success() {
            return Err(anyhow!("health check returned {}", response.status()));
        }
        Ok(())
    }

    pub async fn create_locations(&mut self) -> anyhow::Result<()> {
        println!("{} Creating sampling locations...", style("[1/6]").bold().dim());

        let bodies = SITES
            .iter()
            .map(|(region, country, site_type, lat, lon)| {
                let (latitude, longitude) = generate_nearby_coordinate(*lat, *lon);
                json!({
                    "location_data": {
                        "coordinates": { "latitude": latitude, "longitude": longitude },
                        "region": region,
                        "country": country,
                        "site_type": site_type
                    }
                })
            })
            .collect();

        self.created_objects.locations = self.post_parallel("/api/locations", bodies).await?;
        println!(
            "{} Created {} locations",
            style("✓").green(),
            self.created_objects.locations.len()
        );
        Ok(())
    }

    pub async fn create_conditions(&mut self) -> anyhow::Result<()> {
        println!("{} Recording environmental conditions...", style("[2/6]").bold().dim());

        let bodies: Vec<Value> = {
            let mut rng = rand::rng();
            (0..SITES.len() * 2)
                .map(|_| {
                    let level = ["low", "medium", "high"];
                    json!({
                        "condition_data": {
                            "soil_composition": {
                                "pH": (rng.random_range(4.5..8.5_f64) * 10.0).round() / 10.0,
                                "nutrients": {
                                    "nitrogen": level.choose(&mut rng),
                                    "phosphorus": level.choose(&mut rng),
                                    "potassium": level.choose(&mut rng)
                                },
                                "type": SOIL_TYPES.choose(&mut rng)
                            },
                            "temperature": (rng.random_range(-5.0..32.0_f64) * 10.0).round() / 10.0,
                            "humidity": rng.random_range(20..100),
                            "altitude": rng.random_range(0..1800)
                        }
                    })
                })
                .collect()
        };

        self.created_objects.conditions = self.post_parallel("/api/conditions", bodies).await?;
        println!(
            "{} Created {} condition records",
            style("✓").green(),
            self.created_objects.conditions.len()
        );
        Ok(())
    }

    pub async fn create_researchers(&mut self) -> anyhow::Result<()> {
        println!("{} Registering researchers...", style("[3/6]").bold().dim());

        // Emails are unique, so every run gets its own suffix
        let run = Utc::now().timestamp();
        let bodies = RESEARCHERS
            .iter()
            .map(|(name, affiliation)| {
                let handle = name.to_lowercase().replace(' ', ".");
                json!({
                    "name": name,
                    "email": format!("{handle}+{run}@field-botany.example"),
                    "affiliation": affiliation
                })
            })
            .collect();

        self.created_objects.researchers = self.post_parallel("/api/researchers", bodies).await?;
        println!(
            "{} Registered {} researchers",
            style("✓").green(),
            self.created_objects.researchers.len()
        );
        Ok(())
    }

    pub async fn create_samples(&mut self) -> anyhow::Result<()> {
        println!("{} Collecting plant samples...", style("[4/6]").bold().dim());

        let location_ids = self
            .created_objects
            .locations
            .iter()
            .map(|l| id_of(l, "location_id"))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let condition_ids = self
            .created_objects
            .conditions
            .iter()
            .map(|c| id_of(c, "condition_id"))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let today = Utc::now().date_naive();

        let bodies: Vec<Value> = {
            let mut rng = rand::rng();
            (0..self.sample_count)
                .filter_map(|_| {
                    let (species, common_name) = SPECIES.choose(&mut rng)?;
                    let sampling_date = today - ChronoDuration::days(rng.random_range(30..365));
                    Some(json!({
                        "sample_detail": {
                            "species": species,
                            "common_name": common_name,
                            "sampling_date": sampling_date.to_string(),
                            "description": format!("Specimen of {common_name} tagged in the field")
                        },
                        "location_id": location_ids.choose(&mut rng)?,
                        "condition_id": condition_ids.choose(&mut rng)?
                    }))
                })
                .collect()
        };

        self.created_objects.samples = self.post_parallel("/api/samples", bodies).await?;
        println!(
            "{} Collected {} samples",
            style("✓").green(),
            self.created_objects.samples.len()
        );
        Ok(())
    }

    pub async fn assign_researchers(&mut self) -> anyhow::Result<()> {
        println!("{} Assigning researchers to samples...", style("[5/6]").bold().dim());

        let researcher_ids = self
            .created_objects
            .researchers
            .iter()
            .map(|r| id_of(r, "researcher_id"))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut bodies = Vec::new();
        {
            let mut rng = rand::rng();
            for sample in &self.created_objects.samples {
                let sample_id = id_of(sample, "sample_id")?;
                let team_size = rng.random_range(1..=2);
                let team = researcher_ids.choose_multiple(&mut rng, team_size);
                for (i, researcher_id) in team.enumerate() {
                    let role = if i == 0 {
                        "lead_researcher"
                    } else {
                        ROLES.choose(&mut rng).copied().unwrap_or("field_technician")
                    };
                    bodies.push(json!({
                        "sample_id": sample_id,
                        "researcher_id": researcher_id,
                        "role": role
                    }));
                }
            }
        }

        self.created_objects.assignments =
            self.post_parallel("/api/sample-researchers", bodies).await?;
        println!(
            "{} Made {} assignments",
            style("✓").green(),
            self.created_objects.assignments.len()
        );
        Ok(())
    }

    pub async fn record_growth(&mut self) -> anyhow::Result<()> {
        println!("{} Recording growth measurements...", style("[6/6]").bold().dim());

        let now = Utc::now();
        let mut bodies = Vec::new();
        {
            let mut rng = rand::rng();
            for sample in &self.created_objects.samples {
                let sample_id = id_of(sample, "sample_id")?;
                let sampled_on = sample["sample_detail"]["sampling_date"]
                    .as_str()
                    .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
                    .ok_or_else(|| anyhow!("sample {sample_id} has no sampling date"))?;
                let days_since = (now.date_naive() - sampled_on).num_days().max(1);

                let mut height = rng.random_range(5.0..40.0_f64);
                let mut leaves = rng.random_range(4..60);
                for step in 1..=3_i64 {
                    height += rng.random_range(0.5..8.0);
                    leaves += rng.random_range(0..25);
                    let measured_at = now - ChronoDuration::days(days_since * (3 - step) / 3);
                    bodies.push(json!({
                        "sample_id": sample_id,
                        "height": (height * 100.0).round() / 100.0,
                        "leaf_count": leaves,
                        "stem_diameter": (height / 8.0 * 100.0).round() / 100.0,
                        "health_status": HEALTH.choose(&mut rng),
                        "measured_at": measured_at.to_rfc3339()
                    }));
                }
            }
        }

        self.created_objects.growth_metrics =
            self.post_parallel("/api/growth-metrics", bodies).await?;
        println!(
            "{} Recorded {} measurements",
            style("✓").green(),
            self.created_objects.growth_metrics.len()
        );
        Ok(())
    }

    pub async fn seed_database(&mut self) -> anyhow::Result<()> {
        println!();
        println!("{}", style("Plant Sampling Database Seeder").bold().blue());
        println!("{}", style("Creating field botany records...").dim());
        println!();

        self.test_connection().await?;
        self.create_locations().await?;
        self.create_conditions().await?;
        self.create_researchers().await?;
        self.create_samples().await?;
        self.assign_researchers().await?;
        self.record_growth().await?;

        self.display_summary();
        Ok(())
    }

    fn display_summary(&self) {
        println!();
        println!("{}", style("Database Seeding Complete!").bold().green());
        println!("{}", style("=".repeat(50)).dim());

        let summary_data = [
            ("Locations", self.created_objects.locations.len()),
            ("Conditions", self.created_objects.conditions.len()),
            ("Researchers", self.created_objects.researchers.len()),
            ("Samples", self.created_objects.samples.len()),
            ("Assignments", self.created_objects.assignments.len()),
            ("Growth metrics", self.created_objects.growth_metrics.len()),
        ];

        for (name, count) in summary_data {
            println!("{:.<20} {}", style(name).cyan(), style(count).bold().green());
        }
        println!();
        println!(
            "  {} Browse {}/api/docs to explore the data",
            style("•").dim(),
            self.base_url
        );
        println!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("Plant Sampling Database Seeder")
        .version("1.0")
        .about("Seeds the plant sampling API with realistic field data")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("API base URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("samples")
                .short('n')
                .long("samples")
                .value_name("COUNT")
                .help("Number of plant samples to create")
                .value_parser(value_parser!(usize))
                .default_value("24"),
        )
        .get_matches();

    let base_url = matches
        .get_one::<String>("url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    let sample_count = matches.get_one::<usize>("samples").copied().unwrap_or(24);

    println!("{}", style("Plant Sampling Database Seeder v1.0").bold());
    println!("{}", style("-".repeat(40)).dim());
    println!("API URL: {}", style(&base_url).cyan());

    let mut seeder = DatabaseSeeder::new(&base_url, sample_count)?;
    seeder.seed_database().await
}

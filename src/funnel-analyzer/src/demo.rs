//! Synthetic dataset generator for demos and smoke-testing the
//! pipeline without a real export. Seeded, so runs are reproducible.

use chrono::{Duration, NaiveDateTime, Utc};
use funnel_core::{EventRecord, EventTable};
use rand::distributions::WeightedIndex;
use rand::prelude::*;

const TRAFFIC_SOURCES: [(&str, f64); 10] = [
    ("google_ads", 0.25),
    ("facebook_ads", 0.20),
    ("instagram_ads", 0.15),
    ("tiktok_ads", 0.10),
    ("organic", 0.12),
    ("direct", 0.08),
    ("referral", 0.05),
    ("email", 0.03),
    ("affiliate", 0.01),
    ("youtube_ads", 0.01),
];

const COUNTRIES: [(&str, f64); 10] = [
    ("RU", 0.30),
    ("UA", 0.15),
    ("BY", 0.10),
    ("KZ", 0.08),
    ("DE", 0.08),
    ("PL", 0.07),
    ("FI", 0.06),
    ("SE", 0.06),
    ("NL", 0.05),
    ("CH", 0.05),
];

const DEVICES: [(&str, f64); 3] = [("mobile", 0.65), ("desktop", 0.30), ("tablet", 0.05)];

const BASE_DEPOSIT_PROB: f64 = 0.25;
const BASE_BET_PROB: f64 = 0.80;
const BASE_SECOND_DEPOSIT_PROB: f64 = 0.35;

const HISTORY_DAYS: i64 = 30;

fn traffic_multiplier(source: &str) -> f64 {
    match source {
        "google_ads" => 1.2,
        "facebook_ads" => 1.1,
        "instagram_ads" => 0.9,
        "tiktok_ads" => 0.8,
        "organic" => 1.3,
        "direct" => 1.4,
        "referral" => 1.5,
        "email" => 1.6,
        "affiliate" => 1.1,
        "youtube_ads" => 0.9,
        _ => 1.0,
    }
}

fn device_multiplier(device: &str) -> f64 {
    match device {
        "mobile" => 0.9,
        "desktop" => 1.2,
        _ => 1.0,
    }
}

fn country_multiplier(country: &str) -> f64 {
    match country {
        "CH" => 1.6,
        "FI" | "NL" => 1.4,
        "SE" => 1.3,
        "DE" => 1.3,
        "PL" => 1.1,
        "UA" => 0.9,
        "BY" => 0.8,
        "KZ" => 0.7,
        _ => 1.0,
    }
}

/// Generate `n_users` synthetic lifecycle records over the last 30
/// days. One day in the middle of the range gets its conversions
/// gutted so anomaly detection has something to find.
pub fn generate_demo_data(n_users: usize, seed: u64) -> EventTable {
    let mut rng = StdRng::seed_from_u64(seed);

    let source_dist = WeightedIndex::new(TRAFFIC_SOURCES.iter().map(|(_, w)| *w)).unwrap();
    let country_dist = WeightedIndex::new(COUNTRIES.iter().map(|(_, w)| *w)).unwrap();
    let device_dist = WeightedIndex::new(DEVICES.iter().map(|(_, w)| *w)).unwrap();

    let end = Utc::now().naive_utc();
    let start = end - Duration::days(HISTORY_DAYS);
    let range_seconds = (end - start).num_seconds();

    let bad_day = rng.gen_range(5..25);

    let mut rows = Vec::with_capacity(n_users);
    for user_id in 1..=n_users {
        let source = TRAFFIC_SOURCES[source_dist.sample(&mut rng)].0;
        let country = COUNTRIES[country_dist.sample(&mut rng)].0;
        let device = DEVICES[device_dist.sample(&mut rng)].0;

        let registration_time = start + Duration::seconds(rng.gen_range(0..range_seconds));

        let multiplier =
            traffic_multiplier(source) * device_multiplier(device) * country_multiplier(country);
        let deposit_prob = (BASE_DEPOSIT_PROB * multiplier).min(0.8);
        let bet_prob = (BASE_BET_PROB * multiplier).min(0.95);
        let second_deposit_prob = (BASE_SECOND_DEPOSIT_PROB * multiplier).min(0.6);

        let mut deposit_time: Option<NaiveDateTime> = None;
        let mut first_bet_time: Option<NaiveDateTime> = None;
        let mut second_deposit_time: Option<NaiveDateTime> = None;

        if rng.gen_bool(deposit_prob) {
            // 5 minutes to 48 hours after registration.
            let deposit = registration_time + Duration::minutes(rng.gen_range(5..=2880));
            deposit_time = Some(deposit);

            if rng.gen_bool(bet_prob) {
                // 1 minute to 24 hours after the deposit.
                let bet = deposit + Duration::minutes(rng.gen_range(1..=1440));
                first_bet_time = Some(bet);

                if rng.gen_bool(second_deposit_prob) {
                    // 1 hour to 7 days after the first bet.
                    second_deposit_time = Some(bet + Duration::hours(rng.gen_range(1..=168)));
                }
            }
        }

        // Gut the bad day's conversions for ~70% of its users.
        let day_offset = (registration_time - start).num_days();
        if n_users >= 1000 && day_offset == bad_day && rng.gen_bool(0.7) {
            deposit_time = None;
            first_bet_time = None;
            second_deposit_time = None;
        }

        rows.push(EventRecord {
            user_id: user_id.to_string(),
            registration_time: Some(registration_time),
            deposit_time,
            first_bet_time,
            second_deposit_time,
            traffic_source: Some(source.to_string()),
            country: Some(country.to_string()),
            device: Some(device.to_string()),
        });
    }

    EventTable::new(rows)
}

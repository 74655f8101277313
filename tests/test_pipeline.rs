//! Integration test: Full analysis (load → detect → features → train → aggregate)

use polars::prelude::*;
use seatcast::forecast::{AnalysisConfig, AnalysisResponse, ForecastEngine};
use seatcast::training::{DESCRIPTIVE_MESSAGE, TRAINED_MESSAGE};
use seatcast::ForecastError;

const ROUTES: [&str; 4] = ["DEL-BLR", "BOM-DEL", "BLR-HYD", "MAA-CCU"];

fn bookings(n: usize) -> DataFrame {
    let mut dates = Vec::with_capacity(n);
    let mut routes = Vec::with_capacity(n);
    let mut passengers = Vec::with_capacity(n);
    let mut fares = Vec::with_capacity(n);

    for i in 0..n {
        let month = i % 12 + 1;
        let day = i % 27 + 1;
        dates.push(format!("2024-{:02}-{:02}", month, day));
        routes.push(ROUTES[i % ROUTES.len()].to_string());
        let base = 100.0 + 20.0 * (i % ROUTES.len()) as f64;
        let seasonal = if month >= 10 { 40.0 } else { 0.0 };
        passengers.push(base + seasonal + (i % 7) as f64);
        fares.push(3000.0 + 15.0 * (i % 11) as f64);
    }

    df!(
        "Journey Date" => &dates,
        "Route" => &routes,
        "Num Passengers" => &passengers,
        "Fare" => &fares
    )
    .unwrap()
}

#[test]
fn test_three_row_dataset() {
    let df = df!(
        "date" => &["2024-01-05", "2024-01-12", "2024-02-01"],
        "num_passengers" => &[120.0, 140.0, 90.0],
        "route" => &["DEL-BLR", "DEL-BLR", "BOM-DEL"]
    )
    .unwrap();

    let result = ForecastEngine::default().analyze_dataframe(&df).unwrap();

    assert_eq!(result.message, DESCRIPTIVE_MESSAGE);
    assert!((result.predicted_demand - 116.666_666).abs() < 1e-3);
    assert_eq!(result.range.min, 90.0);
    assert_eq!(result.range.max, 140.0);
    assert_eq!(result.monthly_trends.get(&1), Some(&130.0));
    assert_eq!(result.monthly_trends.get(&2), Some(&90.0));
    assert_eq!(result.per_route_forecast.get("DEL-BLR"), Some(130.0));
    assert_eq!(result.per_route_forecast.get("BOM-DEL"), Some(90.0));
    assert_eq!(result.festive_avg, 0.0);
    assert_eq!(result.analysis.rows, 3);
}

#[test]
fn test_trained_forecast_shape() {
    let df = bookings(120);
    let result = ForecastEngine::default().analyze_dataframe(&df).unwrap();

    assert_eq!(result.message, TRAINED_MESSAGE);
    assert_eq!(result.analysis.target_column, "num_passengers");
    assert_eq!(result.analysis.date_column, "journey_date");
    assert_eq!(result.analysis.route_columns, vec!["route".to_string()]);
    assert_eq!(result.analysis.rows, 120);

    assert!(result.range.min <= result.predicted_demand);
    assert!(result.predicted_demand <= result.range.max);
    assert!(result.variation_std >= 0.0);

    assert_eq!(result.monthly_trends.len(), 12);
    assert!(result.monthly_trends.keys().all(|m| (1..=12).contains(m)));
    assert!(!result.weekday_trends.is_empty());
    assert!(result.weekday_trends.keys().all(|d| (0..=6).contains(d)));
    assert_eq!(result.chart_data.len(), 12);
    assert!(result.chart_data.windows(2).all(|w| w[0].month < w[1].month));
    assert!(result.festive_avg > 0.0);

    assert!(!result.per_route_forecast.is_empty());
    assert!(result.per_route_forecast.keys().all(|k| ROUTES.contains(&k)));
    let values: Vec<f64> = result.per_route_forecast.iter().map(|(_, v)| v).collect();
    assert!(values.windows(2).all(|w| w[0] >= w[1]));

    assert!(!result.top_drivers.is_empty());
    assert!(result.top_drivers.len() <= 5);
}

#[test]
fn test_seed_makes_runs_repeatable() {
    let df = bookings(80);
    let engine = ForecastEngine::new(AnalysisConfig::default().with_random_seed(Some(7))).unwrap();

    let first = engine.analyze_dataframe(&df).unwrap();
    let second = engine.analyze_dataframe(&df).unwrap();

    assert_eq!(first.predicted_demand, second.predicted_demand);
    assert_eq!(first.range, second.range);
    assert_eq!(first.per_route_forecast, second.per_route_forecast);
    assert_eq!(first.monthly_trends, second.monthly_trends);
    assert_eq!(first.weekday_trends, second.weekday_trends);
    assert_eq!(first.festive_avg, second.festive_avg);
}

#[test]
fn test_routeless_dataset_has_empty_route_forecast() {
    let n = 40;
    let qty: Vec<f64> = (0..n).map(|i| 50.0 + (i % 9) as f64 * 3.0).collect();
    let price: Vec<f64> = (0..n).map(|i| 10.0 + (i % 5) as f64).collect();
    let df = df!("seats_sold" => &qty, "price" => &price).unwrap();

    let result = ForecastEngine::default().analyze_dataframe(&df).unwrap();

    assert_eq!(result.analysis.date_column, "synthesized");
    assert!(result.analysis.route_columns.is_empty());
    assert!(result.per_route_forecast.is_empty());
    assert_eq!(result.analysis.target_column, "seats_sold");
}

#[test]
fn test_route_forecast_capped_at_top_routes() {
    let n = 90;
    let codes = [
        "AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "GGG", "HHH", "III", "JJJ", "KKK", "LLL", "MMM",
        "NNN", "OOO",
    ];
    let routes: Vec<String> = (0..n).map(|i| format!("{}-ZZZ", codes[i % 15])).collect();
    let origin: Vec<String> = (0..n).map(|i| format!("city{}", i % 15)).collect();
    let demand: Vec<f64> = (0..n).map(|i| 10.0 + (i % 15) as f64 * 4.0).collect();
    let df = df!("route" => &routes, "origin" => &origin, "demand" => &demand).unwrap();

    let engine = ForecastEngine::new(AnalysisConfig::default().with_top_routes(10)).unwrap();
    let result = engine.analyze_dataframe(&df).unwrap();

    assert_eq!(result.analysis.route_columns, vec!["route".to_string(), "origin".to_string()]);
    assert!(!result.per_route_forecast.is_empty());
    assert!(result.per_route_forecast.len() <= 10);
}

#[test]
fn test_missing_target_json() {
    let df = df!("route" => &["DEL-BLR", "BOM-DEL"], "note" => &["a", "b"]).unwrap();
    let engine = ForecastEngine::default();
    let response = engine.respond(engine.analyze_dataframe(&df));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "error": "No numeric column found to analyze as demand/target" })
    );
}

#[test]
fn test_success_json_keys() {
    let response = AnalysisResponse::from(ForecastEngine::default().analyze_dataframe(&bookings(30)).unwrap());
    let json = serde_json::to_value(&response).unwrap();
    let object = json.as_object().unwrap();

    for key in [
        "predicted_demand",
        "variation_std",
        "range",
        "monthly_trends",
        "weekday_trends",
        "festive_avg",
        "per_route_forecast",
        "chart_data",
        "message",
        "analysis",
    ] {
        assert!(object.contains_key(key), "missing {}", key);
    }
    assert!(json["range"]["min"].is_number());
    assert!(json["monthly_trends"].as_object().unwrap().keys().all(|k| k.parse::<u32>().is_ok()));
}

#[test]
fn test_upload_bytes() {
    let csv = b"Booking Date,Origin,Destination,Seats\n\
2024-10-01,DEL,BOM,150\n\
2024-10-02,DEL,BOM,160\n\
2024-10-03,BLR,HYD,90\n\
2024-10-04,BLR,HYD,95\n\
2024-11-01,DEL,BOM,170\n\
2024-11-02,BLR,HYD,99\n";

    let result = ForecastEngine::default().analyze_upload(Some(csv), b',').unwrap();

    assert_eq!(result.analysis.target_column, "seats");
    assert_eq!(result.analysis.date_column, "booking_date");
    assert_eq!(
        result.analysis.route_columns,
        vec!["origin".to_string(), "destination".to_string()]
    );
    assert!(result.festive_avg > 0.0);
    assert!(result.per_route_forecast.keys().all(|k| k == "DEL" || k == "BLR"));
}

#[test]
fn test_empty_upload_rejected() {
    let engine = ForecastEngine::default();
    assert!(matches!(engine.analyze_upload(None, b','), Err(ForecastError::NoDataset)));

    let header_only = engine.analyze_upload(Some(b"a,b\n"), b',');
    assert!(header_only.is_err());
    assert!(engine.respond(header_only).is_error());
}

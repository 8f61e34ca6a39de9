//! Business settings and per-vehicle trip fares.
//!
//! Both are single documents edited as a whole and saved with `PUT`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{DataError, RecordController, RecordScreen};

/// Business settings endpoint.
pub const BUSINESS_SETTINGS_PATH: &str = "/admin/business-settings";
/// Trip fare table endpoint.
pub const TRIP_FARES_PATH: &str = "/admin/trip-fares";

/// Platform-wide commercial settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSettings {
    /// Share of each fare kept by the platform, between 0 and 1.
    #[serde(default)]
    pub commission_rate: f64,
    /// ISO currency code used for display.
    #[serde(default)]
    pub currency: Option<String>,
    /// Support line shown to riders.
    #[serde(default)]
    pub support_phone: Option<String>,
    /// Search radius for driver matching.
    #[serde(default)]
    pub matching_radius_km: Option<f64>,
    /// Fields this client does not model, preserved on save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Business settings screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusinessSettingsScreen;

impl RecordScreen for BusinessSettingsScreen {
    type Value = BusinessSettings;

    fn label(&self) -> &'static str {
        "Business settings"
    }

    fn path(&self) -> String {
        BUSINESS_SETTINGS_PATH.to_owned()
    }
}

/// Fare rule for one vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripFare {
    /// Vehicle class, e.g. `ECONOMY`.
    pub vehicle_type: String,
    /// Flat charge at pickup.
    #[serde(default)]
    pub base_fare: f64,
    /// Charge per kilometre.
    #[serde(default)]
    pub per_km: f64,
    /// Charge per minute.
    #[serde(default)]
    pub per_minute: f64,
    /// Lowest fare charged.
    #[serde(default)]
    pub minimum_fare: f64,
}

impl TripFare {
    /// Fare for a trip of `km` kilometres lasting `minutes`, floored at the
    /// minimum fare.
    pub fn estimate(&self, km: f64, minutes: f64) -> f64 {
        (self.base_fare + self.per_km * km + self.per_minute * minutes).max(self.minimum_fare)
    }
}

/// The fare table, one rule per vehicle class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FareTable(pub Vec<TripFare>);

impl FareTable {
    /// Rule for `vehicle_type`, compared case-insensitively.
    pub fn rule(&self, vehicle_type: &str) -> Option<&TripFare> {
        self.0
            .iter()
            .find(|fare| fare.vehicle_type.eq_ignore_ascii_case(vehicle_type))
    }
}

/// Trip fares screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct TripFareScreen;

impl RecordScreen for TripFareScreen {
    type Value = FareTable;

    fn label(&self) -> &'static str {
        "Trip fares"
    }

    fn path(&self) -> String {
        TRIP_FARES_PATH.to_owned()
    }
}

/// Save `settings` through `controller`.
///
/// # Errors
///
/// Returns [`DataError::Network`] when the settings cannot be serialized,
/// otherwise as for [`RecordController::update`].
pub async fn save_settings<S>(
    controller: &RecordController<S>,
    settings: &S::Value,
) -> Result<Value, DataError>
where
    S: RecordScreen,
    S::Value: Serialize,
{
    let body = serde_json::to_value(settings).map_err(|error| DataError::Network {
        message: format!("cannot encode {}: {error}", controller.screen().label()),
    })?;
    controller.update(body).await
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::FetchOutcome;
    use crate::domain::ports::HttpMethod;
    use crate::test_support::{RecordingNotifier, StubRemoteClient, stub_ports};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[tokio::test]
    async fn unknown_settings_survive_a_save() {
        let client = StubRemoteClient::new();
        client.always(
            HttpMethod::Get,
            BUSINESS_SETTINGS_PATH,
            Ok(json!({ "commissionRate": 0.1, "referralBonus": 300 })),
        );
        client.reply(HttpMethod::Put, BUSINESS_SETTINGS_PATH, Ok(json!(null)));
        let settings = RecordController::new(
            BusinessSettingsScreen,
            stub_ports(&client, &RecordingNotifier::new()),
        );
        settings.load().await;
        let mut edited = (*settings.snapshot().value.expect("loaded")).clone();
        edited.commission_rate = 0.2;

        save_settings(&settings, &edited).await.expect("saved");

        let put = client.requests_to(HttpMethod::Put, BUSINESS_SETTINGS_PATH);
        let body = put[0].json_body().expect("json body");
        assert_eq!(body["referralBonus"], json!(300));
        assert_eq!(body["commissionRate"], json!(0.2));
    }

    #[rstest]
    #[case(json!([{ "vehicleType": "ECONOMY", "baseFare": 500, "perKm": 100 }]))]
    #[case(json!({ "data": [{ "vehicleType": "ECONOMY", "baseFare": 500, "perKm": 100 }] }))]
    #[tokio::test]
    async fn fare_table_loads_from_array_or_wrapper(#[case] body: Value) {
        let client = StubRemoteClient::new();
        client.reply(HttpMethod::Get, TRIP_FARES_PATH, Ok(body));
        let fares =
            RecordController::new(TripFareScreen, stub_ports(&client, &RecordingNotifier::new()));

        assert_eq!(fares.load().await, FetchOutcome::Committed);
        let table = fares.snapshot().value.expect("loaded");
        let economy = table.rule("economy").expect("rule present");
        assert!((economy.estimate(3.0, 0.0) - 800.0).abs() < f64::EPSILON);
    }

    #[rstest]
    fn estimate_is_floored_at_minimum() {
        let fare = TripFare {
            vehicle_type: "ECONOMY".into(),
            base_fare: 100.0,
            per_km: 10.0,
            per_minute: 0.0,
            minimum_fare: 700.0,
        };
        assert!((fare.estimate(1.0, 2.0) - 700.0).abs() < f64::EPSILON);
    }
}

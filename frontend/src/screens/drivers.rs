//! Driver management list and driver account actions.

use serde::Deserialize;
use serde_json::{Value, json};

use super::format;
use crate::domain::ports::ApiRequest;
use crate::domain::{DataError, EntityId, ListScreen, PageController};

/// Collection endpoint.
pub const DRIVERS_PATH: &str = "/admin/drivers";

/// Driver as returned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRow {
    /// Backend id.
    pub id: EntityId,
    /// Display name.
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    /// Contact phone.
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    /// Registered plate number.
    #[serde(default)]
    pub vehicle_plate: Option<String>,
    /// Vehicle make and model.
    #[serde(default)]
    pub vehicle_model: Option<String>,
    /// Average rating.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Account status, e.g. `PENDING`, `APPROVED`, `SUSPENDED`.
    #[serde(default)]
    pub status: Option<String>,
    /// Currently accepting trips.
    #[serde(default)]
    pub online: bool,
}

/// Row shown in the drivers table.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverView {
    /// Backend id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Phone with all but the prefix masked.
    pub phone: String,
    /// Plate and model.
    pub vehicle: String,
    /// One-decimal rating.
    pub rating: String,
    /// Status label.
    pub status: String,
    /// Availability badge.
    pub online: bool,
}

/// Account action exposed on the driver detail panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverAction {
    /// Accept a pending application.
    Approve,
    /// Block the driver from accepting trips.
    Suspend,
    /// Lift a suspension.
    Reinstate,
}

impl DriverAction {
    const fn segment(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Suspend => "suspend",
            Self::Reinstate => "reinstate",
        }
    }

    const fn done(self) -> &'static str {
        match self {
            Self::Approve => "Driver approved",
            Self::Suspend => "Driver suspended",
            Self::Reinstate => "Driver reinstated",
        }
    }
}

/// Paginated drivers screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverList;

impl ListScreen for DriverList {
    type Row = DriverRow;
    type View = DriverView;

    fn label(&self) -> &'static str {
        "Driver"
    }

    fn collection_path(&self) -> String {
        DRIVERS_PATH.to_owned()
    }

    fn plural(&self) -> &'static str {
        "drivers"
    }

    fn project(&self, row: &DriverRow) -> DriverView {
        let vehicle = match (row.vehicle_plate.as_deref(), row.vehicle_model.as_deref()) {
            (Some(plate), Some(model)) => format!("{plate} ({model})"),
            (plate, model) => format::text(plate.or(model)),
        };
        DriverView {
            id: row.id.clone(),
            name: format::text(row.name.as_deref()),
            phone: row
                .phone
                .as_deref()
                .map_or_else(|| format::MISSING.to_owned(), |phone| format::masked(phone, 4)),
            vehicle,
            rating: row
                .rating
                .map_or_else(|| format::MISSING.to_owned(), |rating| format!("{rating:.1}")),
            status: format::text(row.status.as_deref()),
            online: row.online,
        }
    }
}

/// Apply `action` to driver `id`, then refetch the current page.
///
/// # Errors
///
/// As for [`PageController::perform`].
pub async fn apply_action(
    drivers: &PageController<DriverList>,
    id: &EntityId,
    action: DriverAction,
    reason: Option<&str>,
) -> Result<Value, DataError> {
    let screen = drivers.screen();
    let path = format!("{}/{}", screen.member_path(id), action.segment());
    let body = json!({ "reason": reason });
    let request = ApiRequest::post(screen.domain(), path, body);
    drivers.perform(request, action.done()).await
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::HttpMethod;
    use crate::test_support::{Notice, RecordingNotifier, StubRemoteClient, stub_ports};
    use pagination::PageRequest;
    use rstest::rstest;

    #[rstest]
    fn projection_masks_phone_and_joins_vehicle() {
        let row: DriverRow = serde_json::from_value(json!({
            "id": 3,
            "fullName": "Tunde",
            "phoneNumber": "08031234567",
            "vehiclePlate": "LAG-123",
            "vehicleModel": "Corolla",
            "rating": 4.66,
            "online": true
        }))
        .expect("row decodes");

        let view = DriverList.project(&row);

        assert_eq!(view.phone, "0803*******");
        assert_eq!(view.vehicle, "LAG-123 (Corolla)");
        assert_eq!(view.rating, "4.7");
        assert!(view.online);
    }

    #[rstest]
    #[tokio::test]
    async fn suspension_posts_to_member_action_and_refetches() {
        let client = StubRemoteClient::new();
        client.always(HttpMethod::Get, DRIVERS_PATH, Ok(json!({ "drivers": [] })));
        client.reply(HttpMethod::Post, "/admin/drivers/3/suspend", Ok(json!({ "id": 3 })));
        let notifier = RecordingNotifier::new();
        let drivers = PageController::new(
            DriverList,
            stub_ports(&client, &notifier),
            PageRequest::first_of(20).expect("valid page"),
        );
        drivers.mount().await;

        apply_action(&drivers, &EntityId::from(3), DriverAction::Suspend, Some("fraud"))
            .await
            .expect("action succeeds");

        let posted = client.requests_to(HttpMethod::Post, "/admin/drivers/3/suspend");
        assert_eq!(posted[0].json_body(), Some(&json!({ "reason": "fraud" })));
        assert_eq!(client.requests_to(HttpMethod::Get, DRIVERS_PATH).len(), 2);
        assert_eq!(notifier.notices(), [Notice::Success("Driver suspended".into())]);
    }
}

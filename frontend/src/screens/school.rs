//! School transport hierarchy: institutions, branches, buses, routes and
//! stops, plus the student roster import.
//!
//! Every level below institutions is scoped to one parent and lives in a
//! [`ScopedControllers`] map keyed by that parent's id.

use pagination::PageRequest;
use serde::Deserialize;
use tracing::{info, warn};

use super::format;
use crate::domain::ports::{ApiRequest, FileUpload};
use crate::domain::{
    ControllerPorts, DataError, EntityId, ListScreen, PageController, ScopedControllers,
};

/// Institution collection endpoint.
pub const INSTITUTIONS_PATH: &str = "/admin/institutions";

/// Multipart field carrying the roster file.
pub const ROSTER_FIELD: &str = "file";

/// Institution as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    /// Backend id.
    pub id: EntityId,
    /// School name.
    pub name: String,
    /// Administrative contact.
    #[serde(default)]
    pub contact_email: Option<String>,
    /// Branches reported by the backend.
    #[serde(default)]
    pub branch_count: Option<u32>,
}

/// Branch of an institution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Backend id.
    pub id: EntityId,
    /// Branch name.
    pub name: String,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
}

/// Bus assigned to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    /// Backend id.
    pub id: EntityId,
    /// Plate number.
    #[serde(alias = "plateNumber")]
    pub plate: String,
    /// Seats.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Assigned driver.
    #[serde(default)]
    pub driver_name: Option<String>,
}

/// Route served by a branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Backend id.
    pub id: EntityId,
    /// Route name.
    pub name: String,
    /// Stops reported by the backend.
    #[serde(default)]
    pub stop_count: Option<u32>,
}

/// Stop on a route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    /// Backend id.
    pub id: EntityId,
    /// Stop name.
    pub name: String,
    /// Position along the route, starting at 1.
    #[serde(default, alias = "order")]
    pub sequence: Option<u32>,
    /// Degrees north.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Degrees east.
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Result of a roster import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RosterImport {
    /// Students created.
    #[serde(default)]
    pub created: u32,
    /// Rows skipped as duplicates or invalid.
    #[serde(default)]
    pub skipped: u32,
    /// Per-row problems reported by the backend.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Paginated institutions screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstitutionList;

impl ListScreen for InstitutionList {
    type Row = Institution;
    type View = String;

    fn label(&self) -> &'static str {
        "Institution"
    }

    fn collection_path(&self) -> String {
        INSTITUTIONS_PATH.to_owned()
    }

    fn plural(&self) -> &'static str {
        "institutions"
    }

    fn project(&self, row: &Institution) -> String {
        match row.branch_count {
            Some(1) => format!("{} (1 branch)", row.name),
            Some(count) => format!("{} ({count} branches)", row.name),
            None => row.name.clone(),
        }
    }
}

/// Branches of one institution.
#[derive(Debug, Clone)]
pub struct BranchList {
    institution: EntityId,
}

impl BranchList {
    /// Screen scoped to `institution`.
    pub const fn new(institution: EntityId) -> Self {
        Self { institution }
    }
}

impl ListScreen for BranchList {
    type Row = Branch;
    type View = String;

    fn label(&self) -> &'static str {
        "Branch"
    }

    fn collection_path(&self) -> String {
        format!("{INSTITUTIONS_PATH}/{}/branches", self.institution.path_segment())
    }

    fn plural(&self) -> &'static str {
        "branches"
    }

    fn paginated(&self) -> bool {
        false
    }

    fn member_path(&self, id: &EntityId) -> String {
        format!("/admin/branches/{}", id.path_segment())
    }

    fn project(&self, row: &Branch) -> String {
        match row.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => format!("{}, {address}", row.name),
            _ => row.name.clone(),
        }
    }
}

/// Buses of one branch.
#[derive(Debug, Clone)]
pub struct BusList {
    branch: EntityId,
}

impl BusList {
    /// Screen scoped to `branch`.
    pub const fn new(branch: EntityId) -> Self {
        Self { branch }
    }
}

impl ListScreen for BusList {
    type Row = Bus;
    type View = String;

    fn label(&self) -> &'static str {
        "Bus"
    }

    fn collection_path(&self) -> String {
        format!("/admin/branches/{}/buses", self.branch.path_segment())
    }

    fn plural(&self) -> &'static str {
        "buses"
    }

    fn paginated(&self) -> bool {
        false
    }

    fn member_path(&self, id: &EntityId) -> String {
        format!("/admin/buses/{}", id.path_segment())
    }

    fn project(&self, row: &Bus) -> String {
        let seats = row
            .capacity
            .map_or_else(|| format::MISSING.to_owned(), |seats| seats.to_string());
        format!(
            "{} | {seats} seats | {}",
            row.plate,
            format::text(row.driver_name.as_deref())
        )
    }
}

/// Routes of one branch.
#[derive(Debug, Clone)]
pub struct RouteList {
    branch: EntityId,
}

impl RouteList {
    /// Screen scoped to `branch`.
    pub const fn new(branch: EntityId) -> Self {
        Self { branch }
    }
}

impl ListScreen for RouteList {
    type Row = Route;
    type View = String;

    fn label(&self) -> &'static str {
        "Route"
    }

    fn collection_path(&self) -> String {
        format!("/admin/branches/{}/routes", self.branch.path_segment())
    }

    fn plural(&self) -> &'static str {
        "routes"
    }

    fn paginated(&self) -> bool {
        false
    }

    fn member_path(&self, id: &EntityId) -> String {
        format!("/admin/routes/{}", id.path_segment())
    }

    fn project(&self, row: &Route) -> String {
        row.name.clone()
    }
}

/// Stops of one route, in route order.
#[derive(Debug, Clone)]
pub struct StopList {
    route: EntityId,
}

impl StopList {
    /// Screen scoped to `route`.
    pub const fn new(route: EntityId) -> Self {
        Self { route }
    }
}

impl ListScreen for StopList {
    type Row = Stop;
    type View = String;

    fn label(&self) -> &'static str {
        "Stop"
    }

    fn collection_path(&self) -> String {
        format!("/admin/routes/{}/stops", self.route.path_segment())
    }

    fn plural(&self) -> &'static str {
        "stops"
    }

    fn paginated(&self) -> bool {
        false
    }

    fn member_path(&self, id: &EntityId) -> String {
        format!("/admin/stops/{}", id.path_segment())
    }

    fn project(&self, row: &Stop) -> String {
        row.sequence.map_or_else(
            || row.name.clone(),
            |sequence| format!("{sequence}. {}", row.name),
        )
    }
}

/// The whole school hierarchy behind one set of ports.
pub struct SchoolDirectory {
    ports: ControllerPorts,
    institutions: PageController<InstitutionList>,
    branches: ScopedControllers<BranchList>,
    buses: ScopedControllers<BusList>,
    routes: ScopedControllers<RouteList>,
    stops: ScopedControllers<StopList>,
}

impl SchoolDirectory {
    /// Build unmounted controllers. Only institutions are paginated;
    /// `page` is carried by the child controllers but never sent.
    pub fn new(ports: ControllerPorts, page: PageRequest) -> Self {
        let child_page = page.first();
        Self {
            institutions: PageController::new(InstitutionList, ports.clone(), page),
            branches: ScopedControllers::new(ports.clone(), child_page, |id| {
                BranchList::new(id.clone())
            }),
            buses: ScopedControllers::new(ports.clone(), child_page, |id| BusList::new(id.clone())),
            routes: ScopedControllers::new(ports.clone(), child_page, |id| {
                RouteList::new(id.clone())
            }),
            stops: ScopedControllers::new(ports.clone(), child_page, |id| StopList::new(id.clone())),
            ports,
        }
    }

    /// Institutions list.
    pub fn institutions(&self) -> &PageController<InstitutionList> {
        &self.institutions
    }

    /// Branches of `institution`.
    pub fn branches(&self, institution: &EntityId) -> PageController<BranchList> {
        self.branches.for_parent(institution)
    }

    /// Buses of `branch`.
    pub fn buses(&self, branch: &EntityId) -> PageController<BusList> {
        self.buses.for_parent(branch)
    }

    /// Routes of `branch`.
    pub fn routes(&self, branch: &EntityId) -> PageController<RouteList> {
        self.routes.for_parent(branch)
    }

    /// Stops of `route`.
    pub fn stops(&self, route: &EntityId) -> PageController<StopList> {
        self.stops.for_parent(route)
    }

    /// Upload a student roster file for `branch`.
    ///
    /// The outcome is reported through the notifier; the counts are also
    /// returned so the caller can show per-row problems.
    ///
    /// # Errors
    ///
    /// Returns the backend failure. An expired session is not toasted.
    pub async fn upload_students(
        &self,
        branch: &EntityId,
        file: FileUpload,
    ) -> Result<RosterImport, DataError> {
        let path = format!("/admin/branches/{}/students/upload", branch.path_segment());
        let request = ApiRequest::upload(InstitutionList.domain(), path, file);
        let outcome = self
            .ports
            .client
            .request(request)
            .await
            .map_err(DataError::from)
            .and_then(|raw| {
                serde_json::from_value::<RosterImport>(raw).map_err(|error| DataError::Network {
                    message: format!("unexpected import summary: {error}"),
                })
            });
        match outcome {
            Ok(import) => {
                info!(%branch, created = import.created, skipped = import.skipped, "roster imported");
                self.ports.notifier.success(&format!(
                    "Imported {} students ({} skipped)",
                    import.created, import.skipped
                ));
                Ok(import)
            }
            Err(error) => {
                warn!(%branch, %error, "roster import failed");
                if !error.is_auth_expired() {
                    self.ports.notifier.error(&error.user_message());
                }
                Err(error)
            }
        }
    }

    /// Unmount every controller in the hierarchy.
    pub fn unmount_all(&self) {
        self.institutions.unmount();
        self.branches.unmount_all();
        self.buses.unmount_all();
        self.routes.unmount_all();
        self.stops.unmount_all();
    }
}

impl std::fmt::Debug for SchoolDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchoolDirectory")
            .field("branch_parents", &self.branches.parents())
            .field("bus_parents", &self.buses.parents())
            .field("route_parents", &self.routes.parents())
            .field("stop_parents", &self.stops.parents())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{HttpMethod, RemoteError, RequestBody};
    use crate::test_support::{Notice, RecordingNotifier, StubRemoteClient, stub_ports};
    use rstest::{fixture, rstest};
    use std::sync::Arc;
    use serde_json::json;

    struct Harness {
        client: Arc<StubRemoteClient>,
        notifier: Arc<RecordingNotifier>,
        directory: SchoolDirectory,
    }

    #[fixture]
    fn harness() -> Harness {
        let client = StubRemoteClient::new();
        let notifier = RecordingNotifier::new();
        let directory = SchoolDirectory::new(
            stub_ports(&client, &notifier),
            PageRequest::first_of(10).expect("valid page"),
        );
        Harness {
            client,
            notifier,
            directory,
        }
    }

    fn roster() -> FileUpload {
        FileUpload {
            field: ROSTER_FIELD.to_owned(),
            file_name: "students.csv".to_owned(),
            content_type: Some("text/csv".to_owned()),
            bytes: b"name,grade\nAda,3\n".to_vec(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn child_lists_stay_scoped_to_their_parent(harness: Harness) {
        let Harness {
            client, directory, ..
        } = harness;
        client.reply(
            HttpMethod::Get,
            "/admin/branches/7/routes",
            Ok(json!({ "routes": [{ "id": 1, "name": "Morning A" }] })),
        );
        client.reply(
            HttpMethod::Get,
            "/admin/routes/1/stops",
            Ok(json!([
                { "id": 11, "name": "Gate", "order": 1 },
                { "id": 12, "name": "Market", "order": 2 }
            ])),
        );

        directory.routes(&EntityId::from(7)).mount().await;
        directory.stops(&EntityId::from(1)).mount().await;

        assert_eq!(directory.routes(&EntityId::from(7)).view_rows(), ["Morning A"]);
        assert_eq!(
            directory.stops(&EntityId::from(1)).view_rows(),
            ["1. Gate", "2. Market"]
        );
        assert!(directory.routes(&EntityId::from(8)).snapshot().items.is_empty());
        assert_eq!(client.requests().len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn bus_delete_uses_flat_member_path(harness: Harness) {
        let Harness {
            client, directory, ..
        } = harness;
        client.always(HttpMethod::Get, "/admin/branches/3/buses", Ok(json!([])));
        client.reply(HttpMethod::Delete, "/admin/buses/5", Ok(json!(null)));
        let buses = directory.buses(&EntityId::from(3));
        buses.mount().await;

        buses.delete(&EntityId::from(5)).await.expect("deleted");

        assert_eq!(
            client
                .requests_to(HttpMethod::Get, "/admin/branches/3/buses")
                .len(),
            2
        );
    }

    #[rstest]
    #[tokio::test]
    async fn roster_upload_reports_counts(harness: Harness) {
        let Harness {
            client,
            notifier,
            directory,
        } = harness;
        let path = "/admin/branches/4/students/upload";
        client.reply(HttpMethod::Post, path, Ok(json!({ "created": 12, "skipped": 2 })));

        let import = directory
            .upload_students(&EntityId::from(4), roster())
            .await
            .expect("import succeeds");

        assert_eq!(import.created, 12);
        let sent = client.requests_to(HttpMethod::Post, path);
        assert!(matches!(sent[0].body, Some(RequestBody::File(_))));
        assert_eq!(
            notifier.notices(),
            [Notice::Success("Imported 12 students (2 skipped)".into())]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn rejected_roster_is_toasted_verbatim(harness: Harness) {
        let Harness {
            client,
            notifier,
            directory,
        } = harness;
        client.reply(
            HttpMethod::Post,
            "/admin/branches/4/students/upload",
            Err(RemoteError::Rejected {
                status: 400,
                message: Some("Missing column: grade".into()),
            }),
        );

        let error = directory
            .upload_students(&EntityId::from(4), roster())
            .await
            .expect_err("rejected");

        assert!(matches!(error, DataError::Validation { .. }));
        assert_eq!(
            notifier.notices(),
            [Notice::Error("Missing column: grade".into())]
        );
    }

    #[rstest]
    fn institution_projection_counts_branches() {
        let row: Institution = serde_json::from_value(json!({
            "id": 1, "name": "Greenfield", "branchCount": 3
        }))
        .expect("row decodes");
        assert_eq!(InstitutionList.project(&row), "Greenfield (3 branches)");
    }
}

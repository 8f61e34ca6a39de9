//! Create, update and delete followed by a refetch of the current key.

use serde_json::Value;
use tracing::{debug, info};

use super::{ListScreen, PageController};
use crate::domain::ports::ApiRequest;
use crate::domain::{DataError, EntityId};

impl<S: ListScreen> PageController<S> {
    /// `POST` to the collection endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MutationBlocked`] while an earlier failure is
    /// unacknowledged, otherwise the backend failure.
    pub async fn create(&self, body: Value) -> Result<Value, DataError> {
        let screen = self.screen();
        let request = ApiRequest::post(screen.domain(), screen.collection_path(), body);
        self.perform(request, &format!("{} created", screen.label()))
            .await
    }

    /// `PUT` to a member endpoint.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`].
    pub async fn update(&self, id: &EntityId, body: Value) -> Result<Value, DataError> {
        let screen = self.screen();
        let request = ApiRequest::put(screen.domain(), screen.member_path(id), body);
        self.perform(request, &format!("{} updated", screen.label()))
            .await
    }

    /// `DELETE` a member. The row stays visible until the refetch lands.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`].
    pub async fn delete(&self, id: &EntityId) -> Result<(), DataError> {
        let screen = self.screen();
        let request = ApiRequest::delete(screen.domain(), screen.member_path(id));
        self.perform(request, &format!("{} deleted", screen.label()))
            .await
            .map(drop)
    }

    /// Issue any write scoped to this screen, such as an upload or a status
    /// action, under the same notify-then-refetch rules.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`].
    pub async fn perform(&self, request: ApiRequest, success: &str) -> Result<Value, DataError> {
        if self.inner.lock().mutations_blocked {
            return Err(DataError::MutationBlocked);
        }
        let label = self.screen().label();
        let method = request.method;
        let result = self.inner.ports.client.request(request).await;

        if !self.inner.liveness.is_alive() {
            debug!(screen = label, %method, "mutation finished after unmount");
            return result.map_err(DataError::from);
        }

        match result {
            Ok(body) => {
                info!(screen = label, %method, "mutation succeeded");
                self.inner.ports.notifier.success(success);
                self.refresh().await;
                Ok(body)
            }
            Err(error) => {
                let error = DataError::from(error);
                if !error.is_auth_expired() {
                    self.inner.lock().mutations_blocked = true;
                    self.inner.ports.notifier.error(&error.user_message());
                }
                Err(error)
            }
        }
    }
}

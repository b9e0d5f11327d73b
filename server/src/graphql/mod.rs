mod me;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, InputObject, Object, Schema};
use entity::PhotoPayload;
use platform_api::{ApiError, ExtendApiResult};
use products_hr::{
    AnalyticsView, Dashboard, EmployeeDetail, FilterCriteria, PhotoFilter, PhotoResult,
};
use tracing::instrument;

use crate::{
    portal::{CameraStatus, CaptureOutcome, Portal, RequestSession},
    store::StoreStatus,
};

use me::MePayload;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(portal: Arc<Portal>) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(portal)
        .finish()
}

/// SDL for `schema:print`; needs no runtime state.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .finish()
        .sdl()
}

fn portal<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<Portal>> {
    ctx.data::<Arc<Portal>>()
        .map_err(|_| platform_api::internal_error(anyhow::anyhow!("portal state missing")))
}

fn session<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a RequestSession> {
    ctx.data::<RequestSession>()
        .map_err(|_| ApiError::Unauthorized.extend())
}

fn frame(data_url: &str) -> async_graphql::Result<PhotoPayload> {
    PhotoPayload::from_data_url(data_url).extend_err()
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct FilterInput {
    pub query: Option<String>,
    pub location: Option<String>,
    pub role: Option<String>,
    pub photo: Option<PhotoFilter>,
}

impl From<FilterInput> for FilterCriteria {
    fn from(input: FilterInput) -> Self {
        let defaults = FilterCriteria::default();
        Self {
            query: input.query.unwrap_or(defaults.query),
            location: input.location.unwrap_or(defaults.location),
            role: input.role.unwrap_or(defaults.role),
            photo: input.photo.unwrap_or(defaults.photo),
        }
    }
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.me", skip_all)]
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        Ok(MePayload::from_session(session(ctx)?))
    }

    #[instrument(name = "graphql.store_status", skip_all)]
    async fn store_status(&self, ctx: &Context<'_>) -> async_graphql::Result<StoreStatus> {
        Ok(portal(ctx)?.store_status().await)
    }

    #[instrument(name = "graphql.dashboard", skip_all)]
    async fn dashboard(
        &self,
        ctx: &Context<'_>,
        filter: Option<FilterInput>,
    ) -> async_graphql::Result<Dashboard> {
        let criteria = FilterCriteria::from(filter.unwrap_or_default());
        portal(ctx)?
            .dashboard(session(ctx)?, &criteria)
            .await
            .extend_err()
    }

    #[instrument(name = "graphql.employee", skip_all, fields(id = id))]
    async fn employee(&self, ctx: &Context<'_>, id: usize) -> async_graphql::Result<EmployeeDetail> {
        portal(ctx)?.employee(session(ctx)?, id).await.extend_err()
    }

    #[instrument(name = "graphql.analytics", skip_all)]
    async fn analytics(&self, ctx: &Context<'_>) -> async_graphql::Result<AnalyticsView> {
        Ok(portal(ctx)?.analytics().await)
    }

    #[instrument(name = "graphql.photo_result", skip_all)]
    async fn photo_result(&self, ctx: &Context<'_>) -> async_graphql::Result<PhotoResult> {
        portal(ctx)?.photo_result(session(ctx)?).await.extend_err()
    }

    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    #[instrument(name = "graphql.refresh_employees", skip_all)]
    async fn refresh_employees(&self, ctx: &Context<'_>) -> async_graphql::Result<StoreStatus> {
        Ok(portal(ctx)?.refresh().await)
    }

    #[instrument(name = "graphql.upload_photo", skip_all, fields(employee_id = employee_id))]
    async fn upload_photo(
        &self,
        ctx: &Context<'_>,
        employee_id: usize,
        data_url: String,
    ) -> async_graphql::Result<PhotoResult> {
        let photo = frame(&data_url)?;
        portal(ctx)?
            .upload_photo(session(ctx)?, employee_id, photo)
            .await
            .extend_err()
    }

    #[instrument(name = "graphql.start_camera", skip_all, fields(employee_id = employee_id))]
    async fn start_camera(
        &self,
        ctx: &Context<'_>,
        employee_id: usize,
    ) -> async_graphql::Result<CameraStatus> {
        portal(ctx)?
            .start_camera(session(ctx)?, employee_id)
            .await
            .extend_err()
    }

    /// Relay one preview frame from the client camera, as a data URL.
    #[instrument(name = "graphql.push_frame", skip_all)]
    async fn push_frame(
        &self,
        ctx: &Context<'_>,
        data_url: String,
    ) -> async_graphql::Result<CameraStatus> {
        let photo = frame(&data_url)?;
        portal(ctx)?
            .push_frame(session(ctx)?, photo)
            .await
            .extend_err()
    }

    #[instrument(name = "graphql.capture_photo", skip_all)]
    async fn capture_photo(&self, ctx: &Context<'_>) -> async_graphql::Result<CaptureOutcome> {
        portal(ctx)?.capture_photo(session(ctx)?).await.extend_err()
    }

    #[instrument(name = "graphql.stop_camera", skip_all)]
    async fn stop_camera(&self, ctx: &Context<'_>) -> async_graphql::Result<CameraStatus> {
        portal(ctx)?.stop_camera(session(ctx)?).await.extend_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::testing::{loaded_portal, signed_in};
    use async_graphql::{Request, Response, Value};
    use entity::Role;
    use serde_json::json;

    async fn run(query: &str, as_role: Option<Role>) -> Response {
        let portal = loaded_portal().await;
        let schema = build_schema(portal.clone());
        let mut request = Request::new(query);
        if let Some(role) = as_role {
            request = request.data(signed_in(&portal, role).await);
        }
        schema.execute(request).await
    }

    fn first_code(response: &Response) -> Option<Value> {
        response.errors.first()?.extensions.as_ref()?.get("code").cloned()
    }

    #[tokio::test]
    async fn me_lists_navigation() {
        let response = run("{ me { name roleLabel nav { to label } } }", Some(Role::Hr)).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(body["me"]["name"], json!("test"));
        assert_eq!(body["me"]["roleLabel"], json!("HR"));
        assert_eq!(
            body["me"]["nav"],
            json!([
                {"to": "/list", "label": "Dashboard"},
                {"to": "/analytics", "label": "Analytics"},
                {"to": "/photo-result", "label": "Photo"}
            ])
        );
    }

    #[tokio::test]
    async fn dashboard_applies_filter() {
        let response = run(
            r#"{ dashboard(filter: { query: "tokyo" }) { total showing candidates { id name } } }"#,
            Some(Role::Employee),
        )
        .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(body["dashboard"]["total"], json!(5));
        assert_eq!(body["dashboard"]["showing"], json!(2));
        assert_eq!(
            body["dashboard"]["candidates"][0],
            json!({"id": 1, "name": "Garrett Winters"})
        );
    }

    #[tokio::test]
    async fn missing_session_is_unauthorized() {
        let response = run("{ me { name } }", None).await;
        assert_eq!(first_code(&response), Some(Value::from("UNAUTHORIZED")));
    }

    #[tokio::test]
    async fn unknown_employee_reports_not_found() {
        let response = run("{ employee(id: 42) { info { name } } }", Some(Role::Hr)).await;
        assert_eq!(first_code(&response), Some(Value::from("NOT_FOUND")));
    }

    #[tokio::test]
    async fn upload_rejects_non_image_payloads() {
        let response = run(
            r#"mutation { uploadPhoto(employeeId: 0, dataUrl: "data:text/plain;base64,aGk=") { message } }"#,
            Some(Role::Hr),
        )
        .await;
        assert_eq!(first_code(&response), Some(Value::from("INVALID_INPUT")));
    }

    #[tokio::test]
    async fn capture_while_idle_is_invalid_input() {
        let response = run("mutation { capturePhoto { camera { streaming } } }", Some(Role::Hr)).await;
        assert_eq!(first_code(&response), Some(Value::from("INVALID_INPUT")));
    }

    #[tokio::test]
    async fn store_status_reports_ready() {
        let response = run("{ storeStatus { status loading rows } }", Some(Role::Hr)).await;
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body["storeStatus"],
            json!({"status": "READY", "loading": false, "rows": 5})
        );
    }

    #[test]
    fn sdl_names_every_root_field() {
        let sdl = schema_sdl();
        for field in [
            "storeStatus",
            "photoResult",
            "refreshEmployees",
            "uploadPhoto",
            "pushFrame",
            "capturePhoto",
            "stopCamera",
        ] {
            assert!(sdl.contains(field), "missing {field}");
        }
    }
}

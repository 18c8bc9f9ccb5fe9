// handlers/elevated/export.rs - /api/admin/export/:resource?format=csv|xls

use axum::{extract::State, response::Response};

use crate::api::{PathParam, QueryParams};
use crate::error::ApiError;
use crate::handlers::download::{attachment, ExportQuery};
use crate::services::admin_service::{AdminService, UserFilter};
use crate::services::export::ExportResource;
use crate::services::order_service::{OrderFilter, OrderService};
use crate::services::product_service::{ProductFilter, ProductService};
use crate::state::AppState;

/// GET /api/admin/export/:resource - users, orders or products as a spreadsheet
pub async fn get(
    State(state): State<AppState>,
    PathParam(resource): PathParam<String>,
    QueryParams(query): QueryParams<ExportQuery>,
) -> Result<Response, ApiError> {
    let resource: ExportResource = resource
        .parse()
        .map_err(|e: String| ApiError::invalid_field("resource", e))?;
    let format = query.format.unwrap_or_default();

    match resource {
        ExportResource::Users => {
            let rows = AdminService::new(state.pool().clone())
                .export_users(&UserFilter::default())
                .await?;
            attachment(&rows, resource.as_str(), format)
        }
        ExportResource::Orders => {
            let rows = OrderService::new(state.pool().clone(), state.mailer.clone())
                .export_rows(&OrderFilter::default())
                .await?;
            attachment(&rows, resource.as_str(), format)
        }
        ExportResource::Products => {
            let rows = ProductService::new(state.pool().clone())
                .export_rows(&ProductFilter::default())
                .await?;
            attachment(&rows, resource.as_str(), format)
        }
    }
}

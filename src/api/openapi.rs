//! OpenAPI document for the HTTP surface.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{
    AccessResponse, CallbackResponse, PaginationMeta, PurchaseDto, PurchaseListResponse,
    StartKind, StartResponse,
};
use super::extract::ADMIN_TOKEN_HEADER;
use super::handlers::{access, account, admin, purchase, system};
use crate::domain::{Amount, ContentType, PurchaseStatus, RefId, UserId};
use crate::error::{ErrorBody, ErrorResponse};

/// Aggregated API documentation.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        purchase::start_purchase,
        purchase::payment_callback,
        access::check_access,
        account::my_purchases,
        admin::list_purchases,
        admin::get_purchase,
        admin::refund_purchase,
        system::health_handler,
        system::content_types_handler,
    ),
    components(schemas(
        StartKind,
        StartResponse,
        CallbackResponse,
        PurchaseDto,
        PurchaseListResponse,
        PaginationMeta,
        AccessResponse,
        ErrorResponse,
        ErrorBody,
        ContentType,
        PurchaseStatus,
        RefId,
        UserId,
        Amount,
        system::HealthResponse,
        system::ContentTypeInfo,
    )),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Checkout", description = "Start a purchase and settle it on the provider callback"),
        (name = "Access", description = "Content access decisions"),
        (name = "Account", description = "The signed-in caller's purchases"),
        (name = "Admin", description = "Purchase administration"),
        (name = "System", description = "Health and configuration"),
    )
)]
pub struct ApiDoc;

#[derive(Debug)]
struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_TOKEN_HEADER))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_checkout_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/purchase/start/{content_type}/{object_id}"));
        assert!(doc.paths.paths.contains_key("/purchase/callback/{ref_id}"));
        assert!(doc.paths.paths.contains_key("/admin/purchases/{ref_id}/refund"));
    }
}

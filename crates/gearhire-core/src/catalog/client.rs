use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::ApiRequest;
use crate::auth::{AuthError, SessionManager};
use crate::models::{
    Category, CategoryInput, Equipment, EquipmentInput, Subcategory, SubcategoryInput,
};

/// Typed access to the rental catalog.
/// Clone is cheap - the session manager is shared.
#[derive(Clone)]
pub struct CatalogClient {
    session: Arc<SessionManager>,
}

impl CatalogClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    async fn read<T: DeserializeOwned>(&self, path: String) -> Result<T, AuthError> {
        debug!(path = %path, "Fetching catalog data");
        let response = self.session.public_request(ApiRequest::get(path)).await?;
        Ok(response.json()?)
    }

    /// Admin-only call; refused locally before touching the network
    async fn admin_send(&self, request: ApiRequest) -> Result<String, AuthError> {
        if self.session.access_token().is_none() {
            return Err(AuthError::Unauthenticated);
        }
        if !self.session.is_admin() {
            return Err(AuthError::Forbidden);
        }
        let response = self.session.authenticated_request(request).await?;
        Ok(response.body)
    }

    async fn admin_write<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, AuthError> {
        let body = self.admin_send(request).await?;
        serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidResponse(format!("Unexpected response shape: {}", e)))
    }

    // ===== Browsing =====

    pub async fn list_categories(&self) -> Result<Vec<Category>, AuthError> {
        self.read("/categories".to_string()).await
    }

    pub async fn list_subcategories(&self, category_id: i64) -> Result<Vec<Subcategory>, AuthError> {
        self.read(format!("/categories/{}/subcategories", category_id)).await
    }

    pub async fn list_equipment(&self, subcategory_id: i64) -> Result<Vec<Equipment>, AuthError> {
        self.read(format!("/subcategories/{}/equipment", subcategory_id)).await
    }

    pub async fn get_equipment(&self, id: i64) -> Result<Equipment, AuthError> {
        self.read(format!("/equipment/{}", id)).await
    }

    // ===== Categories (admin) =====

    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, AuthError> {
        let category: Category = self
            .admin_write(ApiRequest::post("/categories").json(input)?)
            .await?;
        info!(id = category.id, "Category created");
        Ok(category)
    }

    pub async fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category, AuthError> {
        self.admin_write(ApiRequest::patch(format!("/categories/{}", id)).json(input)?)
            .await
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), AuthError> {
        self.admin_send(ApiRequest::delete(format!("/categories/{}", id)))
            .await?;
        info!(id, "Category deleted");
        Ok(())
    }

    // ===== Subcategories (admin) =====

    pub async fn create_subcategory(&self, input: &SubcategoryInput) -> Result<Subcategory, AuthError> {
        let subcategory: Subcategory = self
            .admin_write(ApiRequest::post("/subcategories").json(input)?)
            .await?;
        info!(id = subcategory.id, category_id = subcategory.category_id, "Subcategory created");
        Ok(subcategory)
    }

    pub async fn update_subcategory(
        &self,
        id: i64,
        input: &SubcategoryInput,
    ) -> Result<Subcategory, AuthError> {
        self.admin_write(ApiRequest::patch(format!("/subcategories/{}", id)).json(input)?)
            .await
    }

    pub async fn delete_subcategory(&self, id: i64) -> Result<(), AuthError> {
        self.admin_send(ApiRequest::delete(format!("/subcategories/{}", id)))
            .await?;
        info!(id, "Subcategory deleted");
        Ok(())
    }

    // ===== Equipment (admin) =====

    pub async fn create_equipment(&self, input: &EquipmentInput) -> Result<Equipment, AuthError> {
        let equipment: Equipment = self
            .admin_write(ApiRequest::post("/equipment").json(input)?)
            .await?;
        info!(id = equipment.id, subcategory_id = equipment.subcategory_id, "Equipment created");
        Ok(equipment)
    }

    pub async fn update_equipment(&self, id: i64, input: &EquipmentInput) -> Result<Equipment, AuthError> {
        self.admin_write(ApiRequest::patch(format!("/equipment/{}", id)).json(input)?)
            .await
    }

    pub async fn delete_equipment(&self, id: i64) -> Result<(), AuthError> {
        self.admin_send(ApiRequest::delete(format!("/equipment/{}", id)))
            .await?;
        info!(id, "Equipment deleted");
        Ok(())
    }
}

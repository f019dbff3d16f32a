use crate::errors::ApiError;
use crate::models::{NewOrganism, NewStrain, Organism, OrganismUpdate, Strain};
use crate::services::ApiClient;

/// Organism and strain catalogue calls. Plain REST, no special contract.
#[derive(Clone, Debug)]
pub struct CepariumService {
    client: ApiClient,
}

impl CepariumService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list_organisms(&self) -> Result<Vec<Organism>, ApiError> {
        self.client.get_json("/api/ceparium/organisms/").await
    }

    pub async fn get_organism(&self, organism_id: i64) -> Result<Organism, ApiError> {
        self.client
            .get_json(&format!("/api/ceparium/organisms/{}", organism_id))
            .await
    }

    pub async fn create_organism(&self, organism: &NewOrganism) -> Result<Organism, ApiError> {
        tracing::info!("Registering organism {} ({} {})", organism.name, organism.genus, organism.species);
        self.client
            .post_json("/api/ceparium/organisms/", organism)
            .await
    }

    pub async fn update_organism(
        &self,
        organism_id: i64,
        changes: &OrganismUpdate,
    ) -> Result<Organism, ApiError> {
        tracing::info!("Updating organism {}", organism_id);
        self.client
            .put_json(&format!("/api/ceparium/organisms/{}", organism_id), changes)
            .await
    }

    pub async fn delete_organism(&self, organism_id: i64) -> Result<Organism, ApiError> {
        tracing::info!("Deleting organism {}", organism_id);
        self.client
            .delete_json(&format!("/api/ceparium/organisms/{}", organism_id))
            .await
    }

    pub async fn strains_of(&self, organism_id: i64) -> Result<Vec<Strain>, ApiError> {
        self.client
            .get_json(&format!("/api/ceparium/organisms/{}/strains", organism_id))
            .await
    }

    pub async fn list_strains(&self) -> Result<Vec<Strain>, ApiError> {
        self.client.get_json("/api/ceparium/strains/").await
    }

    pub async fn get_strain(&self, strain_id: i64) -> Result<Strain, ApiError> {
        self.client
            .get_json(&format!("/api/ceparium/strains/{}", strain_id))
            .await
    }

    pub async fn create_strain(&self, strain: &NewStrain) -> Result<Strain, ApiError> {
        tracing::info!("Creating strain {} under organism {}", strain.strain_name, strain.organism_id);
        self.client
            .post_json("/api/ceparium/strains/", strain)
            .await
    }
}

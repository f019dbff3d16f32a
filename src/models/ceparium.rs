use serde::{Deserialize, Serialize};

use super::AnalysisRecord;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Organism {
    pub id: i64,
    pub name: String,
    pub genus: String,
    pub species: String,
    #[serde(default)]
    pub strains: Vec<Strain>,
}

/// Organism as nested inside a strain (no strain list, avoids the cycle).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrganismRef {
    pub id: i64,
    pub name: String,
    pub genus: String,
    pub species: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Strain {
    pub id: i64,
    pub strain_name: String,
    #[serde(default)]
    pub source: Option<String>,
    pub organism_id: i64,
    #[serde(default)]
    pub organism: Option<OrganismRef>,
    #[serde(default)]
    pub analyses: Vec<AnalysisRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewOrganism {
    pub name: String,
    pub genus: String,
    pub species: String,
}

/// Partial organism edit; only the fields that are set are sent.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct OrganismUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
}

impl OrganismUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.genus.is_none() && self.species.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewStrain {
    pub strain_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub organism_id: i64,
}

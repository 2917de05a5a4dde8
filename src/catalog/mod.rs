//! Region directory and selector resolution.
//!
//! The 27 federal units are compiled in with their IBGE codes; municipality
//! lists are hydrated once at startup (see
//! [`ApsHttpClient::list_municipalities`](crate::fetcher::aps_http::ApsHttpClient::list_municipalities))
//! and the catalog is read-only from then on. Catalog insertion order is the
//! canonical region order for planning and reporting, so repeated runs with
//! the same selector produce identical task sequences.

use serde::{Deserialize, Serialize};

/// IBGE code, two-letter code, and display name for every federal unit.
const BRAZIL_UFS: &[(&str, &str, &str)] = &[
    ("11", "RO", "Rondônia"),
    ("12", "AC", "Acre"),
    ("13", "AM", "Amazonas"),
    ("14", "RR", "Roraima"),
    ("15", "PA", "Pará"),
    ("16", "AP", "Amapá"),
    ("17", "TO", "Tocantins"),
    ("21", "MA", "Maranhão"),
    ("22", "PI", "Piauí"),
    ("23", "CE", "Ceará"),
    ("24", "RN", "Rio Grande do Norte"),
    ("25", "PB", "Paraíba"),
    ("26", "PE", "Pernambuco"),
    ("27", "AL", "Alagoas"),
    ("28", "SE", "Sergipe"),
    ("29", "BA", "Bahia"),
    ("31", "MG", "Minas Gerais"),
    ("32", "ES", "Espírito Santo"),
    ("33", "RJ", "Rio de Janeiro"),
    ("35", "SP", "São Paulo"),
    ("41", "PR", "Paraná"),
    ("42", "SC", "Santa Catarina"),
    ("43", "RS", "Rio Grande do Sul"),
    ("50", "MS", "Mato Grosso do Sul"),
    ("51", "MT", "Mato Grosso"),
    ("52", "GO", "Goiás"),
    ("53", "DF", "Distrito Federal"),
];

/// Catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// One or more requested region codes are not in the directory
    #[error("unknown region code(s): {0}")]
    UnknownRegion(String),

    /// The same region code appears more than once in a selector
    #[error("duplicate region code {0} in selector")]
    DuplicateRegion(String),

    /// The selector names no regions at all
    #[error("empty region selector")]
    EmptySelector,
}

/// A municipality within a federal unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    /// IBGE municipality code
    pub ibge_code: String,
    /// Municipality display name
    pub name: String,
}

/// A federal unit with its municipality list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Two-letter code (e.g. "PE")
    pub code: String,
    /// IBGE code used in remote requests (e.g. "26")
    pub ibge_code: String,
    /// Display name (e.g. "Pernambuco")
    pub name: String,
    /// Municipalities, name-sorted as returned by the directory service
    pub municipalities: Vec<Municipality>,
}

impl Region {
    /// Number of municipalities known for this region.
    pub fn municipality_count(&self) -> usize {
        self.municipalities.len()
    }
}

/// Which regions a collection run should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSelector {
    /// Every region in the catalog
    All,
    /// An explicit set of two-letter codes
    Codes(Vec<String>),
}

impl RegionSelector {
    /// Parse a selector from CLI input: `"ALL"` (case-insensitive) or a
    /// comma-separated list of two-letter codes. Repeating a code is
    /// rejected rather than deduplicated, so an overlapping request is
    /// surfaced to the caller instead of silently collapsed.
    pub fn parse(input: &str) -> Result<Self, CatalogError> {
        if input.trim().eq_ignore_ascii_case("all") {
            return Ok(RegionSelector::All);
        }
        let mut codes: Vec<String> = Vec::new();
        for raw in input.split(',') {
            let code = raw.trim().to_ascii_uppercase();
            if code.is_empty() {
                continue;
            }
            if codes.contains(&code) {
                return Err(CatalogError::DuplicateRegion(code));
            }
            codes.push(code);
        }
        if codes.is_empty() {
            return Err(CatalogError::EmptySelector);
        }
        Ok(RegionSelector::Codes(codes))
    }
}

/// Static directory of regions, fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    regions: Vec<Region>,
}

impl RegionCatalog {
    /// Catalog of all 27 federal units, without municipality lists.
    pub fn builtin() -> Self {
        let regions = BRAZIL_UFS
            .iter()
            .map(|(ibge, code, name)| Region {
                code: (*code).to_string(),
                ibge_code: (*ibge).to_string(),
                name: (*name).to_string(),
                municipalities: Vec::new(),
            })
            .collect();
        Self { regions }
    }

    /// Build a catalog from explicit regions (used by tests and embedders).
    pub fn from_regions(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// All regions in catalog order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Look up a region by its two-letter code.
    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.code == code)
    }

    /// Attach the municipality list for one region. Intended for the
    /// startup hydration pass only; the catalog is read-only afterwards.
    pub fn set_municipalities(
        &mut self,
        code: &str,
        municipalities: Vec<Municipality>,
    ) -> Result<(), CatalogError> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.code == code)
            .ok_or_else(|| CatalogError::UnknownRegion(code.to_string()))?;
        region.municipalities = municipalities;
        Ok(())
    }

    /// Resolve a selector to regions in catalog order.
    ///
    /// Every explicit code must exist; unknown codes are reported together
    /// so a typo surfaces before any network activity.
    pub fn resolve(&self, selector: &RegionSelector) -> Result<Vec<&Region>, CatalogError> {
        match selector {
            RegionSelector::All => Ok(self.regions.iter().collect()),
            RegionSelector::Codes(codes) => {
                let unknown: Vec<&str> = codes
                    .iter()
                    .filter(|code| self.region(code).is_none())
                    .map(String::as_str)
                    .collect();
                if !unknown.is_empty() {
                    return Err(CatalogError::UnknownRegion(unknown.join(", ")));
                }
                // Catalog order, not selector order, keeps task sequences
                // reproducible across differently-written selectors.
                Ok(self
                    .regions
                    .iter()
                    .filter(|r| codes.contains(&r.code))
                    .collect())
            }
        }
    }
}

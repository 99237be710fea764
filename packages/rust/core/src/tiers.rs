//! Tier catalog: ordered search scopes from most to least trusted.

use hazfill_shared::{HazfillError, Result, TiersConfig};

/// Maximum domains forwarded to the search backend for one tier.
pub const MAX_DOMAINS_PER_TIER: usize = 10;

pub const SUPPLIERS: &str = "suppliers";
pub const STANDARDS: &str = "standards";
pub const REGULATORY: &str = "regulatory";
pub const OPEN_WEB: &str = "open_web";

/// A named search scope. `domains == None` means unrestricted search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub name: String,
    pub domains: Option<Vec<String>>,
}

impl Tier {
    pub fn restricted(name: impl Into<String>, domains: Vec<String>) -> Self {
        Self {
            name: name.into(),
            domains: Some(domains),
        }
    }

    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domains: None,
        }
    }

    /// Domain filter for the search call, capped at [`MAX_DOMAINS_PER_TIER`].
    /// An empty domain list searches unrestricted.
    pub fn search_domains(&self) -> Option<&[String]> {
        self.domains
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| &d[..d.len().min(MAX_DOMAINS_PER_TIER)])
    }
}

/// Ordered tiers; the last one is always unrestricted.
#[derive(Debug, Clone)]
pub struct TierCatalog {
    tiers: Vec<Tier>,
}

impl TierCatalog {
    /// Build the standard four-tier catalog from configured domain lists.
    pub fn from_config(config: &TiersConfig) -> Self {
        Self {
            tiers: vec![
                Tier::restricted(SUPPLIERS, config.suppliers.clone()),
                Tier::restricted(STANDARDS, config.standards.clone()),
                Tier::restricted(REGULATORY, config.regulatory.clone()),
                Tier::open(OPEN_WEB),
            ],
        }
    }

    /// Build a catalog from explicit tiers.
    ///
    /// Fails if `tiers` is empty or does not end with an unrestricted tier.
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        match tiers.last() {
            None => Err(HazfillError::config("tier catalog is empty")),
            Some(last) if last.domains.is_some() => Err(HazfillError::config(format!(
                "last tier `{}` must be unrestricted",
                last.name
            ))),
            Some(_) => Ok(Self { tiers }),
        }
    }

    pub fn tiers_in_order(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn get(&self, index: usize) -> Option<&Tier> {
        self.tiers.get(index)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Index of the last tier consulted in phase 1.
    ///
    /// Without open-web fallback the trailing unrestricted tier is skipped.
    pub fn last_index(&self, open_web_fallback: bool) -> usize {
        let last = self.tiers.len().saturating_sub(1);
        if open_web_fallback {
            last
        } else {
            last.saturating_sub(1)
        }
    }

    /// Domains of the named tier; empty for unknown or unrestricted tiers.
    fn domains_of(&self, name: &str) -> &[String] {
        self.tiers
            .iter()
            .find(|t| t.name == name)
            .and_then(|t| t.domains.as_deref())
            .unwrap_or_default()
    }

    /// Every restricted tier's domains in catalog order; first occurrence wins.
    pub fn all_trusted_domains(&self) -> Vec<String> {
        let pools: Vec<&[String]> = self
            .tiers
            .iter()
            .filter_map(|t| t.domains.as_deref())
            .collect();
        merge_pools(&pools)
    }

    /// Domain pool prioritized for the kind of data `field` holds.
    pub fn domains_for_field(&self, field: &str) -> Vec<String> {
        let suppliers = self.domains_of(SUPPLIERS);
        match FieldCategory::of(field) {
            FieldCategory::Physical => merge_pools(&[suppliers, self.domains_of(STANDARDS)]),
            FieldCategory::Safety => merge_pools(&[self.domains_of(STANDARDS), suppliers]),
            FieldCategory::Facility => merge_pools(&[self.domains_of(REGULATORY), suppliers]),
            FieldCategory::Other => self.all_trusted_domains(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldCategory {
    Physical,
    Safety,
    Facility,
    Other,
}

impl FieldCategory {
    fn of(field: &str) -> Self {
        match field {
            "cas_number" | "boiling_point_c" | "freeze_melt_point_c" | "flash_point"
            | "vapor_pressure_bar" | "viscosity_cp" | "specific_gravity" | "appearance"
            | "physical_form" | "ph_value" => Self::Physical,
            "hazardous_chemical" | "hazard_class" | "flammability" | "reactivity" | "special"
            | "ghs05_corrosive" | "ghs08_harmful_health" | "ghs07_harmful"
            | "ghs04_compressed" | "ghs09_environmental" | "ghs03_oxidizing"
            | "ghs06_toxic" | "ghs02_flammable" | "ghs01_explosive" | "hazardous_statement"
            | "fire_extinguishing_media" => Self::Safety,
            "exhausted_enclosure" | "coaxal_line_dc" | "gas_detection_gds" | "lss_shutdown"
            | "design_specialities" | "exhaust_dispense" | "exhaust_distribution"
            | "purge_vent" | "purge_panel_dispense" | "purge_panel_distribution"
            | "gb_fire_code_class" => Self::Facility,
            _ => Self::Other,
        }
    }
}

fn merge_pools(pools: &[&[String]]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for domain in pools.iter().flat_map(|p| p.iter()) {
        if !merged.contains(domain) {
            merged.push(domain.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TierCatalog {
        TierCatalog::from_config(&TiersConfig::default())
    }

    #[test]
    fn default_order_ends_open() {
        let cat = catalog();
        let names: Vec<_> = cat.tiers_in_order().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![SUPPLIERS, STANDARDS, REGULATORY, OPEN_WEB]);
        assert!(cat.get(3).unwrap().search_domains().is_none());
    }

    #[test]
    fn last_index_depends_on_fallback() {
        let cat = catalog();
        assert_eq!(cat.last_index(true), 3);
        assert_eq!(cat.last_index(false), 2);
    }

    #[test]
    fn domains_capped_in_order() {
        let domains: Vec<String> = (0..14).map(|i| format!("d{i}.example")).collect();
        let tier = Tier::restricted("big", domains);
        let capped = tier.search_domains().unwrap();
        assert_eq!(capped.len(), MAX_DOMAINS_PER_TIER);
        assert_eq!(capped[0], "d0.example");
        assert_eq!(capped[9], "d9.example");
        assert!(Tier::restricted("none", vec![]).search_domains().is_none());
    }

    #[test]
    fn explicit_catalog_must_end_open() {
        assert!(TierCatalog::new(vec![]).is_err());
        assert!(TierCatalog::new(vec![Tier::restricted("a", vec!["x.com".into()])]).is_err());
        let cat = TierCatalog::new(vec![Tier::restricted("a", vec![]), Tier::open("b")]).unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.last_index(false), 0);
    }

    #[test]
    fn trusted_pool_deduplicates_in_priority_order() {
        let pool = catalog().all_trusted_domains();
        assert_eq!(pool.first().map(String::as_str), Some("airliquide.com"));
        assert_eq!(pool.iter().filter(|d| *d == "nfpa.org").count(), 1);
        let osha = pool.iter().position(|d| d == "osha.gov").unwrap();
        let praxair = pool.iter().position(|d| d == "praxair.com").unwrap();
        assert!(praxair < osha);
    }

    #[test]
    fn field_pools_follow_category() {
        let cat = catalog();
        assert_eq!(cat.domains_for_field("boiling_point_c")[0], "airliquide.com");
        assert_eq!(cat.domains_for_field("ghs06_toxic")[0], "osha.gov");
        assert_eq!(cat.domains_for_field("purge_vent")[0], "iccsafe.org");
        assert_eq!(cat.domains_for_field("row_index"), cat.all_trusted_domains());
    }
}

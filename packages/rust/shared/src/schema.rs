//! The HMIS chemical gas table schema.
//!
//! Each table column maps to one normalized field name plus a human
//! description used when prompting the extraction model.

/// One column of the HMIS table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Zero-based column position in the source table.
    pub column: usize,
    /// Normalized field name.
    pub name: &'static str,
    /// Human-readable description for prompts.
    pub description: &'static str,
}

const fn field(column: usize, name: &'static str, description: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        column,
        name,
        description,
    }
}

/// All HMIS fields in declaration (column) order.
pub const FIELDS: &[FieldDescriptor] = &[
    field(0, "row_index", "Row number"),
    field(1, "sub_system_filter_formula", "Sub-system filter list (chemical formula)"),
    field(2, "chemical_name", "Chemical name"),
    field(3, "sub_system_formula_2", "Sub-system chemical formula (alternate)"),
    field(4, "source_location_typ", "Source location (typical)"),
    field(5, "concentration", "Concentration"),
    field(6, "cas_number", "CAS registry number"),
    field(7, "hazardous_chemical", "Hazardous chemical (Y/N or classification)"),
    field(8, "hazard_class", "Hazard class"),
    field(9, "flammability", "Flammability rating"),
    field(10, "reactivity", "Reactivity rating"),
    field(11, "special", "Special hazards"),
    field(12, "other", "Other hazards"),
    field(13, "typ_rfo_id_in", "Typical RFO (ID in.)"),
    field(14, "exhausted_enclosure", "Exhausted enclosure requirement"),
    field(15, "coaxal_line_dc", "Coaxal line (DC)"),
    field(16, "gas_detection_gds", "Gas detection (GDS)"),
    field(17, "lss_shutdown", "LSS shutdown"),
    field(
        18,
        "physical_form",
        "Physical form: Compressed Gas (CG) / Liquefied Gas (LG)",
    ),
    field(19, "design_specialities", "Design specialities"),
    field(20, "fire_extinguishing_media", "Fire extinguishing media"),
    field(21, "appearance", "Appearance"),
    field(
        22,
        "vapor_pressure_bar",
        "Vapor pressure (bar); H2O = 0.023 bar @ 20°C",
    ),
    field(23, "viscosity_cp", "Viscosity (cP); H2O = 1 @ 20°C"),
    field(24, "specific_gravity", "Specific gravity; H2O = 1 @ 4°C"),
    field(25, "boiling_point_c", "Boiling point (°C)"),
    field(26, "freeze_melt_point_c", "Freezing / melting point (°C)"),
    field(27, "flash_point", "Flash point"),
    field(28, "ph_value", "pH value"),
    field(29, "ghs05_corrosive", "GHS05 Corrosive"),
    field(30, "ghs08_harmful_health", "GHS08 Harmful for health"),
    field(31, "ghs07_harmful", "GHS07 Harmful"),
    field(32, "ghs04_compressed", "GHS04 Compressed gas"),
    field(33, "ghs09_environmental", "GHS09 Dangerous for environment"),
    field(34, "ghs03_oxidizing", "GHS03 Oxidizing"),
    field(35, "ghs06_toxic", "GHS06 Toxic"),
    field(36, "ghs02_flammable", "GHS02 Flammable"),
    field(37, "ghs01_explosive", "GHS01 Explosive"),
    field(38, "hazardous_statement", "Hazardous statement (H-phrase)"),
    field(39, "exhaust_dispense", "Exhaust dispense"),
    field(40, "exhaust_distribution", "Exhaust distribution"),
    field(41, "purge_vent", "Purge vent"),
    field(42, "purge_panel_dispense", "Purge panel dispense"),
    field(43, "purge_panel_distribution", "Purge panel distribution"),
    field(44, "non_hpm", "NON HPM"),
    field(45, "gb_fire_code_class", "(GB) Fire code class"),
    field(46, "col_46", "Reserved column"),
];

/// Number of fields in the schema.
pub const FIELD_COUNT: usize = FIELDS.len();

/// Position of `name` within [`FIELDS`].
pub fn field_index(name: &str) -> Option<usize> {
    FIELDS.iter().position(|f| f.name == name)
}

/// Look up a field descriptor by name.
pub fn lookup(name: &str) -> Option<&'static FieldDescriptor> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Look up the field mapped to a table column.
pub fn field_at_column(column: usize) -> Option<&'static FieldDescriptor> {
    FIELDS.iter().find(|f| f.column == column)
}

/// Highest column index covered by the schema.
pub fn max_column() -> usize {
    FIELDS.iter().map(|f| f.column).max().unwrap_or(0)
}

/// Prompt description for `name`, falling back to the name itself.
pub fn description(name: &str) -> &str {
    lookup(name).map(|f| f.description).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_dense_and_ordered() {
        for (i, f) in FIELDS.iter().enumerate() {
            assert_eq!(f.column, i, "field {} out of order", f.name);
        }
        assert_eq!(FIELD_COUNT, 47);
        assert_eq!(max_column(), 46);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = FIELDS.iter().map(|f| f.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELD_COUNT);
    }

    #[test]
    fn lookups() {
        assert_eq!(field_index("cas_number"), Some(6));
        assert_eq!(field_at_column(2).map(|f| f.name), Some("chemical_name"));
        assert!(lookup("colour").is_none());
        assert_eq!(description("hazard_class"), "Hazard class");
        assert_eq!(description("not_a_field"), "not_a_field");
    }
}

//! Data-point identifiers read directly by the profile assembler.
//!
//! Table rows (treatment, efficacy, resistance), policies and charts name
//! their identifiers in [`crate::config::ProfileConfig`] instead.

// Population
pub const POP_TOTAL: &str = "POP_TOTAL";
pub const POP_HIGH_TRANSMISSION: &str = "POP_HIGH_TRANSMISSION";
pub const POP_LOW_TRANSMISSION: &str = "POP_LOW_TRANSMISSION";
pub const POP_MALARIA_FREE: &str = "POP_MALARIA_FREE";

// Parasites and vectors
pub const PAR_FALCIPARUM_PCT: &str = "PAR_FALCIPARUM_PCT";
pub const PAR_VIVAX_PCT: &str = "PAR_VIVAX_PCT";
pub const PAR_OTHER_PCT: &str = "PAR_OTHER_PCT";
pub const SPECIES_MAJOR_PARASITE: &str = "SPECIES_MAJOR_PARASITE";
pub const VECTOR_SPECIES_PRIMARY: &str = "VECTOR_SPECIES_PRIMARY";
pub const VECTOR_SPECIES_SECONDARY: &str = "VECTOR_SPECIES_SECONDARY";
pub const VECTOR_SPECIES_TERTIARY: &str = "VECTOR_SPECIES_TERTIARY";

// Cases and deaths
pub const DISPLAY_MODE: &str = "DISPLAY_MODE";
pub const CASES_CONFIRMED_TOTAL: &str = "CASES_CONFIRMED_TOTAL";
pub const CASES_CONFIRMED_FALCIPARUM: &str = "CASES_CONFIRMED_FALCIPARUM";
pub const CASES_CONFIRMED_VIVAX: &str = "CASES_CONFIRMED_VIVAX";
pub const CASES_PRESUMED: &str = "CASES_PRESUMED";
pub const CASES_INDIGENOUS_TOTAL: &str = "CASES_INDIGENOUS_TOTAL";
pub const CASES_INDIGENOUS_FALCIPARUM: &str = "CASES_INDIGENOUS_FALCIPARUM";
pub const CASES_INDIGENOUS_VIVAX: &str = "CASES_INDIGENOUS_VIVAX";
pub const CASES_IMPORTED: &str = "CASES_IMPORTED";
pub const DEATHS_REPORTED: &str = "DEATHS_REPORTED";
pub const FOOTNOTE_CASES: &str = "FOOTNOTE_CASES";

// WHO estimates
pub const EST_CASES: &str = "EST_CASES";
pub const EST_CASES_LOWER: &str = "EST_CASES_LOWER";
pub const EST_CASES_UPPER: &str = "EST_CASES_UPPER";
pub const EST_DEATHS: &str = "EST_DEATHS";
pub const EST_DEATHS_LOWER: &str = "EST_DEATHS_LOWER";
pub const EST_DEATHS_UPPER: &str = "EST_DEATHS_UPPER";

// Diagnostics
pub const RDT_TYPE: &str = "RDT_TYPE";

// Funding (chart only)
pub const FUND_DOMESTIC: &str = "FUND_DOMESTIC";
pub const FUND_GLOBAL_FUND: &str = "FUND_GLOBAL_FUND";
pub const FUND_PMI_USAID: &str = "FUND_PMI_USAID";
pub const FUND_WORLD_BANK: &str = "FUND_WORLD_BANK";
pub const FUND_OTHER: &str = "FUND_OTHER";

/// Text identifiers the assembler reads by name.
pub const ASSEMBLER_TEXT_IDENTIFIERS: &[&str] = &[
    SPECIES_MAJOR_PARASITE,
    VECTOR_SPECIES_PRIMARY,
    VECTOR_SPECIES_SECONDARY,
    VECTOR_SPECIES_TERTIARY,
    FOOTNOTE_CASES,
    RDT_TYPE,
];

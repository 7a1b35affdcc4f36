//! Built-in configuration for the malaria country profile.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    ChartDefinition, ChartLine, CountryLists, DuplicatePolicy, EfficacySlot, ProfileConfig,
    QueryGroup, ResistanceSlot, SpeciesLookup, TreatmentSlot,
};
use crate::ids::*;
use crate::models::{PolicyDefinition, PolicyInterpretation};
use crate::pipeline::TransformRule::{Cut100, MultiplyBy100, NullZeros};

/// Option list holding parasite and vector species names.
pub const SPECIES_OPTION_LIST: &str = "MAL_SPECIES";

/// Free-text values of the monotherapy-sale policy that count as implemented.
pub const MONOTHERAPY_ACCEPTED: &[&str] = &["has never been allowed", "is banned"];

pub(super) fn builtin_config() -> ProfileConfig {
    let policies = default_policies();
    let treatment = default_treatment();
    let efficacy = default_efficacy();
    let resistance = default_resistance();
    let species = SpeciesLookup {
        list_id: SPECIES_OPTION_LIST.to_string(),
        parasite: SPECIES_MAJOR_PARASITE.to_string(),
        vectors: vec![
            VECTOR_SPECIES_PRIMARY.to_string(),
            VECTOR_SPECIES_SECONDARY.to_string(),
            VECTOR_SPECIES_TERTIARY.to_string(),
        ],
    };

    let mut text_identifiers: BTreeSet<String> =
        ASSEMBLER_TEXT_IDENTIFIERS.iter().map(|s| s.to_string()).collect();
    text_identifiers.extend(policies.iter().map(|p| p.yes_no_identifier.clone()));
    text_identifiers.extend(treatment.iter().map(|t| t.medicine.clone()));
    for slot in &efficacy {
        text_identifiers.insert(slot.medicine.clone());
        text_identifiers.insert(slot.follow_up.clone());
        text_identifiers.insert(slot.years.clone());
    }
    for slot in &resistance {
        text_identifiers.insert(slot.vectors.clone());
        text_identifiers.insert(slot.years.clone());
    }

    let groups = default_groups(&policies, &treatment, &efficacy, &resistance);

    ProfileConfig {
        text_identifiers,
        transforms: default_transforms(&efficacy, &resistance),
        groups,
        policies,
        countries: default_countries(),
        species,
        treatment,
        efficacy,
        resistance,
        charts: default_charts(),
        duplicate_policy: DuplicatePolicy::Reject,
    }
}

fn default_transforms(
    efficacy: &[EfficacySlot],
    resistance: &[ResistanceSlot],
) -> BTreeMap<String, Vec<crate::pipeline::TransformRule>> {
    let mut map = BTreeMap::new();

    // Parasite shares arrive as fractions; zero means no data
    for id in [PAR_FALCIPARUM_PCT, PAR_VIVAX_PCT, PAR_OTHER_PCT] {
        map.insert(id.to_string(), vec![MultiplyBy100, NullZeros, Cut100]);
    }

    for id in [
        EST_CASES,
        EST_CASES_LOWER,
        EST_CASES_UPPER,
        EST_DEATHS,
        EST_DEATHS_LOWER,
        EST_DEATHS_UPPER,
    ] {
        map.insert(id.to_string(), vec![NullZeros]);
    }

    // Treatment failure fractions
    for slot in efficacy {
        for id in [&slot.min, &slot.median, &slot.max] {
            map.insert(id.clone(), vec![MultiplyBy100, Cut100]);
        }
        map.insert(slot.studies.clone(), vec![NullZeros]);
    }

    for slot in resistance {
        map.insert(slot.confirmed_pct.clone(), vec![MultiplyBy100, Cut100]);
        map.insert(slot.sites_monitored.clone(), vec![NullZeros]);
    }

    map
}

fn default_groups(
    policies: &[PolicyDefinition],
    treatment: &[TreatmentSlot],
    efficacy: &[EfficacySlot],
    resistance: &[ResistanceSlot],
) -> Vec<QueryGroup> {
    let policy_flags = QueryGroup {
        name: "policy_flags".into(),
        identifiers: policies.iter().map(|p| p.yes_no_identifier.clone()).collect(),
        precise: false,
    };
    let policy_years = QueryGroup {
        name: "policy_years".into(),
        identifiers: policies.iter().map(|p| p.year_adopted_identifier.clone()).collect(),
        precise: false,
    };
    let treatment_group = QueryGroup {
        name: "treatment".into(),
        identifiers: treatment.iter().map(|t| t.medicine.clone()).collect(),
        precise: false,
    };
    let efficacy_group = QueryGroup {
        name: "efficacy".into(),
        identifiers: efficacy
            .iter()
            .flat_map(|s| {
                [
                    s.medicine.clone(),
                    s.follow_up.clone(),
                    s.years.clone(),
                    s.studies.clone(),
                    s.min.clone(),
                    s.median.clone(),
                    s.max.clone(),
                ]
            })
            .collect(),
        precise: false,
    };
    let resistance_group = QueryGroup {
        name: "resistance".into(),
        identifiers: resistance
            .iter()
            .flat_map(|s| {
                [
                    s.sites_monitored.clone(),
                    s.confirmed_pct.clone(),
                    s.vectors.clone(),
                    s.years.clone(),
                ]
            })
            .collect(),
        precise: false,
    };

    vec![
        QueryGroup::new(
            "population",
            &[POP_TOTAL, POP_HIGH_TRANSMISSION, POP_LOW_TRANSMISSION, POP_MALARIA_FREE],
        ),
        QueryGroup::new(
            "parasites",
            &[
                PAR_FALCIPARUM_PCT,
                PAR_VIVAX_PCT,
                PAR_OTHER_PCT,
                SPECIES_MAJOR_PARASITE,
                VECTOR_SPECIES_PRIMARY,
                VECTOR_SPECIES_SECONDARY,
                VECTOR_SPECIES_TERTIARY,
            ],
        ),
        QueryGroup::new(
            "cases",
            &[
                DISPLAY_MODE,
                CASES_CONFIRMED_TOTAL,
                CASES_CONFIRMED_FALCIPARUM,
                CASES_CONFIRMED_VIVAX,
                CASES_PRESUMED,
                CASES_INDIGENOUS_TOTAL,
                CASES_INDIGENOUS_FALCIPARUM,
                CASES_INDIGENOUS_VIVAX,
                CASES_IMPORTED,
                DEATHS_REPORTED,
                FOOTNOTE_CASES,
            ],
        ),
        QueryGroup::new(
            "estimates",
            &[
                EST_CASES,
                EST_CASES_LOWER,
                EST_CASES_UPPER,
                EST_DEATHS,
                EST_DEATHS_LOWER,
                EST_DEATHS_UPPER,
            ],
        ),
        policy_flags,
        policy_years,
        treatment_group,
        efficacy_group,
        resistance_group,
        QueryGroup::new("rdt", &[RDT_TYPE]),
    ]
}

/// Shorthand for a catalog entry whose identifiers follow the `POL_<KEY>_YN` / `POL_<KEY>_YEAR` scheme.
fn policy(intervention: &str, strategy: &str, key: &str) -> PolicyDefinition {
    PolicyDefinition::new(
        intervention,
        strategy,
        format!("POL_{}_YN", key),
        format!("POL_{}_YEAR", key),
    )
}

fn default_policies() -> Vec<PolicyDefinition> {
    let monotherapy = PolicyInterpretation::FreeText {
        accepted: MONOTHERAPY_ACCEPTED.iter().map(|s| s.to_string()).collect(),
    };

    vec![
        // Vector control
        policy("Vector control", "ITNs/LLINs distributed free of charge", "ITN_FREE").ordered(10),
        policy("Vector control", "ITNs/LLINs distributed to all age groups", "ITN_ALL_AGES").ordered(20),
        policy("Vector control", "IRS is recommended", "IRS").ordered(30),
        policy("Vector control", "DDT is used for IRS", "IRS_DDT")
            .ordered(40)
            .valid_until(2020),
        policy("Vector control", "Use of larval control", "LARVAL").ordered(50),
        // Chemoprevention
        policy("Chemoprevention", "IPT used to prevent malaria during pregnancy", "IPTP").ordered(60),
        policy("Chemoprevention", "Seasonal malaria chemoprevention (SMC) is used", "SMC").ordered(70),
        policy("Chemoprevention", "IPT in infants (IPTi) is used", "IPTI")
            .ordered(80)
            .valid_until(2021),
        policy("Chemoprevention", "Perennial malaria chemoprevention (PMC) is used", "PMC")
            .ordered(80)
            .valid_from(2022),
        // Case management
        policy("Case management", "Patients of all ages should get diagnostic test", "DIAG_ALL_AGES").ordered(90),
        policy("Case management", "Malaria diagnosis is free of charge in the public sector", "DIAG_FREE").ordered(100),
        policy("Case management", "ACT is free for all ages in public sector", "ACT_FREE").ordered(110),
        policy("Case management", "Sale of oral artemisinin-based monotherapies", "ORAL_MONO")
            .ordered(120)
            .interpreted_as(monotherapy),
        policy(
            "Case management",
            "Single low dose of primaquine is used as gametocidal medicine for P. falciparum",
            "PQ_SLD",
        )
        .ordered(130),
        policy("Case management", "Primaquine is used for radical treatment of P. vivax cases", "PQ_VIVAX").ordered(140),
        policy("Case management", "G6PD test is a recommendation before treatment with primaquine", "G6PD")
            .ordered(150)
            .valid_from(2021),
        // Unordered entries render after every ordered one, in this order
        policy("Surveillance", "Cases are investigated and classified", "CASE_INVESTIGATION"),
        policy("Vaccine", "Malaria vaccine is deployed", "VACCINE").valid_from(2023),
    ]
}

fn default_treatment() -> Vec<TreatmentSlot> {
    [
        ("Uncomplicated unconfirmed", "TRT_UNCOMPLICATED_UNCONFIRMED"),
        ("Uncomplicated confirmed P. falciparum", "TRT_PF_UNCOMPLICATED"),
        ("Severe malaria", "TRT_SEVERE"),
        ("Treatment of P. vivax", "TRT_VIVAX"),
        ("Prevention during pregnancy", "TRT_IPTP"),
        ("Seasonal malaria chemoprevention", "TRT_SMC"),
    ]
    .iter()
    .map(|(category, medicine)| TreatmentSlot {
        category: category.to_string(),
        medicine: medicine.to_string(),
    })
    .collect()
}

fn default_efficacy() -> Vec<EfficacySlot> {
    (1..=3)
        .map(|n| EfficacySlot {
            medicine: format!("TES_{}_MEDICINE", n),
            follow_up: format!("TES_{}_FOLLOW_UP", n),
            years: format!("TES_{}_YEARS", n),
            studies: format!("TES_{}_STUDIES", n),
            min: format!("TES_{}_MIN", n),
            median: format!("TES_{}_MEDIAN", n),
            max: format!("TES_{}_MAX", n),
        })
        .collect()
}

fn default_resistance() -> Vec<ResistanceSlot> {
    [
        ("Pyrethroids", "PYR"),
        ("Organochlorines", "OC"),
        ("Carbamates", "CARB"),
        ("Organophosphates", "OP"),
    ]
    .iter()
    .map(|(class, key)| ResistanceSlot {
        insecticide_class: class.to_string(),
        sites_monitored: format!("RES_{}_SITES", key),
        confirmed_pct: format!("RES_{}_CONFIRMED_PCT", key),
        vectors: format!("RES_{}_VECTORS", key),
        years: format!("RES_{}_YEARS", key),
    })
    .collect()
}

fn default_countries() -> CountryLists {
    let set = |codes: &[&str]| codes.iter().map(|c| c.to_string()).collect::<BTreeSet<String>>();

    CountryLists {
        elimination_targets: set(&[
            "BTN", "BWA", "COM", "CRI", "DOM", "ECU", "GTM", "HND", "IRN", "KOR", "MEX", "MYS",
            "NPL", "PAN", "PRK", "SAU", "STP", "SUR", "SWZ", "THA", "TLS", "VUT",
        ]),
        indigenous_estimate_exceptions: set(&["KHM", "LAO", "PHL", "VNM"]),
        elimination_estimate_exceptions: set(&["COM", "STP"]),
    }
}

fn default_charts() -> Vec<ChartDefinition> {
    let line = |identifier: &str, label: &str| ChartLine {
        identifier: identifier.to_string(),
        label: label.to_string(),
    };

    vec![
        ChartDefinition {
            key: "funding".into(),
            title: "Funding for malaria control (US$ millions)".into(),
            lines: vec![
                line(FUND_DOMESTIC, "Domestic"),
                line(FUND_GLOBAL_FUND, "Global Fund"),
                line(FUND_PMI_USAID, "PMI/USAID"),
                line(FUND_WORLD_BANK, "World Bank"),
                line(FUND_OTHER, "Other contributions"),
            ],
            years: 7,
            precise: true,
        },
        ChartDefinition {
            key: "cases_trend".into(),
            title: "Reported and estimated cases".into(),
            lines: vec![
                line(CASES_CONFIRMED_TOTAL, "Confirmed cases"),
                line(CASES_PRESUMED, "Presumed cases"),
                line(CASES_INDIGENOUS_TOTAL, "Indigenous cases"),
                line(EST_CASES, "Estimated cases"),
            ],
            years: 7,
            precise: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotherapy_is_the_only_free_text_policy() {
        let policies = default_policies();
        let free_text: Vec<_> = policies
            .iter()
            .filter(|p| matches!(p.interpretation, PolicyInterpretation::FreeText { .. }))
            .collect();

        assert_eq!(free_text.len(), 1);
        assert_eq!(free_text[0].yes_no_identifier, "POL_ORAL_MONO_YN");
    }

    #[test]
    fn test_year_range_fields_are_text() {
        let config = builtin_config();
        let classifier = config.classifier();
        assert!(classifier.is_text("TES_1_YEARS"));
        assert!(classifier.is_text("RES_PYR_YEARS"));
        assert!(classifier.is_text("TES_2_FOLLOW_UP"));
        assert!(classifier.is_text(RDT_TYPE));
        assert!(classifier.is_text(FOOTNOTE_CASES));
        assert!(!classifier.is_text("TES_1_MEDIAN"));
    }

    #[test]
    fn test_groups_cover_two_policy_value_groups() {
        let config = builtin_config();
        let names: Vec<&str> = config.groups.iter().map(|g| g.name.as_str()).collect();
        assert!(names.contains(&"policy_flags"));
        assert!(names.contains(&"policy_years"));
        assert_eq!(
            config.groups.iter().find(|g| g.name == "policy_flags").map(|g| g.identifiers.len()),
            Some(config.policies.len())
        );
    }
}

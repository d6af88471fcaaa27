//! Rule-based recommendation text
//!
//! Deterministic Markdown keyed by diagnosis labels and the child's age
//! band. Used whenever a grounded answer cannot be produced.

use super::PatientContext;
use crate::growth::{Diagnosis, DiagnosisLabel as D};

/// Feeding stage by completed months of age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    /// 0-5 months
    Infant,
    /// 6-8 months
    EarlyComplementary,
    /// 9-11 months
    LateComplementary,
    /// 12-23 months
    Toddler,
    /// 24 months and older
    Child,
}

impl AgeBand {
    pub fn for_age(age_months: u32) -> Self {
        match age_months {
            0..=5 => AgeBand::Infant,
            6..=8 => AgeBand::EarlyComplementary,
            9..=11 => AgeBand::LateComplementary,
            12..=23 => AgeBand::Toddler,
            _ => AgeBand::Child,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AgeBand::Infant => "0-5 months",
            AgeBand::EarlyComplementary => "6-8 months",
            AgeBand::LateComplementary => "9-11 months",
            AgeBand::Toddler => "12-23 months",
            AgeBand::Child => "24 months and older",
        }
    }

    fn guidance(&self) -> &'static [&'static str] {
        match self {
            AgeBand::Infant => &[
                "- **Exclusive breastfeeding**: breast milk only, on demand, day and night. No water, formula top-ups or other foods unless a health worker advises it.",
                "- **Check the latch**: frequent, effective feeds matter more than schedules. Ask a health worker for help if feeding hurts or the baby tires quickly.",
            ],
            AgeBand::EarlyComplementary => &[
                "- **Start complementary foods** while continuing breastfeeding: 2-3 small meals a day.",
                "- **Texture**: thick, smooth purees and mashed foods. Avoid thin, watery porridge.",
                "- **Iron first**: add mashed egg, fish, liver or meat to the porridge every day.",
            ],
            AgeBand::LateComplementary => &[
                "- **Finger food**: offer soft pieces the baby can pick up (banana, cooked carrot, tofu, omelette strips).",
                "- **Frequency**: 3-4 meals a day plus 1-2 snacks, with breastfeeding continuing.",
                "- **Texture**: finely chopped and mashed family foods.",
            ],
            AgeBand::Toddler => &[
                "- **Family foods**: chopped portions of the household meal, 3-4 meals plus 1-2 snacks a day.",
                "- **Keep breastfeeding** up to 2 years or beyond if possible.",
                "- **Animal protein daily**: egg, fish, chicken or liver at least once every day.",
            ],
            AgeBand::Child => &[
                "- **Family meal**: eat together, 3 main meals plus 2 healthy snacks a day.",
                "- **Balanced plate**: a staple, animal or plant protein, vegetables and fruit at each meal.",
                "- **Limit** sugary drinks, sweets and packaged salty snacks.",
            ],
        }
    }
}

const NEXT_STEPS: &[&str] = &[
    "### Next steps (general)",
    "- **Monitor growth**: measure weight and height every month and record them in the growth chart or child health book.",
    "- **Check health**: for repeated diarrhoea, poor appetite or prolonged fever, see a clinic or doctor.",
];

const CHECK_INTAKE: &str = "- **Check intake**: make sure main meals and snacks fit the child's age, with animal protein served regularly.";

const CHECK_BREASTFEEDING: &str = "- **Check feeding**: breastfeed on demand, at least 8 times in 24 hours, and watch for enough wet nappies (6 or more a day).";

const FOOD_IDEAS: &[&str] = &[
    "### Food ideas (choose by age and availability)",
    "- **Animal protein**: egg, fish, chicken, liver (small portions, often).",
    "- **Plant protein**: tempeh, tofu, beans and lentils (texture adjusted to age).",
    "- **Energy sources**: rice, potato, sweet potato, bread.",
    "- **Vegetables and fruit**: spinach, carrot, broccoli, papaya, banana.",
    "- **Healthy fats**: a little coconut milk, cooking oil, avocado.",
];

const SAFETY_NOTE: &[&str] = &[
    "### Important",
    "- **This is not a final medical diagnosis.** If the child seems weak, refuses to drink, keeps vomiting or shows other danger signs, seek medical help immediately.",
];

/// Focus bullets for the labels present in the diagnosis.
///
/// Infants under six months get breastfeeding and referral advice only.
fn focus_lines(diagnosis: &Diagnosis, band: AgeBand) -> Vec<&'static str> {
    let infant = band == AgeBand::Infant;
    let mut lines = Vec::new();

    if diagnosis.has_label(D::SeverelyStunted) || diagnosis.has_label(D::Stunted) {
        if infant {
            lines.extend([
                "- **Low length for age**: breastfeed more often, day and night, and empty one breast before offering the other.",
                "- **Referral**: ask a health worker to assess breastfeeding and the baby's health within the next two weeks.",
            ]);
        } else {
            lines.extend([
                "- **Low height for age**: prioritise **daily animal protein** and enough energy (not only thin porridge).",
                "- **Target**: nutrient-dense meals, adding one more portion of animal protein a day where possible.",
            ]);
        }
    }

    if diagnosis.has_label(D::SeverelyUnderweight) || diagnosis.has_label(D::Underweight) {
        if infant {
            lines.extend([
                "- **Low weight for age**: offer the breast at least 8-12 times in 24 hours and let the baby finish each feed.",
                "- **Referral**: a health worker should check the latch, the mother's milk supply and any illness.",
            ]);
        } else {
            lines.extend([
                "- **Low weight for age**: increase **meal frequency** (main meals plus 2 snacks) and grow portions gradually.",
                "- **Snack ideas**: banana with milk or yoghurt (if tolerated), mung bean porridge, bread with egg.",
            ]);
        }
    }

    if diagnosis.has_label(D::SevereWasting) || diagnosis.has_label(D::ModerateWasting) {
        lines.extend([
            "- **Signs of wasting**: this needs **prompt evaluation by a health worker** (risk of severe malnutrition).",
            "- **Now**: visit a clinic or doctor for a safe therapeutic feeding plan.",
        ]);
    }

    if diagnosis.has_label(D::AtRiskOverweight)
        || diagnosis.has_label(D::Overweight)
        || diagnosis.has_label(D::Obese)
        || diagnosis.has_label(D::OverweightForAge)
    {
        if infant {
            lines.push(
                "- **Weight above the healthy range**: feed on the baby's hunger cues without forcing feeds, and have a health worker review growth.",
            );
        } else {
            lines.extend([
                "- **Weight above the healthy range**: keep regular meal times, swap sugary drinks for water or milk, and avoid using food as a reward.",
                "- **Active play**: at least an hour of active play every day.",
            ]);
        }
    }

    if lines.is_empty() {
        lines.push(
            "- **All indicators in the normal range**: keep the current feeding pattern and monthly growth checks.",
        );
    }

    lines
}

/// Full rule-based recommendation in Markdown
pub fn fallback_markdown(diagnosis: &Diagnosis, patient: &PatientContext) -> String {
    let band = AgeBand::for_age(patient.age_months);
    let mut out: Vec<String> = vec![
        format!("**Age**: {} months", patient.age_months),
        format!("**Result**: {}", diagnosis),
        String::new(),
    ];

    out.extend(NEXT_STEPS.iter().map(|s| s.to_string()));
    if band == AgeBand::Infant {
        out.push(CHECK_BREASTFEEDING.to_string());
    } else {
        out.push(CHECK_INTAKE.to_string());
        out.push(String::new());
        out.extend(FOOD_IDEAS.iter().map(|s| s.to_string()));
    }

    out.push(String::new());
    out.push(format!("### Feeding for {}", band.title()));
    out.extend(band.guidance().iter().map(|s| s.to_string()));

    out.push(String::new());
    out.push("### Focus based on the results".to_string());
    out.extend(focus_lines(diagnosis, band).into_iter().map(str::to_string));

    if !patient.allergies.is_empty() {
        out.push(String::new());
        out.push("### Allergies".to_string());
        out.push(format!(
            "- **Avoid**: {}. Replace them with other foods of similar nutritional value.",
            patient.allergies.join(", ")
        ));
    }

    if !patient.preferences.is_empty() {
        out.push(String::new());
        out.push("### Preferences".to_string());
        out.push(format!(
            "- **Build on foods the child likes**: {}.",
            patient.preferences.join(", ")
        ));
    }

    out.push(String::new());
    out.extend(SAFETY_NOTE.iter().map(|s| s.to_string()));

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::{Assessment, Indicator, Sex};

    fn diagnosis(haz: D, waz: D, whz: D) -> Diagnosis {
        Diagnosis {
            height_for_age: Assessment {
                indicator: Indicator::HeightForAge,
                z: 0.0,
                label: haz,
            },
            weight_for_age: Assessment {
                indicator: Indicator::WeightForAge,
                z: 0.0,
                label: waz,
            },
            weight_for_height: Assessment {
                indicator: Indicator::WeightForHeight,
                z: 0.0,
                label: whz,
            },
        }
    }

    fn patient(age_months: u32) -> PatientContext {
        PatientContext::new(age_months, Sex::Female, 8.0, 70.0)
    }

    #[test]
    fn test_age_bands() {
        assert_eq!(AgeBand::for_age(0), AgeBand::Infant);
        assert_eq!(AgeBand::for_age(5), AgeBand::Infant);
        assert_eq!(AgeBand::for_age(6), AgeBand::EarlyComplementary);
        assert_eq!(AgeBand::for_age(9), AgeBand::LateComplementary);
        assert_eq!(AgeBand::for_age(12), AgeBand::Toddler);
        assert_eq!(AgeBand::for_age(23), AgeBand::Toddler);
        assert_eq!(AgeBand::for_age(24), AgeBand::Child);
    }

    #[test]
    fn test_band_guidance_in_text() {
        let normal = diagnosis(D::Normal, D::Normal, D::Normal);
        let text = fallback_markdown(&normal, &patient(4)).to_lowercase();
        assert!(text.contains("exclusive breastfeeding"));

        let text = fallback_markdown(&normal, &patient(10)).to_lowercase();
        assert!(text.contains("finger food"));

        let text = fallback_markdown(&normal, &patient(30)).to_lowercase();
        assert!(text.contains("family meal"));
    }

    #[test]
    fn test_focus_sections() {
        let wasted = diagnosis(D::Stunted, D::Underweight, D::SevereWasting);
        let text = fallback_markdown(&wasted, &patient(18));
        assert!(text.contains("Low height for age"));
        assert!(text.contains("Low weight for age"));
        assert!(text.contains("health worker"));
        assert!(!text.contains("All indicators in the normal range"));

        let normal = diagnosis(D::Normal, D::Normal, D::Normal);
        let text = fallback_markdown(&normal, &patient(18));
        assert!(text.contains("All indicators in the normal range"));

        let obese = diagnosis(D::Normal, D::Normal, D::Obese);
        assert!(fallback_markdown(&obese, &patient(18)).contains("Weight above the healthy range"));
    }

    #[test]
    fn test_infant_text_has_no_solid_food_advice() {
        let faltering = diagnosis(D::Stunted, D::Underweight, D::Normal);
        let text = fallback_markdown(&faltering, &patient(4)).to_lowercase();

        for solid in ["animal protein", "egg", "fish", "rice", "porridge", "snack", "food ideas", "meal"] {
            assert!(!text.contains(solid), "infant text mentions {:?}", solid);
        }
        assert!(text.contains("exclusive breastfeeding"));
        assert!(text.contains("low length for age"));
        assert!(text.contains("health worker"));

        let heavy = diagnosis(D::Normal, D::Normal, D::Overweight);
        let text = fallback_markdown(&heavy, &patient(2)).to_lowercase();
        assert!(!text.contains("sugary drinks"));
        assert!(text.contains("hunger cues"));
    }

    #[test]
    fn test_older_children_get_food_ideas() {
        let faltering = diagnosis(D::Stunted, D::Underweight, D::Normal);
        let text = fallback_markdown(&faltering, &patient(7));
        assert!(text.contains("### Food ideas"));
        assert!(text.contains("daily animal protein"));
        assert!(text.contains("Snack ideas"));
    }

    #[test]
    fn test_allergies_and_safety_note() {
        let mut child = patient(12);
        child.allergies = vec!["egg".to_string(), "peanut".to_string()];
        let text = fallback_markdown(&diagnosis(D::Normal, D::Normal, D::Normal), &child);

        assert!(text.contains("**Avoid**: egg, peanut."));
        assert!(text.starts_with("**Age**: 12 months"));
        assert!(text.contains("not a final medical diagnosis"));
    }
}
